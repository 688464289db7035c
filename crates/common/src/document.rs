use std::ops::Deref;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Reserved field carrying the remote issue number of a document
pub const ID_FIELD: &str = "$id";

/// A caller document: an arbitrary JSON object
///
/// Documents read from the store always carry `$id`. Documents passed back
/// for update or removal must carry it too; the store reads it but never
/// modifies the caller's value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Document(Map<String, Value>);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("document must be a JSON object, got {0}")]
pub struct NotAnObject(pub &'static str);

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    /// The remote address, if the document carries a numeric `$id`
    pub fn id(&self) -> Option<u64> {
        self.0.get(ID_FIELD).and_then(Value::as_u64)
    }

    /// Copy of this document addressed at `id`
    pub fn with_id(mut self, id: u64) -> Self {
        self.0.insert(ID_FIELD.to_string(), Value::from(id));
        self
    }

    /// The payload that gets encrypted: everything except `$id`
    pub fn payload(&self) -> Map<String, Value> {
        let mut payload = self.0.clone();
        payload.remove(ID_FIELD);
        payload
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(key.into(), value.into())
    }

    pub fn into_inner(self) -> Map<String, Value> {
        self.0
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

impl Deref for Document {
    type Target = Map<String, Value>;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<Map<String, Value>> for Document {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl TryFrom<Value> for Document {
    type Error = NotAnObject;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            Value::Null => Err(NotAnObject("null")),
            Value::Bool(_) => Err(NotAnObject("a boolean")),
            Value::Number(_) => Err(NotAnObject("a number")),
            Value::String(_) => Err(NotAnObject("a string")),
            Value::Array(_) => Err(NotAnObject("an array")),
        }
    }
}

impl From<Document> for Value {
    fn from(doc: Document) -> Self {
        doc.into_value()
    }
}
