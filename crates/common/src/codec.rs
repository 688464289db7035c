//! Document codec
//!
//! Maps a caller [`Document`] onto the three issue fields the tracker stores
//! and back:
//!
//! - **title**: an encrypted random number in `1..=100`. Titles are shown in
//!   the tracker's UI, so they carry nothing but a placeholder.
//! - **body**: the encrypted JSON of the document without `$id`.
//! - **labels**: a single encrypted [`PartitionTag`].
//!
//! Decoding reverses the body and injects the issue number as `$id`.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::crypto::{Cipher, CipherError};
use crate::document::{Document, NotAnObject};
use crate::tag::PartitionTag;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    #[error(transparent)]
    Cipher(#[from] CipherError),
    #[error("invalid document json: {0}")]
    Json(String),
    #[error(transparent)]
    NotAnObject(#[from] NotAnObject),
    #[error("issue #{0} has no body")]
    MissingBody(u64),
    #[error("document has no numeric $id field")]
    MissingId,
    #[error("partition label is {0} characters, the tracker allows {max}", max = crate::tag::MAX_LABEL_LEN)]
    LabelTooLong(usize),
}

/// What a listing does with an issue whose body won't decode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecodePolicy {
    /// Fail the whole listing
    #[default]
    Fail,
    /// Drop the issue and keep going
    Skip,
}

/// The encrypted fields of a new issue
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedIssue {
    pub title: String,
    pub body: String,
    pub labels: Vec<String>,
}

/// Encodes and decodes the documents of one collection
#[derive(Debug, Clone)]
pub struct DocumentCodec {
    cipher: Arc<dyn Cipher>,
    tag: PartitionTag,
}

impl DocumentCodec {
    pub fn new(cipher: Arc<dyn Cipher>, tag: PartitionTag) -> Self {
        Self { cipher, tag }
    }

    pub fn tag(&self) -> &PartitionTag {
        &self.tag
    }

    pub fn cipher(&self) -> &dyn Cipher {
        self.cipher.as_ref()
    }

    /// Decrypt and parse an issue body, addressing the result at `number`
    pub fn decode(&self, number: u64, body: Option<&str>) -> Result<Document, CodecError> {
        let body = body.ok_or(CodecError::MissingBody(number))?;
        let plaintext = self.cipher.decrypt(body)?;
        let value: Value =
            serde_json::from_str(&plaintext).map_err(|e| CodecError::Json(e.to_string()))?;
        Ok(Document::try_from(value)?.with_id(number))
    }

    /// Encrypt everything a new issue needs
    pub fn encode(&self, doc: &Document) -> Result<EncodedIssue, CodecError> {
        let label = self.tag.encrypt(self.cipher.as_ref())?;
        Ok(EncodedIssue {
            title: self.placeholder_title()?,
            body: self.encode_body(doc)?,
            labels: vec![label],
        })
    }

    /// Encrypt a document's payload, leaving out `$id`
    pub fn encode_body(&self, doc: &Document) -> Result<String, CodecError> {
        let json = Value::Object(doc.payload()).to_string();
        Ok(self.cipher.encrypt(&json)?)
    }

    /// The issue a document is stored in
    pub fn address(&self, doc: &Document) -> Result<u64, CodecError> {
        doc.id().ok_or(CodecError::MissingId)
    }

    fn placeholder_title(&self) -> Result<String, CipherError> {
        let n: u32 = rand::random_range(1..=100);
        self.cipher.encrypt(&n.to_string())
    }
}
