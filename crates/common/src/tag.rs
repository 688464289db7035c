use serde::{Deserialize, Serialize};

use crate::codec::CodecError;
use crate::crypto::Cipher;

/// Longest label name the tracker accepts
pub const MAX_LABEL_LEN: usize = 50;

/// Collection membership of a document within a database
///
/// Serialized as `{"db_name": .., "label": ..}` and turned into a single
/// issue label by [`Cipher::label`]. Older stores wrote
/// `{"app_name": .., "label": ..}`; both parse.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PartitionTag {
    #[serde(alias = "app_name")]
    pub db_name: String,
    pub label: String,
}

#[derive(Serialize)]
struct LegacyTag<'a> {
    app_name: &'a str,
    label: &'a str,
}

impl PartitionTag {
    pub fn new(db_name: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            db_name: db_name.into(),
            label: label.into(),
        }
    }

    /// Plaintext of the current encoding. Field order is fixed, which the
    ///  deterministic label match depends on.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }

    /// Plaintext of the `app_name` encoding
    pub fn to_legacy_json(&self) -> String {
        serde_json::to_string(&LegacyTag {
            app_name: &self.db_name,
            label: &self.label,
        })
        .unwrap_or_default()
    }

    /// The label marking this tag's documents
    pub fn encrypt(&self, cipher: &dyn Cipher) -> Result<String, CodecError> {
        checked_label(cipher.label(&self.to_json())?)
    }

    /// The label of the `app_name` encoding
    pub fn encrypt_legacy(&self, cipher: &dyn Cipher) -> Result<String, CodecError> {
        checked_label(cipher.label(&self.to_legacy_json())?)
    }

    /// Recover a tag from a label. Accepts either encoding; fails on labels
    ///  from a cipher without [`Cipher::reversible_labels`].
    pub fn decrypt(cipher: &dyn Cipher, label: &str) -> Result<Self, CodecError> {
        let plaintext = cipher.decrypt(label)?;
        serde_json::from_str(&plaintext).map_err(|e| CodecError::Json(e.to_string()))
    }
}

fn checked_label(label: String) -> Result<String, CodecError> {
    match label.chars().count() {
        len if len > MAX_LABEL_LEN => Err(CodecError::LabelTooLong(len)),
        _ => Ok(label),
    }
}

/// Which partition-tag encodings a listing should match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TagFilter {
    /// Only the `db_name` encoding
    #[default]
    Current,
    /// The `db_name` encoding and the older `app_name` one
    WithLegacy,
}

impl TagFilter {
    /// The encrypted label strings to list by, current encoding first
    pub fn labels(
        &self,
        tag: &PartitionTag,
        cipher: &dyn Cipher,
    ) -> Result<Vec<String>, CodecError> {
        let mut labels = vec![tag.encrypt(cipher)?];
        if *self == TagFilter::WithLegacy {
            labels.push(tag.encrypt_legacy(cipher)?);
        }
        Ok(labels)
    }
}
