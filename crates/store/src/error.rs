use common::prelude::{CipherError, CodecError};
use http::StatusCode;

use crate::transport::TransportError;

/// Everything a store operation can fail with
///
/// Cloneable so that a failed connection or namespace resolution can be
/// reported to every operation waiting on it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("identity must not be empty")]
    EmptyIdentity,
    #[error("secret must not be empty")]
    EmptySecret,
    #[error("collection name should only contain letters, numbers and underscores: {0}")]
    InvalidCollectionName(String),
    #[error("collection names cannot be recovered from this cipher's labels")]
    IrreversibleLabels,
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Codec(#[from] CodecError),
}

impl From<CipherError> for StoreError {
    fn from(e: CipherError) -> Self {
        StoreError::Codec(e.into())
    }
}

impl StoreError {
    /// The HTTP status the tracker answered with, if this came from one
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            StoreError::Transport(e) => e.status(),
            _ => None,
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            StoreError::EmptyIdentity
                | StoreError::EmptySecret
                | StoreError::InvalidCollectionName(_)
        )
    }
}
