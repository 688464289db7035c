use http::StatusCode;

/// A failed call to the issue tracker
///
/// Every variant owns plain data so a failure can be cached and handed to
/// every caller awaiting the same resolution.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    #[error("HTTP status {0}: {1}")]
    Status(StatusCode, String),
    #[error("HTTP request failed: {0}")]
    Request(String),
    #[error("invalid response: {0}")]
    Decode(String),
    #[error("URL parse error: {0}")]
    Url(String),
}

impl TransportError {
    /// Classify a non-success response
    pub fn from_status(status: StatusCode, body: String) -> Self {
        match status {
            StatusCode::NOT_FOUND => TransportError::NotFound(body),
            StatusCode::UNAUTHORIZED => TransportError::Unauthorized(body),
            status => TransportError::Status(status, body),
        }
    }

    /// The HTTP status behind this error, if the tracker answered at all
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            TransportError::NotFound(_) => Some(StatusCode::NOT_FOUND),
            TransportError::Unauthorized(_) => Some(StatusCode::UNAUTHORIZED),
            TransportError::Status(status, _) => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            TransportError::Decode(e.to_string())
        } else {
            TransportError::Request(e.to_string())
        }
    }
}

impl From<url::ParseError> for TransportError {
    fn from(e: url::ParseError) -> Self {
        TransportError::Url(e.to_string())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_status_classification() {
        assert_eq!(
            TransportError::from_status(StatusCode::NOT_FOUND, "gone".into()),
            TransportError::NotFound("gone".into())
        );
        assert_eq!(
            TransportError::from_status(StatusCode::UNAUTHORIZED, "".into()).status(),
            Some(StatusCode::UNAUTHORIZED)
        );

        let err = TransportError::from_status(StatusCode::UNPROCESSABLE_ENTITY, "bad".into());
        assert_eq!(err.status(), Some(StatusCode::UNPROCESSABLE_ENTITY));
        assert!(matches!(err, TransportError::Status(_, _)));

        assert_eq!(TransportError::Request("reset".into()).status(), None);
    }
}
