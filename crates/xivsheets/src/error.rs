//! Error types for the xivsheets client.
//!
//! One enum covers every failure class the client surfaces. Absence is not
//! a failure: point lookups and asset fetches answer a 404 with `Ok(None)`.

use thiserror::Error;

/// Main error type for xivsheets operations.
#[derive(Debug, Error)]
pub enum XivError {
    // Transport errors (connect, timeout, protocol)
    #[error("Transport error for {url}: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    // Non-2xx status outside the absent-row cases
    #[error("HTTP {status} from {url}: {body}")]
    Http {
        status: u16,
        url: String,
        body: String,
    },

    // Response body was not the JSON the endpoint promises
    #[error("JSON decode error for {url}: {source}")]
    Json {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    // Reshaped row refused to deserialize into the target model
    #[error("Validation error for model {model}: {source}")]
    ModelValidation {
        model: &'static str,
        #[source]
        source: serde_json::Error,
        /// The reshaped row that failed, kept for diagnostics.
        raw: serde_json::Value,
    },

    // Contradictory clause flags, caught before any request is sent
    #[error("Query build error: {field} is marked both required and excluded")]
    QueryBuild { field: String },

    // Bad caller input, caught before any request is sent
    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },
}

/// Result type alias for xivsheets operations.
pub type Result<T> = std::result::Result<T, XivError>;

impl From<reqwest::Error> for XivError {
    fn from(err: reqwest::Error) -> Self {
        let url = err.url().map(|u| u.to_string()).unwrap_or_default();
        XivError::Transport { url, source: err }
    }
}

impl XivError {
    /// Check if this error should trigger a transport-level retry.
    ///
    /// Only transport failures qualify; a served status code, however
    /// unhappy, is an answer and is never retried.
    pub fn is_retryable(&self) -> bool {
        matches!(self, XivError::Transport { .. })
    }

    /// The HTTP status carried by this error, if it has one.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            XivError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = XivError::Http {
            status: 500,
            url: "https://v2.xivapi.com/api/search".into(),
            body: "internal".into(),
        };
        assert_eq!(
            err.to_string(),
            "HTTP 500 from https://v2.xivapi.com/api/search: internal"
        );

        let err = XivError::QueryBuild {
            field: "Name".into(),
        };
        assert_eq!(
            err.to_string(),
            "Query build error: Name is marked both required and excluded"
        );
    }

    #[test]
    fn test_retryable_errors() {
        let err = XivError::Http {
            status: 503,
            url: String::new(),
            body: String::new(),
        };
        assert!(!err.is_retryable());

        let err = XivError::InvalidArgument {
            message: "bad territory".into(),
        };
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_status_code() {
        let err = XivError::Http {
            status: 404,
            url: String::new(),
            body: String::new(),
        };
        assert_eq!(err.status_code(), Some(404));

        let err = XivError::QueryBuild {
            field: "Level".into(),
        };
        assert_eq!(err.status_code(), None);
    }
}
