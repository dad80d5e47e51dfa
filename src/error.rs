//! Error types for version-compare

use thiserror::Error;

/// Error code the comparison service uses for an unknown job id
pub const COMPARISON_NOT_FOUND: &str = "ComparisonNotFound";

/// Error code the iModels service uses for an unknown changeset
pub const CHANGESET_NOT_FOUND: &str = "ChangesetNotFound";

/// Errors that can occur in version-compare
#[derive(Error, Debug)]
pub enum Error {
    /// Structured API error parsed from the response body
    #[error("API error {status} ({code}): {message}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Service error code (e.g. `ComparisonNotFound`)
        code: String,
        /// Human readable message
        message: String,
    },

    /// Non-2xx response without a parsable error body
    #[error("bad status {status}: {status_text}")]
    BadStatus {
        /// HTTP status code
        status: u16,
        /// Canonical reason phrase
        status_text: String,
    },

    /// Transport error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Malformed JSON
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid URL
    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),

    /// Operation was cancelled through an abort signal
    #[error("operation aborted")]
    Aborted,

    /// Missing or rejected credentials
    #[error("authentication error: {0}")]
    Auth(String),

    /// Invalid configuration value
    #[error("configuration error: {0}")]
    Config(String),

    /// The changeset the comparison is anchored on does not exist
    #[error("baseline changeset not found: {0}")]
    BaselineChangesetNotFound(String),

    /// A comparison finished without a result location
    #[error("comparison job {0} has no result")]
    MissingComparisonResult(String),

    /// The named version loader ended in its error state
    #[error("failed to load named versions: {0}")]
    Loader(String),

    /// No loaded named version matches the given ID or name
    #[error("named version not found: {0}")]
    VersionNotFound(String),

    /// The comparison service gave up on a job
    #[error("comparison job {job_id} failed: {details}")]
    ComparisonFailed {
        /// Job ID
        job_id: String,
        /// Service supplied details
        details: String,
    },

    /// Internal error
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Whether this error is a cancellation, which callers swallow
    pub const fn is_abort(&self) -> bool {
        matches!(self, Self::Aborted)
    }

    /// Whether the comparison service reported that no job exists yet
    pub fn is_comparison_not_found(&self) -> bool {
        matches!(self, Self::Api { code, .. } if code == COMPARISON_NOT_FOUND)
    }

    /// Whether the error is any kind of "not found" response
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::Api { status, code, .. } => {
                *status == 404 || code == COMPARISON_NOT_FOUND || code == CHANGESET_NOT_FOUND
            }
            Self::BadStatus { status, .. } => *status == 404,
            _ => false,
        }
    }
}

/// Result type alias for version-compare
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    fn api_error(status: u16, code: &str) -> Error {
        Error::Api {
            status,
            code: code.to_string(),
            message: "whatever".to_string(),
        }
    }

    #[test]
    fn test_comparison_not_found_is_detected_by_code() {
        assert!(api_error(404, COMPARISON_NOT_FOUND).is_comparison_not_found());
        assert!(!api_error(404, "iModelNotFound").is_comparison_not_found());
        assert!(!Error::Aborted.is_comparison_not_found());
    }

    #[test]
    fn test_not_found_covers_status_and_codes() {
        assert!(api_error(404, "Whatever").is_not_found());
        assert!(api_error(422, CHANGESET_NOT_FOUND).is_not_found());
        assert!(
            Error::BadStatus {
                status: 404,
                status_text: "Not Found".to_string()
            }
            .is_not_found()
        );
        assert!(!api_error(500, "InternalServerError").is_not_found());
    }

    #[test]
    fn test_abort_detection() {
        assert!(Error::Aborted.is_abort());
        assert!(!Error::Internal("x".to_string()).is_abort());
    }
}
