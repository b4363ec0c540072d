//! Error types for the array reconciler
//!
//! Provides structured error types for all reconciler components: the filter
//! compiler, the request executor, and the reconciliation orchestrator.

use thiserror::Error;

/// Unified error type for the reconciler
#[derive(Error, Debug)]
pub enum Error {
    // =========================================================================
    // Filter Compilation Errors
    // =========================================================================
    #[error("filter clause {clause_index} ({raw_clause:?}) is invalid: {reason}")]
    FilterParse {
        /// 1-based index of the offending clause
        clause_index: usize,
        raw_clause: String,
        reason: String,
    },

    // =========================================================================
    // Classified HTTP Errors
    // =========================================================================
    /// The array rejected the request (4xx). Body is kept verbatim so the
    /// operator sees the array's own diagnostic text.
    #[error("array rejected request: status {status}, body: {body}")]
    ApiClient { status: u16, body: String },

    /// The array failed to serve the request (5xx or any status outside the
    /// per-method success table).
    #[error("array request failed: status {status}, body: {body}")]
    ApiServer { status: u16, body: String },

    /// Transport-level failure before any status code was received.
    #[error("HTTP transport error: {0}")]
    Http(#[from] reqwest::Error),

    // =========================================================================
    // Reconciliation Errors
    // =========================================================================
    /// A membership mutation landed partially. `applied` names the call that
    /// succeeded, `failed` the one that did not; remote state is in a mixed
    /// position until the next pass converges it.
    #[error("partial apply on {resource}: {applied} succeeded, {failed} failed: {source}")]
    PartialApply {
        resource: String,
        applied: String,
        failed: String,
        #[source]
        source: Box<Error>,
    },

    #[error("resource not found: {kind}/{name}")]
    ResourceNotFound { kind: String, name: String },

    // =========================================================================
    // Configuration / Parse Errors
    // =========================================================================
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("YAML parse error: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    // =========================================================================
    // IO Errors
    // =========================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Check if this error is transient and worth retrying (on an idempotent
    /// method; the executor enforces that part).
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::ApiServer { .. } => true,
            Error::Http(e) => e.is_timeout() || e.is_connect(),
            _ => false,
        }
    }

    /// True when the error originated before any network I/O, so the caller
    /// can fix the input and retry without touching the array.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            Error::FilterParse { .. } | Error::Configuration(_) | Error::YamlParse(_)
        )
    }
}

/// Result type alias for the reconciler
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryability() {
        let server = Error::ApiServer {
            status: 503,
            body: "maintenance".into(),
        };
        assert!(server.is_retryable());

        let client = Error::ApiClient {
            status: 404,
            body: "not found".into(),
        };
        assert!(!client.is_retryable());

        let parse = Error::FilterParse {
            clause_index: 1,
            raw_clause: "name==oops".into(),
            reason: "unrecognized operator".into(),
        };
        assert!(!parse.is_retryable());
        assert!(parse.is_input_error());
    }

    #[test]
    fn test_partial_apply_display() {
        let err = Error::PartialApply {
            resource: "host_group/hg-1".into(),
            applied: "add_members".into(),
            failed: "remove_members".into(),
            source: Box::new(Error::ApiServer {
                status: 500,
                body: "internal".into(),
            }),
        };
        let text = err.to_string();
        assert!(text.contains("host_group/hg-1"));
        assert!(text.contains("add_members succeeded"));
    }
}
