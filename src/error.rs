//! Error types for the Bunkerhill Inference SDK.
//!
//! Each failure mode a caller can observe has its own variant. Download
//! failures and local write failures are deliberately distinct, as are
//! request failures (the server answered with an error status) and parse
//! failures (the server answered 2xx but the body was not valid JSON).

use std::path::PathBuf;

/// The error type for all SDK operations.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// The client was constructed with invalid arguments.
    ///
    /// This is immediate and fatal; nothing is retried.
    #[error("invalid inference API client configuration: {reason}")]
    InvalidClientConfiguration {
        /// Why the configuration was rejected.
        reason: String,
    },

    /// The authorization POST exhausted its retries or returned >= 400.
    #[error("authentication against {url} failed: {detail}")]
    AuthenticationFailed {
        /// The auth endpoint URL.
        url: String,
        /// Status code, when the server answered at all.
        status: Option<u16>,
        /// Human-readable description of the failure.
        detail: String,
    },

    /// An authenticated request exhausted its retries or returned >= 400.
    #[error("{method} {url} returned a status code of {status}: {detail}")]
    RequestFailed {
        /// The request URL.
        url: String,
        /// The HTTP method.
        method: String,
        /// The HTTP status code; 0 when the request failed before a
        /// response was received.
        status: u16,
        /// The `detail` field of the JSON error body if present, else the
        /// raw response text.
        detail: String,
    },

    /// The server answered 2xx but the body was not valid JSON.
    #[error("error parsing JSON response from {url}: {detail}")]
    ResponseParseFailed {
        /// The request URL.
        url: String,
        /// The underlying parse error.
        detail: String,
    },

    /// A segmentation artifact could not be downloaded from its
    /// pre-signed URL.
    #[error("failed to download segmentation from {url}")]
    ArtifactDownloadFailed {
        /// The pre-signed URL that failed.
        url: String,
    },

    /// A downloaded artifact could not be written to disk.
    #[error("failed to write downloaded segmentation file to {path}")]
    ArtifactWriteFailed {
        /// The destination path that failed.
        path: PathBuf,
    },
}

impl Error {
    /// Shorthand for an [`Error::InvalidClientConfiguration`].
    pub(crate) fn configuration(reason: impl Into<String>) -> Self {
        Error::InvalidClientConfiguration { reason: reason.into() }
    }
}

/// A specialized `Result` type for SDK operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_failed_display() {
        let err = Error::RequestFailed {
            url: "https://api.example.com/api/models/m1/patients/p1/inferences/".into(),
            method: "GET".into(),
            status: 503,
            detail: "service unavailable".into(),
        };
        let display = err.to_string();
        assert!(display.contains("GET"));
        assert!(display.contains("503"));
        assert!(display.contains("service unavailable"));
    }

    #[test]
    fn test_artifact_errors_are_distinct() {
        let download = Error::ArtifactDownloadFailed { url: "https://x/y.nii.gz".into() };
        let write = Error::ArtifactWriteFailed { path: PathBuf::from("/tmp/y.nii.gz") };
        assert!(download.to_string().contains("download"));
        assert!(write.to_string().contains("write"));
    }

    #[test]
    fn test_configuration_shorthand() {
        let err = Error::configuration("identity must not be empty");
        assert!(matches!(err, Error::InvalidClientConfiguration { .. }));
        assert!(err.to_string().contains("identity must not be empty"));
    }
}
