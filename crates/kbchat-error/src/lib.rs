//! Workspace-wide error type for kbchat.
//!
//! Layer-specific crates keep their own rich error enums (see `kbchat_api::ApiError`) and convert
//! into [`Error`] at subsystem boundaries, where an [`ErrorPolicy`] decides how to surface them.

pub mod policy;
pub mod result_ext;
pub mod severity;

pub use policy::{CombinedPolicy, ErrorPolicy};
#[cfg(feature = "tracing")]
pub use policy::TracingPolicy;
pub use result_ext::ResultExt;
pub use severity::Severity;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    /// The request never produced a response (DNS, connect, reset, timeout).
    #[error("Network error: {message}")]
    Transport { message: String, is_timeout: bool },

    /// The service answered with a non-success status.
    #[error("Server error (status {status}): {message}")]
    Server { status: u16, message: String },

    /// The bearer credential was missing or rejected.
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// A response body could not be decoded into the expected shape.
    #[error("Malformed response: {0}")]
    Decode(String),

    #[error("Configuration error: {0}")]
    Config(String),

    // NOTE: catch-all for front-end failures (terminal io, rendering) that have no richer type yet.
    #[error("UI error: {0}")]
    Ui(String),
}

impl Error {
    pub fn severity(&self) -> Severity {
        match self {
            Error::Auth(_) => Severity::Fatal,
            Error::Transport { .. } | Error::Server { .. } | Error::Decode(_) => Severity::Error,
            Error::Config(_) | Error::Ui(_) => Severity::Warning,
        }
    }

    pub fn is_warning(&self) -> bool {
        self.severity() == Severity::Warning
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Transport { is_timeout: true, .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_failures_are_fatal() {
        let err = Error::Auth("401".into());
        assert_eq!(err.severity(), Severity::Fatal);
        assert!(!err.is_warning());
    }

    #[test]
    fn config_failures_only_warn() {
        let err = Error::Config("bad toml".into());
        assert!(err.is_warning());
    }

    #[test]
    fn timeout_flag_is_preserved() {
        let err = Error::Transport {
            message: "deadline elapsed".into(),
            is_timeout: true,
        };
        assert!(err.is_timeout());
        assert_eq!(err.severity(), Severity::Error);
        assert_eq!(err.to_string(), "Network error: deadline elapsed");
    }
}
