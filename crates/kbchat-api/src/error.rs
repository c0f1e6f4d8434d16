use thiserror::Error;

/// Errors produced while talking to the conversation service.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ApiError {
    /// The request never produced a response (connect, DNS, reset).
    #[error("Network request failed: {message}")]
    Request {
        message: String,
        /// Optional URL for additional context.
        url: Option<String>,
    },

    /// The request did not complete within the configured timeout.
    #[error("The request to the conversation service timed out.")]
    Timeout { url: Option<String> },

    /// The service returned a non-success status code.
    #[error("API error (status {status}): {message}")]
    Api {
        status: u16,
        message: String,
        /// Optional URL for correlation.
        url: Option<String>,
        /// Truncated body snippet for diagnostics.
        body_snippet: Option<String>,
    },

    /// The bearer credential was missing, expired or rejected (401/403).
    #[error("Authentication failed (status {status}): {message}")]
    Authentication { status: u16, message: String },

    /// The response body did not match the expected shape.
    #[error("Failed to deserialize response data: {message}")]
    Deserialization {
        message: String,
        /// Optional truncated snippet of the offending body.
        body_snippet: Option<String>,
    },

    #[error("Invalid service URL: {0}")]
    InvalidUrl(String),
}

impl ApiError {
    /// Returns a diagnostic string with contextual fields for UI/log surfaces.
    pub fn diagnostic(&self) -> String {
        match self {
            ApiError::Request { message, url } => {
                let mut msg = format!("Network request failed: {message}");
                if let Some(u) = url {
                    msg.push_str(&format!("\nurl: {u}"));
                }
                msg
            }
            ApiError::Timeout { url } => {
                let mut msg = self.to_string();
                if let Some(u) = url {
                    msg.push_str(&format!("\nurl: {u}"));
                }
                msg
            }
            ApiError::Api {
                status,
                message,
                url,
                body_snippet,
            } => {
                let mut msg = format!("API error (status {status}): {message}");
                if let Some(u) = url {
                    msg.push_str(&format!("\nurl: {u}"));
                }
                if let Some(snippet) = body_snippet {
                    if snippet != message {
                        msg.push_str("\nbody excerpt: ");
                        msg.push_str(snippet);
                    }
                }
                msg
            }
            ApiError::Deserialization {
                message,
                body_snippet,
            } => {
                let mut msg = format!("Failed to deserialize response data: {message}");
                if let Some(snippet) = body_snippet {
                    msg.push_str("\nbody excerpt: ");
                    msg.push_str(snippet);
                }
                msg
            }
            other => other.to_string(),
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Api { status, .. } | ApiError::Authentication { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        let url = e.url().map(|u| u.to_string());
        if e.is_timeout() {
            ApiError::Timeout { url }
        } else if e.is_decode() {
            ApiError::Deserialization {
                message: e.to_string(),
                body_snippet: None,
            }
        } else {
            ApiError::Request {
                message: e.to_string(),
                url,
            }
        }
    }
}

impl From<url::ParseError> for ApiError {
    fn from(e: url::ParseError) -> Self {
        ApiError::InvalidUrl(e.to_string())
    }
}

impl From<ApiError> for kbchat_error::Error {
    fn from(error: ApiError) -> Self {
        match error {
            ApiError::Request { message, .. } => kbchat_error::Error::Transport {
                message,
                is_timeout: false,
            },
            err @ ApiError::Timeout { .. } => kbchat_error::Error::Transport {
                message: err.to_string(),
                is_timeout: true,
            },
            ApiError::Api {
                status, message, ..
            } => kbchat_error::Error::Server { status, message },
            ApiError::Authentication { message, .. } => kbchat_error::Error::Auth(message),
            ApiError::Deserialization { message, .. } => kbchat_error::Error::Decode(message),
            ApiError::InvalidUrl(message) => kbchat_error::Error::Config(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kbchat_error::Severity;

    #[test]
    fn diagnostic_includes_url_and_snippet() {
        let err = ApiError::Api {
            status: 500,
            message: "Chat failed: index unavailable".into(),
            url: Some("http://localhost:8000/api/chat".into()),
            body_snippet: Some("{\"detail\":\"Chat failed: index unavailable\"}".into()),
        };
        let diag = err.diagnostic();
        assert!(diag.contains("status 500"));
        assert!(diag.contains("url: http://localhost:8000/api/chat"));
        assert!(diag.contains("body excerpt"));
    }

    #[test]
    fn conversion_keeps_severity_meaningful() {
        let auth: kbchat_error::Error = ApiError::Authentication {
            status: 401,
            message: "Could not validate credentials".into(),
        }
        .into();
        assert_eq!(auth.severity(), Severity::Fatal);

        let timeout: kbchat_error::Error = ApiError::Timeout { url: None }.into();
        assert!(timeout.is_timeout());
    }

    #[test]
    fn not_found_detection() {
        let err = ApiError::Api {
            status: 404,
            message: "Conversation not found: t9".into(),
            url: None,
            body_snippet: None,
        };
        assert!(err.is_not_found());
        assert!(!ApiError::Timeout { url: None }.is_not_found());
    }
}
