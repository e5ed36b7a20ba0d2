use reqwest::StatusCode;
use thiserror::Error;

/// Main error type for Cannon
#[derive(Error, Debug)]
pub enum CannonError {
    /// Connectivity failure: DNS, refused connection, timeout
    #[error("Network error: {0}")]
    Network(String),

    /// Invalid credentials or expired token
    #[error("Authorization error: {0}")]
    Authorization(String),

    /// Missing or mismatched form fields, or a request the API rejected as malformed
    #[error("Validation error: {0}")]
    Validation(String),

    /// 5xx or business-rule rejection
    #[error("Server error ({status}): {message}")]
    Server { status: u16, message: String },

    /// A request for the same action is still outstanding
    #[error("Request already in progress: {0}")]
    Busy(&'static str),

    /// Session restoration did not complete; the gate stays in the loading state
    #[error("Session restore failed after {attempts} attempt(s): {reason}")]
    RestoreFailed { attempts: u32, reason: String },

    /// Local credential storage failure
    #[error("Storage error: {0}")]
    Storage(String),

    /// Response body did not match the expected shape
    #[error("Decode error: {0}")]
    Decode(String),
}

impl CannonError {
    /// Classify an unsuccessful HTTP status, using the API's `detail` text when present
    pub fn from_status(status: StatusCode, detail: Option<String>) -> Self {
        let message = detail.unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("unexpected status")
                .to_string()
        });

        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Self::Authorization(message),
            StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => Self::Validation(message),
            _ => Self::Server {
                status: status.as_u16(),
                message,
            },
        }
    }

    /// True for failures that may succeed on retry without user action
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Network(_) => true,
            Self::Server { status, .. } => *status >= 500,
            _ => false,
        }
    }

    pub fn is_authorization(&self) -> bool {
        matches!(self, Self::Authorization(_))
    }

    /// Message suitable for showing to the user as-is
    pub fn detail(&self) -> String {
        match self {
            Self::Network(msg)
            | Self::Authorization(msg)
            | Self::Validation(msg)
            | Self::Storage(msg)
            | Self::Decode(msg) => msg.clone(),
            Self::Server { message, .. } => message.clone(),
            Self::RestoreFailed { reason, .. } => reason.clone(),
            Self::Busy(action) => format!("{} is already in progress", action),
        }
    }
}

impl From<reqwest::Error> for CannonError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Decode(err.to_string())
        } else if let Some(status) = err.status() {
            Self::from_status(status, None)
        } else {
            Self::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for CannonError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}

/// Result alias used across the client
pub type CannonResult<T> = Result<T, CannonError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classification() {
        assert!(matches!(
            CannonError::from_status(StatusCode::UNAUTHORIZED, None),
            CannonError::Authorization(_)
        ));
        assert!(matches!(
            CannonError::from_status(StatusCode::FORBIDDEN, Some("Paid only".into())),
            CannonError::Authorization(ref m) if m == "Paid only"
        ));
        assert!(matches!(
            CannonError::from_status(StatusCode::UNPROCESSABLE_ENTITY, None),
            CannonError::Validation(_)
        ));
        assert!(matches!(
            CannonError::from_status(StatusCode::NOT_FOUND, Some("Scan not found".into())),
            CannonError::Server { status: 404, .. }
        ));
        assert!(matches!(
            CannonError::from_status(StatusCode::BAD_GATEWAY, None),
            CannonError::Server { status: 502, .. }
        ));
    }

    #[test]
    fn test_transient_errors() {
        assert!(CannonError::Network("refused".into()).is_transient());
        assert!(CannonError::Server {
            status: 503,
            message: "down".into()
        }
        .is_transient());
        assert!(!CannonError::Server {
            status: 409,
            message: "exists".into()
        }
        .is_transient());
        assert!(!CannonError::Authorization("expired".into()).is_transient());
    }

    #[test]
    fn test_default_message_uses_reason_phrase() {
        let err = CannonError::from_status(StatusCode::INTERNAL_SERVER_ERROR, None);
        assert_eq!(err.detail(), "Internal Server Error");
    }
}
