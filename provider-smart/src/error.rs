//! Error types for the smart server connector

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SmartApiError {
    /// Server answered with a non-2xx status
    #[error("Smart API error (status {status_code}): {message}")]
    ApiError { status_code: u16, message: String },

    /// Failed to parse API response
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// Request never got a response
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Request body could not be built
    #[error("Failed to encode request: {0}")]
    EncodeError(String),
}

impl SmartApiError {
    /// The server answers 403 or 404 when the user id / authkey pair is no
    /// longer known to it.
    pub fn is_auth_rejection(&self) -> bool {
        matches!(
            self,
            SmartApiError::ApiError {
                status_code: 403 | 404,
                ..
            }
        )
    }

    pub fn status_code(&self) -> Option<u16> {
        match self {
            SmartApiError::ApiError { status_code, .. } => Some(*status_code),
            _ => None,
        }
    }
}

/// Result type for smart API operations
pub type Result<T> = std::result::Result<T, SmartApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn api_error(status_code: u16) -> SmartApiError {
        SmartApiError::ApiError {
            status_code,
            message: String::new(),
        }
    }

    #[test]
    fn test_error_display() {
        let error = SmartApiError::ApiError {
            status_code: 500,
            message: "boom".to_string(),
        };

        assert_eq!(error.to_string(), "Smart API error (status 500): boom");
    }

    #[test]
    fn test_auth_rejection_classification() {
        assert!(api_error(403).is_auth_rejection());
        assert!(api_error(404).is_auth_rejection());
        assert!(!api_error(401).is_auth_rejection());
        assert!(!api_error(500).is_auth_rejection());
        assert!(!SmartApiError::NetworkError("reset".to_string()).is_auth_rejection());
        assert_eq!(api_error(500).status_code(), Some(500));
    }
}
