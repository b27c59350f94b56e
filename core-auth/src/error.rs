use thiserror::Error;

#[derive(Error, Debug)]
pub enum IdentityError {
    #[error("User registration failed (HTTP {status}): {message}")]
    RegistrationFailed { status: u16, message: String },

    #[error("Registration response invalid: {0}")]
    InvalidUserRecord(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("User file could not be written: {0}")]
    StorageFailed(String),

    #[error("Serialization failed for {context}: {source}")]
    SerializationFailed {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("No smart user available")]
    NoUser,
}

pub type Result<T> = std::result::Result<T, IdentityError>;
