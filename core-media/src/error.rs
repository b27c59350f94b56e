use thiserror::Error;

#[derive(Error, Debug)]
pub enum FetchError {
    /// Unsupported scheme, or the server did not answer with an `image/*`
    /// content type. Nothing was written.
    #[error("Not an image: {0}")]
    NotAnImage(String),

    #[error("Fetch failed for {url}: {message}")]
    FetchFailed { url: String, message: String },
}

impl FetchError {
    pub(crate) fn failed(url: &str, message: impl Into<String>) -> Self {
        FetchError::FetchFailed {
            url: url.to_string(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, FetchError>;
