use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Configuration error: {0}")]
    Config(#[from] core_runtime::Error),

    #[error("Identity error: {0}")]
    Identity(#[from] core_auth::IdentityError),

    #[error("Sync error: {0}")]
    Sync(#[from] core_sync::SyncError),

    #[error("Fetch error: {0}")]
    Fetch(#[from] core_media::FetchError),
}

pub type Result<T> = std::result::Result<T, CoreError>;
