use bridge_traits::BridgeError;
use core_auth::IdentityError;
use core_media::FetchError;
use provider_smart::SmartApiError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    /// A newer run bumped the generation; the current one must stop
    /// without writing.
    #[error("Sync superseded by a newer run")]
    Superseded,

    /// The smart feature (or sync option) was switched off mid-run.
    #[error("Smart sync disabled")]
    Disabled,

    #[error("Identity error: {0}")]
    Identity(#[from] IdentityError),

    #[error("Smart server error: {0}")]
    Api(#[from] SmartApiError),

    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error("Ledger serialization failed: {0}")]
    Ledger(#[from] serde_json::Error),

    #[error("Bridge error: {0}")]
    Bridge(#[from] BridgeError),
}

impl SyncError {
    /// Control signals end a run quietly rather than as a failure.
    pub fn is_stop_signal(&self) -> bool {
        matches!(self, SyncError::Superseded | SyncError::Disabled)
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;
