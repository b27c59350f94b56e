//! # Smart Sync Module
//!
//! Keeps the local Favorites folder and the smart server in agreement.
//!
//! ## Components
//!
//! - **Coordinator** (`coordinator`): background sync runs with generation-based
//!   supersession
//! - **Reporter** (`reporter`): favorite/trash reports with bounded retry and a
//!   one-time credential refresh
//! - **Ledger** (`ledger`): `syncdb.json`, what earlier runs already did
//! - **Image ids** (`image_id`): server id derived from an image's source URL
//! - **Generations** (`token`): the only concurrency control between runs

pub mod coordinator;
pub mod error;
pub mod image_id;
pub mod ledger;
pub mod reporter;
pub mod token;

pub use coordinator::{build_download_list, SyncCoordinator, SyncHandle, SyncOutcome, SyncStats};
pub use error::{Result, SyncError};
pub use image_id::image_id;
pub use ledger::{FileStatus, ImageStatus, LedgerStore, SyncDb};
pub use reporter::{ReportOutcome, Reporter};
pub use token::{SyncGeneration, SyncToken};
