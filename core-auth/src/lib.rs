//! # Smart Identity Module
//!
//! Manages the credentials this installation uses against the smart server.
//!
//! ## Overview
//!
//! - [`SmartUser`] - `{id, authkey, username?}`
//! - [`UserStore`] - `smart_user.json` persistence, corrupt files read as absent
//! - [`UserRegistrar`] / [`HttpUserRegistrar`] - `GET /newuser`
//! - [`IdentityManager`] - load, register, replace and credential refresh

pub mod error;
pub mod manager;
pub mod registration;
pub mod types;
pub mod user_store;

pub use error::{IdentityError, Result};
pub use manager::IdentityManager;
pub use registration::{HttpUserRegistrar, UserRegistrar};
pub use types::SmartUser;
pub use user_store::UserStore;
