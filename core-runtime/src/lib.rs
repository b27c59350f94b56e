//! # Core Runtime Module
//!
//! Runtime infrastructure shared by the smart sync crates:
//! - Logging and tracing setup
//! - [`SmartConfig`](config::SmartConfig) and its builder
//! - The [`EventBus`](events::EventBus) and event types

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use error::{Error, Result};
