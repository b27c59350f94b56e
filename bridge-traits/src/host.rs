//! Host Application Callbacks
//!
//! The wallpaper application owns the UI and the preferences; the core only
//! asks questions and raises notifications through these traits.

/// User-facing notification surface (desktop toast, tray bubble, ...)
pub trait Notifier: Send + Sync {
    fn show_notification(&self, title: &str, message: &str);
}

/// Preference switches read at every sync checkpoint.
///
/// Both methods are called often and must be cheap and non-blocking.
pub trait FeatureGate: Send + Sync {
    /// The smart module as a whole is switched on
    fn is_smart_enabled(&self) -> bool;

    /// The host's "sync favorites" option is switched on
    fn is_sync_enabled(&self) -> bool;
}

/// Account related UI hooks
pub trait AccountUi: Send + Sync {
    /// The persisted user record changed (registered, reloaded or replaced)
    fn on_user_updated(&self);

    /// Ask the user to log in again after the server rejected the credentials
    fn prompt_login(&self);
}

/// Account UI for headless hosts
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopAccountUi;

impl AccountUi for NoopAccountUi {
    fn on_user_updated(&self) {}

    fn prompt_login(&self) {}
}
