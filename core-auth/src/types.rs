use serde::{Deserialize, Serialize};
use std::fmt;

/// Credentials of the smart server account this installation talks as.
///
/// Anonymous users only have `id` and `authkey`; `username` is set once the
/// person logs in through the host's account dialog.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmartUser {
    pub id: String,
    pub authkey: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

impl SmartUser {
    pub fn new(id: impl Into<String>, authkey: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            authkey: authkey.into(),
            username: None,
        }
    }

    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    /// Logged-in (non-anonymous) account. Only presence counts; the server
    /// decides what a valid name is.
    pub fn has_username(&self) -> bool {
        self.username.is_some()
    }

    /// A record with an empty id or key cannot authenticate anything.
    pub fn is_valid(&self) -> bool {
        !self.id.trim().is_empty() && !self.authkey.trim().is_empty()
    }
}

impl fmt::Debug for SmartUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SmartUser")
            .field("id", &self.id)
            .field("authkey", &"[REDACTED]")
            .field("username", &self.username)
            .finish()
    }
}
