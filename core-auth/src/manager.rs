//! # Identity Manager
//!
//! Owns the smart user record: loads it from `smart_user.json`, registers a
//! new anonymous user with the server when none exists, and swaps it out when
//! the host completes a login or the server rejects the stored credentials.
//!
//! The in-memory record is replaced wholesale, never edited in place, so
//! readers always see a consistent `(id, authkey, username)` triple.
//!
//! ## Usage
//!
//! ```ignore
//! use core_auth::{HttpUserRegistrar, IdentityManager, UserStore};
//!
//! let manager = IdentityManager::new(
//!     UserStore::new(fs.clone(), config.user_file()),
//!     Arc::new(HttpUserRegistrar::new(http.clone(), &config.api_base_url)),
//!     config.account_ui.clone(),
//!     event_bus.clone(),
//! );
//!
//! let user = manager.ensure_user(true).await?;
//! ```

use crate::error::{IdentityError, Result};
use crate::registration::UserRegistrar;
use crate::types::SmartUser;
use crate::user_store::UserStore;
use bridge_traits::AccountUi;
use core_runtime::events::{CoreEvent, EventBus, IdentityEvent};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, instrument, warn};

pub struct IdentityManager {
    store: UserStore,
    registrar: Arc<dyn UserRegistrar>,
    account_ui: Arc<dyn AccountUi>,
    event_bus: EventBus,
    user: RwLock<Option<SmartUser>>,
    /// Serializes load/register so two callers never register twice
    update_lock: Mutex<()>,
}

impl IdentityManager {
    pub fn new(
        store: UserStore,
        registrar: Arc<dyn UserRegistrar>,
        account_ui: Arc<dyn AccountUi>,
        event_bus: EventBus,
    ) -> Self {
        Self {
            store,
            registrar,
            account_ui,
            event_bus,
            user: RwLock::new(None),
            update_lock: Mutex::new(()),
        }
    }

    /// Cached user, without touching disk.
    pub async fn current_user(&self) -> Option<SmartUser> {
        self.user.read().await.clone()
    }

    /// Returns the cached user unless `force_reload` is set or nothing is
    /// cached, in which case `smart_user.json` is read again. When the file
    /// is missing or unreadable and `create_if_missing` is set, a new user is
    /// registered and persisted; otherwise `Ok(None)`.
    #[instrument(skip(self))]
    pub async fn load_user(
        &self,
        create_if_missing: bool,
        force_reload: bool,
    ) -> Result<Option<SmartUser>> {
        let _guard = self.update_lock.lock().await;

        if !force_reload {
            if let Some(user) = self.user.read().await.clone() {
                return Ok(Some(user));
            }
        }

        if let Some(user) = self.store.load().await {
            info!(user_id = %user.id, has_username = user.has_username(), "Loaded smart user");
            *self.user.write().await = Some(user.clone());
            self.account_ui.on_user_updated();
            self.emit(IdentityEvent::UserLoaded {
                user_id: user.id.clone(),
            });
            return Ok(Some(user));
        }

        if !create_if_missing {
            debug!("No smart user on disk and creation not requested");
            return Ok(None);
        }

        self.register_locked().await.map(Some)
    }

    /// `load_user(true, force_reload)` that always yields a user.
    pub async fn ensure_user(&self, force_reload: bool) -> Result<SmartUser> {
        self.load_user(true, force_reload)
            .await?
            .ok_or(IdentityError::NoUser)
    }

    /// Register a fresh anonymous user, persist it and make it current.
    #[instrument(skip(self))]
    pub async fn register_new_user(&self) -> Result<SmartUser> {
        let _guard = self.update_lock.lock().await;
        self.register_locked().await
    }

    async fn register_locked(&self) -> Result<SmartUser> {
        info!("Registering new smart user");
        let user = self.registrar.register().await?;
        self.store.save(&user).await?;

        *self.user.write().await = Some(user.clone());
        self.account_ui.on_user_updated();
        self.emit(IdentityEvent::UserRegistered {
            user_id: user.id.clone(),
        });

        info!(user_id = %user.id, "Registered new smart user");
        Ok(user)
    }

    /// Install a user obtained by the host's login flow.
    #[instrument(skip(self, user), fields(user_id = %user.id))]
    pub async fn replace_user(&self, user: SmartUser) -> Result<()> {
        if !user.is_valid() {
            return Err(IdentityError::InvalidUserRecord(
                "replacement user has an empty id or authkey".to_string(),
            ));
        }

        let _guard = self.update_lock.lock().await;
        self.store.save(&user).await?;

        let user_id = user.id.clone();
        *self.user.write().await = Some(user);
        self.account_ui.on_user_updated();
        self.emit(IdentityEvent::UserReplaced { user_id });
        Ok(())
    }

    /// The server refused `rejected`'s credentials: register a replacement
    /// user and ask the person to log in again.
    #[instrument(skip(self, rejected), fields(user_id = %rejected.id))]
    pub async fn refresh_rejected_credentials(&self, rejected: &SmartUser) -> Result<SmartUser> {
        warn!("Smart server rejected stored credentials");
        self.emit(IdentityEvent::CredentialsRejected {
            user_id: rejected.id.clone(),
        });

        let user = self.register_new_user().await?;
        self.account_ui.prompt_login();
        Ok(user)
    }

    fn emit(&self, event: IdentityEvent) {
        let _ = self.event_bus.emit(CoreEvent::Identity(event));
    }
}
