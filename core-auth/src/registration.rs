//! Anonymous user registration against the smart server (`GET /newuser`).

use crate::error::{IdentityError, Result};
use crate::types::SmartUser;
use async_trait::async_trait;
use bridge_traits::http::{HttpClient, HttpRequest};
use std::sync::Arc;
use std::time::Duration;
use tracing::{instrument, warn};

/// Source of fresh user credentials.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserRegistrar: Send + Sync {
    async fn register(&self) -> Result<SmartUser>;
}

/// Registers through the server's `/newuser` endpoint.
pub struct HttpUserRegistrar {
    http_client: Arc<dyn HttpClient>,
    base_url: String,
}

impl HttpUserRegistrar {
    pub fn new(http_client: Arc<dyn HttpClient>, base_url: impl Into<String>) -> Self {
        Self {
            http_client,
            base_url: base_url.into(),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/newuser", self.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl UserRegistrar for HttpUserRegistrar {
    #[instrument(skip(self), fields(url = %self.endpoint()))]
    async fn register(&self) -> Result<SmartUser> {
        let request = HttpRequest::get(self.endpoint()).timeout(Duration::from_secs(20));

        let response = self
            .http_client
            .execute(request)
            .await
            .map_err(|e| IdentityError::NetworkError(e.to_string()))?;

        if !response.is_success() {
            let message = response
                .text()
                .unwrap_or_else(|_| "Unable to read error response".to_string());
            warn!(status = response.status, "User registration rejected");
            return Err(IdentityError::RegistrationFailed {
                status: response.status,
                message,
            });
        }

        let user: SmartUser = serde_json::from_slice(&response.body).map_err(|e| {
            IdentityError::SerializationFailed {
                context: "registration response".to_string(),
                source: e,
            }
        })?;

        if !user.is_valid() {
            return Err(IdentityError::InvalidUserRecord(
                "server returned an empty id or authkey".to_string(),
            ));
        }

        Ok(user)
    }
}
