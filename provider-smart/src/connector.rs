//! Smart server API connector
//!
//! Endpoints used by sync and reporting:
//!
//! | Call | Endpoint |
//! |------|----------|
//! | [`SmartApi::fetch_snapshot`] | `GET /sync/{userId}` |
//! | [`SmartApi::fetch_image_info`] | `GET /image/{imageId}/json` |
//! | [`SmartApi::submit_report`] | `POST /user/{userId}/{tag}` (form: `image`, `authkey`) |
//!
//! Registration (`GET /newuser`) lives in `core-auth`.

use async_trait::async_trait;
use bridge_traits::http::{HttpClient, HttpRequest, HttpResponse, RetryPolicy};
use core_auth::SmartUser;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, warn};

use crate::error::{Result, SmartApiError};
use crate::types::{ImageInfo, ImageRecord, ReportTag, ServerSnapshot};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Remote operations the sync engine needs from the smart server.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SmartApi: Send + Sync {
    async fn fetch_snapshot(&self, user: &SmartUser) -> Result<ServerSnapshot>;

    async fn fetch_image_info(&self, image_id: &str) -> Result<ImageInfo>;

    /// Single attempt; callers own the retry policy.
    async fn submit_report(
        &self,
        user: &SmartUser,
        tag: ReportTag,
        record: &ImageRecord,
    ) -> Result<()>;
}

/// [`SmartApi`] over an [`HttpClient`].
///
/// # Example
///
/// ```ignore
/// use provider_smart::{SmartApi, SmartConnector};
///
/// let connector = SmartConnector::new(http_client, "http://localhost:4000");
/// let snapshot = connector.fetch_snapshot(&user).await?;
/// ```
pub struct SmartConnector {
    http_client: Arc<dyn HttpClient>,
    base_url: String,
}

impl SmartConnector {
    pub fn new(http_client: Arc<dyn HttpClient>, base_url: impl Into<String>) -> Self {
        Self {
            http_client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, segments: &[&str]) -> String {
        let mut url = self.base_url.clone();
        for segment in segments {
            url.push('/');
            url.push_str(&urlencoding::encode(segment));
        }
        url
    }

    async fn send(&self, request: HttpRequest, policy: RetryPolicy) -> Result<HttpResponse> {
        let url = request.url.clone();
        let response = self
            .http_client
            .execute_with_retry(request, policy)
            .await
            .map_err(|e| SmartApiError::NetworkError(e.to_string()))?;

        if !response.is_success() {
            let message = response
                .text()
                .unwrap_or_else(|_| "Unable to read error response".to_string());
            warn!(url = %url, status = response.status, "Smart API request failed");
            return Err(SmartApiError::ApiError {
                status_code: response.status,
                message,
            });
        }

        debug!(url = %url, status = response.status, "Smart API request succeeded");
        Ok(response)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: String) -> Result<T> {
        let request = HttpRequest::get(url)
            .header("Accept", "application/json")
            .timeout(REQUEST_TIMEOUT);
        let response = self.send(request, RetryPolicy::default()).await?;

        serde_json::from_slice(&response.body)
            .map_err(|e| SmartApiError::ParseError(e.to_string()))
    }
}

#[async_trait]
impl SmartApi for SmartConnector {
    #[instrument(skip(self, user), fields(user_id = %user.id))]
    async fn fetch_snapshot(&self, user: &SmartUser) -> Result<ServerSnapshot> {
        let snapshot: ServerSnapshot = self.get_json(self.url(&["sync", &user.id])).await?;
        debug!(
            favorites = snapshot.favorite.len(),
            trashed = snapshot.trash.len(),
            "Fetched server snapshot"
        );
        Ok(snapshot)
    }

    #[instrument(skip(self))]
    async fn fetch_image_info(&self, image_id: &str) -> Result<ImageInfo> {
        self.get_json(self.url(&["image", image_id, "json"])).await
    }

    #[instrument(skip(self, user, record), fields(user_id = %user.id))]
    async fn submit_report(
        &self,
        user: &SmartUser,
        tag: ReportTag,
        record: &ImageRecord,
    ) -> Result<()> {
        let image = serde_json::to_string(record)
            .map_err(|e| SmartApiError::EncodeError(e.to_string()))?;

        let request = HttpRequest::post(self.url(&["user", &user.id, tag.as_str()]))
            .form(&[("image", image.as_str()), ("authkey", user.authkey.as_str())])
            .map_err(|e| SmartApiError::EncodeError(e.to_string()))?
            .timeout(REQUEST_TIMEOUT);

        self.send(request, RetryPolicy::none()).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_traits::error::{BridgeError, Result as BridgeResult};
    use bridge_traits::http::HttpMethod;
    use bytes::Bytes;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Replays canned responses and records requests
    struct MockHttpClient {
        responses: Mutex<Vec<BridgeResult<HttpResponse>>>,
        requests: Mutex<Vec<HttpRequest>>,
    }

    impl MockHttpClient {
        fn new(responses: Vec<BridgeResult<HttpResponse>>) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(responses),
                requests: Mutex::new(Vec::new()),
            })
        }

        fn reply(status: u16, body: &str) -> BridgeResult<HttpResponse> {
            Ok(HttpResponse {
                status,
                headers: HashMap::new(),
                body: Bytes::from(body.to_string()),
            })
        }
    }

    #[async_trait]
    impl HttpClient for MockHttpClient {
        async fn execute(&self, request: HttpRequest) -> BridgeResult<HttpResponse> {
            self.requests.lock().unwrap().push(request);
            self.responses.lock().unwrap().remove(0)
        }
    }

    fn user() -> SmartUser {
        SmartUser::new("u1", "secret key")
    }

    fn record() -> ImageRecord {
        ImageRecord {
            thumbnail: "AAAA".to_string(),
            width: 1920,
            height: 1080,
            origin_url: Some("http://example.com/a.jpg".to_string()),
            source_name: None,
            source_location: None,
            image_url: None,
        }
    }

    #[tokio::test]
    async fn test_fetch_snapshot() {
        let http = MockHttpClient::new(vec![MockHttpClient::reply(
            200,
            r#"{"favorite":["a1"],"trash":[]}"#,
        )]);
        let connector = SmartConnector::new(http.clone(), "http://localhost:4000/");

        let snapshot = connector.fetch_snapshot(&user()).await.unwrap();

        assert!(snapshot.is_favorite("a1"));
        let requests = http.requests.lock().unwrap();
        assert_eq!(requests[0].url, "http://localhost:4000/sync/u1");
        assert_eq!(requests[0].method, HttpMethod::Get);
    }

    #[tokio::test]
    async fn test_fetch_image_info_parse_error() {
        let http = MockHttpClient::new(vec![MockHttpClient::reply(200, "<html>")]);
        let connector = SmartConnector::new(http.clone(), "http://localhost:4000");

        let result = connector.fetch_image_info("abc").await;

        assert!(matches!(result, Err(SmartApiError::ParseError(_))));
        assert_eq!(
            http.requests.lock().unwrap()[0].url,
            "http://localhost:4000/image/abc/json"
        );
    }

    #[tokio::test]
    async fn test_submit_report_posts_form() {
        let http = MockHttpClient::new(vec![MockHttpClient::reply(200, "ok")]);
        let connector = SmartConnector::new(http.clone(), "http://localhost:4000");

        connector
            .submit_report(&user(), ReportTag::Favorite, &record())
            .await
            .unwrap();

        let requests = http.requests.lock().unwrap();
        let request = &requests[0];
        assert_eq!(request.method, HttpMethod::Post);
        assert_eq!(request.url, "http://localhost:4000/user/u1/favorite");

        let body = String::from_utf8(request.body.clone().unwrap().to_vec()).unwrap();
        let fields: HashMap<String, String> = body
            .split('&')
            .filter_map(|pair| pair.split_once('='))
            .map(|(k, v)| {
                let v = v.replace('+', " ");
                (k.to_string(), urlencoding::decode(&v).unwrap().into_owned())
            })
            .collect();
        assert_eq!(fields["authkey"], "secret key");
        let image: ImageRecord = serde_json::from_str(&fields["image"]).unwrap();
        assert_eq!(image, record());
    }

    #[tokio::test]
    async fn test_submit_report_maps_status() {
        let http = MockHttpClient::new(vec![MockHttpClient::reply(403, "unknown user")]);
        let connector = SmartConnector::new(http, "http://localhost:4000");

        let error = connector
            .submit_report(&user(), ReportTag::Trash, &record())
            .await
            .unwrap_err();

        assert!(error.is_auth_rejection());
    }

    #[tokio::test]
    async fn test_transport_failure_is_network_error() {
        let http = MockHttpClient::new(vec![Err(BridgeError::Timeout(
            "http://localhost:4000/sync/u1".to_string(),
        ))]);
        let connector = SmartConnector::new(http, "http://localhost:4000");

        assert!(matches!(
            connector.fetch_snapshot(&user()).await,
            Err(SmartApiError::NetworkError(_))
        ));
    }
}
