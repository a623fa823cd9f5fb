//! HTTP client for the notification REST API.
//!
//! Wraps reqwest and provides one method per backend endpoint, attaching
//! the bearer token supplied by the session layer on every request.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use thiserror::Error;

use crate::session::TokenProvider;

use super::models::{Notification, NotificationList, Preferences};

/// Errors for read and confirm calls against the REST API.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The session layer has no token to attach.
    #[error("no session token available")]
    MissingToken,

    /// Network-level failure, including the configured request timeout.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The server answered with a non-success status.
    #[error("server returned {0}")]
    Status(StatusCode),

    /// The response body did not match the documented shape.
    #[error("failed to decode response: {0}")]
    Decode(#[source] reqwest::Error),
}

/// The REST surface the notification store depends on.
///
/// `ApiClient` is the production implementation; tests substitute an
/// in-memory fake.
#[async_trait]
pub trait NotificationApi: Send + Sync {
    /// Fetch the full notification list (first page of a paginated
    /// response). Unsorted; ordering is the store's concern.
    async fn list_notifications(&self) -> Result<Vec<Notification>, FetchError>;

    /// Confirm a single notification as read.
    async fn mark_read(&self, id: u64) -> Result<(), FetchError>;

    /// Confirm every notification as read.
    async fn mark_all_read(&self) -> Result<(), FetchError>;

    /// Confirm deletion of a single notification.
    async fn delete_notification(&self, id: u64) -> Result<(), FetchError>;

    /// Fetch the per-category preferences.
    async fn get_preferences(&self) -> Result<Preferences, FetchError>;

    /// Confirm a preferences update. Returns the server's version.
    async fn update_preferences(&self, prefs: &Preferences) -> Result<Preferences, FetchError>;
}

/// Client for the notification backend REST API.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    tokens: Arc<dyn TokenProvider>,
}

impl ApiClient {
    /// Create a new ApiClient.
    ///
    /// # Arguments
    /// * `base_url` - Base URL of the backend (e.g., "http://localhost:8000")
    /// * `timeout_secs` - Request timeout in seconds
    /// * `tokens` - Source of the bearer token attached to each request
    pub fn new(
        base_url: impl Into<String>,
        timeout_secs: u64,
        tokens: Arc<dyn TokenProvider>,
    ) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;

        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }

        Ok(Self {
            client,
            base_url,
            tokens,
        })
    }

    /// Get the base URL of the backend.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn authorized(&self, request: RequestBuilder) -> Result<RequestBuilder, FetchError> {
        let token = self.tokens.bearer_token().ok_or(FetchError::MissingToken)?;
        Ok(request.bearer_auth(token))
    }

    async fn send_expecting_success(
        &self,
        request: RequestBuilder,
    ) -> Result<reqwest::Response, FetchError> {
        let response = self.authorized(request)?.send().await?;
        if !response.status().is_success() {
            return Err(FetchError::Status(response.status()));
        }
        Ok(response)
    }
}

#[async_trait]
impl NotificationApi for ApiClient {
    async fn list_notifications(&self) -> Result<Vec<Notification>, FetchError> {
        let url = format!("{}/api/notifications/", self.base_url);
        let response = self.send_expecting_success(self.client.get(&url)).await?;

        let list: NotificationList = response.json().await.map_err(FetchError::Decode)?;
        Ok(list.into_results())
    }

    async fn mark_read(&self, id: u64) -> Result<(), FetchError> {
        let url = format!("{}/api/notifications/{}/mark_read/", self.base_url, id);
        self.send_expecting_success(self.client.post(&url)).await?;
        Ok(())
    }

    async fn mark_all_read(&self) -> Result<(), FetchError> {
        let url = format!("{}/api/notifications/mark_all_read/", self.base_url);
        self.send_expecting_success(self.client.post(&url)).await?;
        Ok(())
    }

    async fn delete_notification(&self, id: u64) -> Result<(), FetchError> {
        let url = format!("{}/api/notifications/{}/", self.base_url, id);
        self.send_expecting_success(self.client.delete(&url)).await?;
        Ok(())
    }

    async fn get_preferences(&self) -> Result<Preferences, FetchError> {
        let url = format!("{}/api/preferences/", self.base_url);
        let response = self.send_expecting_success(self.client.get(&url)).await?;

        response.json().await.map_err(FetchError::Decode)
    }

    async fn update_preferences(&self, prefs: &Preferences) -> Result<Preferences, FetchError> {
        let url = format!("{}/api/preferences/{}/", self.base_url, prefs.id);
        let response = self
            .send_expecting_success(self.client.patch(&url).json(prefs))
            .await?;

        response.json().await.map_err(FetchError::Decode)
    }
}
