//! HTTP client for the player's web interface

use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;

use super::command::Command;
use super::types::{PlayerStatus, PlaylistNode};
use super::PlayerControl;
use crate::config::PlayerConfig;
use crate::error::{BridgeError, Result};

/// Client for `/requests/status.json` and `/requests/playlist.json`.
/// Cheap to clone.
#[derive(Clone)]
pub struct VlcClient {
    inner: Arc<VlcClientInner>,
}

struct VlcClientInner {
    base_url: String,
    password: String,
    request_timeout: Duration,
    http_client: Client,
}

impl VlcClient {
    /// Create a new client from configuration
    pub fn new(config: &PlayerConfig) -> Result<Self> {
        let http_client = Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()?;

        Ok(Self {
            inner: Arc::new(VlcClientInner {
                base_url: config.base_url(),
                password: config.password.clone(),
                request_timeout: config.request_timeout(),
                http_client,
            }),
        })
    }

    /// Build a URL for an interface endpoint
    fn build_url(&self, path: &str) -> String {
        format!("{}{}", self.inner.base_url, path)
    }

    fn get(&self, url: &str) -> RequestBuilder {
        // The interface uses basic auth with an empty user name.
        self.inner
            .http_client
            .get(url)
            .basic_auth("", Some(&self.inner.password))
    }

    async fn fetch<T: DeserializeOwned>(&self, request: RequestBuilder, what: &str) -> Result<T> {
        let response = request.send().await.map_err(|e| {
            tracing::debug!("{} request failed: {}", what, e);
            BridgeError::from(e)
        })?;
        let status = response.status();
        if !status.is_success() {
            return Err(BridgeError::PlayerUnreachable(format!(
                "{} returned HTTP {}",
                what, status
            )));
        }
        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }
}

impl PlayerControl for VlcClient {
    async fn status(&self) -> Result<PlayerStatus> {
        let request = self
            .get(&self.build_url("/requests/status.json"))
            .timeout(self.inner.request_timeout);
        self.fetch(request, "status").await
    }

    async fn send(&self, command: &Command) -> Result<PlayerStatus> {
        tracing::debug!("Player command: {}", command);
        // Commands rely on the transport's own timeout; a seek on a large
        // file can take a while to answer.
        let url = self.build_url(&format!("/requests/status.json?{}", command.query()));
        self.fetch(self.get(&url), command.name()).await
    }

    async fn playlist(&self) -> Result<PlaylistNode> {
        let request = self
            .get(&self.build_url("/requests/playlist.json"))
            .timeout(self.inner.request_timeout);
        self.fetch(request, "playlist").await
    }
}
