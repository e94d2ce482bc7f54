use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, error, info};
use url::Url;

use super::transform::{group_streams_for_push, LokiPushRequest};
use crate::stream::LogStream;
use crate::transport::{Pong, Transport, TransportError};

const PING_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct LokiConfig {
    /// Base URL for Loki (e.g., "http://loki:3100")
    pub url: String,

    /// Optional tenant ID for multi-tenant Loki (X-Scope-OrgID header)
    pub tenant_id: Option<String>,

    /// Optional basic auth username
    pub username: Option<String>,

    /// Optional basic auth password
    pub password: Option<String>,

    /// Push request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for LokiConfig {
    fn default() -> Self {
        Self {
            url: "http://127.0.0.1:3100".to_string(),
            tenant_id: None,
            username: None,
            password: None,
            timeout_secs: 30,
        }
    }
}

impl LokiConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    /// Get the push endpoint URL
    pub fn push_url(&self) -> String {
        format!("{}/loki/api/v1/push", self.url.trim_end_matches('/'))
    }

    /// Get the readiness endpoint URL
    pub fn ready_url(&self) -> String {
        format!("{}/ready", self.url.trim_end_matches('/'))
    }
}

/// Prefix `http://` when the address carries no scheme, then validate it.
pub fn normalize_address(address: &str) -> Result<String, url::ParseError> {
    let address = address.trim();
    let address = if address.starts_with("http://") || address.starts_with("https://") {
        address.to_string()
    } else {
        format!("http://{}", address)
    };

    Url::parse(&address)?;
    Ok(address)
}

/// Loki JSON v1 push API transport.
///
/// Every push is a single HTTP request; failures are reported to the caller
/// and never retried.
pub struct LokiClient {
    client: Client,
    config: LokiConfig,
    healthy: AtomicBool,
}

impl LokiClient {
    pub fn new(config: LokiConfig) -> Result<Self, TransportError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        info!(url = %config.url, "Loki client initialized");

        Ok(Self {
            client,
            config,
            healthy: AtomicBool::new(true),
        })
    }

    async fn send_push_request(&self, request: &LokiPushRequest) -> Result<(), TransportError> {
        let body = serde_json::to_vec(request)?;

        let req = self
            .client
            .post(self.config.push_url())
            .header("Content-Type", "application/json")
            .body(body);

        let response = self.authorize(req).send().await?;
        let status = response.status();

        if status.is_success() {
            Ok(())
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(TransportError::LokiResponse {
                status: status.as_u16(),
                body,
            })
        }
    }

    fn authorize(&self, mut req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        // Add tenant header if configured
        if let Some(ref tenant_id) = self.config.tenant_id {
            req = req.header("X-Scope-OrgID", tenant_id);
        }

        if let (Some(username), Some(password)) = (&self.config.username, &self.config.password) {
            req = req.basic_auth(username, Some(password));
        }

        req
    }

    /// Check if the client is healthy (last push succeeded).
    pub fn is_healthy(&self) -> bool {
        self.healthy.load(Ordering::Relaxed)
    }

    fn mark_healthy(&self) {
        if !self.healthy.swap(true, Ordering::SeqCst) {
            info!("Loki connection recovered");
        }
    }

    fn mark_unhealthy(&self) {
        if self.healthy.swap(false, Ordering::SeqCst) {
            error!("Loki connection unhealthy");
        }
    }
}

#[async_trait]
impl Transport for LokiClient {
    async fn push(&self, streams: &[LogStream]) -> Result<(), TransportError> {
        let request = group_streams_for_push(streams);
        if request.streams.is_empty() {
            return Ok(());
        }

        match self.send_push_request(&request).await {
            Ok(()) => {
                self.mark_healthy();
                debug!(streams = request.streams.len(), "Pushed streams to Loki");
                Ok(())
            }
            Err(e) => {
                self.mark_unhealthy();
                Err(e)
            }
        }
    }

    async fn ping(&self) -> Result<Pong, TransportError> {
        let req = self
            .client
            .get(self.config.ready_url())
            .timeout(PING_TIMEOUT);

        let response = self.authorize(req).send().await?;

        Ok(Pong {
            is_ready: response.status().is_success(),
        })
    }
}
