//! HTTP client for the health gateway.
//!
//! The client owns its HTTP connection pool and bearer-token cache. One
//! instance is built at startup and shared by every check cycle.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode, Url};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, instrument, warn};
use vigil_types::{HealthSnapshot, MonitoredService};

use super::payload::parse_resource;
use super::HealthFetcher;
use crate::error::{HealthError, HealthResult};

/// Refresh tokens this long before the gateway would expire them.
const TOKEN_REFRESH_MARGIN: Duration = Duration::from_secs(30);

/// Gateway client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Gateway base URL, e.g. `https://gateway.internal/api`.
    pub base_url: String,

    /// Client credentials; `None` for gateways without authentication.
    pub credentials: Option<GatewayCredentials>,

    /// Per-request timeout.
    pub request_timeout: Duration,
}

/// Client-credentials pair exchanged for a bearer token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayCredentials {
    pub client_id: String,
    pub client_secret: String,
}

#[derive(Debug, Serialize)]
struct TokenRequest<'a> {
    client_id: &'a str,
    client_secret: &'a str,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

#[derive(Debug, Clone)]
struct CachedToken {
    value: String,
    expires_at: Instant,
}

impl CachedToken {
    fn is_fresh(&self, now: Instant) -> bool {
        now + TOKEN_REFRESH_MARGIN < self.expires_at
    }
}

/// Authenticated gateway client.
pub struct GatewayClient {
    http: Client,
    base_url: String,
    credentials: Option<GatewayCredentials>,
    token: RwLock<Option<CachedToken>>,
}

impl GatewayClient {
    /// Create a new gateway client.
    pub fn new(config: GatewayConfig) -> HealthResult<Self> {
        Url::parse(&config.base_url).map_err(|e| {
            HealthError::ConfigurationError(format!(
                "invalid gateway base url {}: {}",
                config.base_url, e
            ))
        })?;

        let http = Client::builder().timeout(config.request_timeout).build()?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            credentials: config.credentials,
            token: RwLock::new(None),
        })
    }

    /// Fetch the raw aggregated health response for one resource.
    pub async fn fetch_resource(&self, resource: &str) -> HealthResult<serde_json::Value> {
        let token = self.bearer_token(false).await?;
        let mut response = self.send_health_request(resource, token.as_deref()).await?;

        if response.status() == StatusCode::UNAUTHORIZED && self.credentials.is_some() {
            debug!(resource = %resource, "Gateway rejected cached token, refreshing");
            let token = self.bearer_token(true).await?;
            response = self.send_health_request(resource, token.as_deref()).await?;
        }

        let status = response.status();
        if !status.is_success() {
            return Err(HealthError::UpstreamStatus {
                resource: resource.to_string(),
                status: status.as_u16(),
            });
        }

        Ok(response.json().await?)
    }

    async fn send_health_request(
        &self,
        resource: &str,
        token: Option<&str>,
    ) -> HealthResult<Response> {
        let url = format!("{}/health", self.base_url);
        let mut request = self.http.get(&url).query(&[("resources", resource)]);
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        Ok(request.send().await?)
    }

    /// Current bearer token, requesting a new one when missing, stale or
    /// explicitly invalidated.
    async fn bearer_token(&self, force_refresh: bool) -> HealthResult<Option<String>> {
        let Some(credentials) = &self.credentials else {
            return Ok(None);
        };

        if !force_refresh {
            if let Some(token) = self.token.read().await.as_ref() {
                if token.is_fresh(Instant::now()) {
                    return Ok(Some(token.value.clone()));
                }
            }
        }

        let mut slot = self.token.write().await;

        // Another check may have refreshed while we waited for the lock.
        if !force_refresh {
            if let Some(token) = slot.as_ref() {
                if token.is_fresh(Instant::now()) {
                    return Ok(Some(token.value.clone()));
                }
            }
        }

        let token = self.request_token(credentials).await?;
        let value = token.value.clone();
        *slot = Some(token);
        Ok(Some(value))
    }

    async fn request_token(&self, credentials: &GatewayCredentials) -> HealthResult<CachedToken> {
        debug!("Requesting gateway token");

        let url = format!("{}/auth/token", self.base_url);
        let response = self
            .http
            .post(&url)
            .json(&TokenRequest {
                client_id: &credentials.client_id,
                client_secret: &credentials.client_secret,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(HealthError::Auth(format!(
                "token endpoint returned {}",
                status
            )));
        }

        let body: TokenResponse = response.json().await?;
        Ok(CachedToken {
            value: body.access_token,
            expires_at: Instant::now() + Duration::from_secs(body.expires_in),
        })
    }
}

#[async_trait]
impl HealthFetcher for GatewayClient {
    #[instrument(skip(self, service), fields(service_id = %service.id, resource = %service.source_id))]
    async fn fetch(&self, service: &MonitoredService) -> HealthSnapshot {
        let start = Instant::now();

        let result = match self.fetch_resource(&service.source_id).await {
            Ok(body) => parse_resource(&body, &service.source_id),
            Err(e) => Err(e),
        };

        let latency_ms = start.elapsed().as_millis() as u64;

        match result {
            Ok(parsed) => parsed.into_snapshot(latency_ms),
            Err(e) => {
                warn!(error = %e, latency_ms, "Health fetch failed, treating service as unreachable");
                HealthSnapshot::unreachable(latency_ms)
            }
        }
    }

    fn name(&self) -> &str {
        "gateway"
    }
}
