use crate::config::{AuthorizerConfig, AuthorizerMode};
use crate::domain::ports::{Authorizer, AuthorizerRef};
use crate::error::{PaymentError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// Queries an external HTTP authorizer.
///
/// Fails closed: transport errors, non-2xx statuses, unrecognised bodies and
/// timeouts all resolve to `false`. There is no retry.
pub struct HttpAuthorizer {
    client: Client,
    url: String,
}

#[derive(Debug, Deserialize)]
struct AuthorizerResponse {
    status: Option<String>,
    data: Option<AuthorizerData>,
}

#[derive(Debug, Deserialize)]
struct AuthorizerData {
    authorization: Option<bool>,
}

impl HttpAuthorizer {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PaymentError::Config(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }

    async fn query(&self) -> reqwest::Result<(reqwest::StatusCode, String)> {
        let response = self.client.get(&self.url).send().await?;
        let status = response.status();
        let body = response.text().await?;
        Ok((status, body))
    }
}

/// Decides whether an authorizer response body grants authorization.
fn body_authorizes(body: &str) -> bool {
    match serde_json::from_str::<AuthorizerResponse>(body) {
        Ok(response) => {
            let success = response
                .status
                .is_some_and(|s| s.eq_ignore_ascii_case("success"));
            let flag = response
                .data
                .and_then(|d| d.authorization)
                .unwrap_or(true);
            success && flag
        }
        Err(_) => body.trim().eq_ignore_ascii_case("success"),
    }
}

#[async_trait]
impl Authorizer for HttpAuthorizer {
    async fn authorize(&self) -> bool {
        match self.query().await {
            Ok((status, body)) if status.is_success() => {
                let authorized = body_authorizes(&body);
                info!(%status, authorized, "Authorizer responded");
                authorized
            }
            Ok((status, body)) => {
                warn!(%status, body = %body, "Authorizer returned non-success status");
                false
            }
            Err(e) if e.is_timeout() => {
                warn!(url = %self.url, "Authorizer timed out");
                false
            }
            Err(e) => {
                error!(url = %self.url, error = %e, "Failed to reach authorizer");
                false
            }
        }
    }
}

/// Fixed answer, for offline runs and tests.
#[derive(Debug, Clone, Copy)]
pub struct StaticAuthorizer {
    approve: bool,
}

impl StaticAuthorizer {
    pub fn approving() -> Self {
        Self { approve: true }
    }

    pub fn denying() -> Self {
        Self { approve: false }
    }
}

#[async_trait]
impl Authorizer for StaticAuthorizer {
    async fn authorize(&self) -> bool {
        self.approve
    }
}

/// Builds the authorizer selected by configuration.
pub fn from_config(config: &AuthorizerConfig) -> Result<AuthorizerRef> {
    match config.mode {
        AuthorizerMode::Http => {
            let url = config.url.clone().ok_or_else(|| {
                PaymentError::Config("authorizer.url is required in http mode".to_string())
            })?;
            let timeout = Duration::from_millis(config.timeout_ms);
            Ok(Arc::new(HttpAuthorizer::new(url, timeout)?))
        }
        AuthorizerMode::AlwaysApprove => Ok(Arc::new(StaticAuthorizer::approving())),
        AuthorizerMode::AlwaysDeny => Ok(Arc::new(StaticAuthorizer::denying())),
    }
}
