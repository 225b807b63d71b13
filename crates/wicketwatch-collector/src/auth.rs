//! Bearer credential acquisition for the collector service.

use crate::error::{CollectorError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use wicketwatch_core::CollectorConfig;

/// A bearer credential for the collector service.
///
/// Shared read-mostly: fetched per discovery cycle and per worker start,
/// never refreshed mid-loop. The anonymous form models the degraded
/// "proceed without auth" state callers fall back to when the token
/// endpoint is unavailable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    token: Option<String>,
    obtained_at: DateTime<Utc>,
}

impl Credential {
    /// A credential carrying a bearer token.
    #[must_use]
    pub fn bearer(token: String) -> Self {
        Self {
            token: Some(token),
            obtained_at: Utc::now(),
        }
    }

    /// A credential carrying no token. Requests made with it send no
    /// `Authorization` header.
    #[must_use]
    pub fn anonymous() -> Self {
        Self {
            token: None,
            obtained_at: Utc::now(),
        }
    }

    /// The bearer token, if any.
    #[must_use]
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// When this credential was obtained.
    #[must_use]
    pub fn obtained_at(&self) -> DateTime<Utc> {
        self.obtained_at
    }
}

#[derive(Debug, Serialize)]
struct TokenRequest<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    token: Option<String>,
}

/// Obtains bearer credentials from the collector's token endpoint.
pub struct TokenProvider {
    client: reqwest::Client,
    token_url: String,
    username: String,
    password: String,
}

impl TokenProvider {
    /// Build a provider from collector settings.
    pub fn new(config: &CollectorConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| CollectorError::Internal(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            token_url: format!(
                "{}/token/generate-token",
                config.base_url.trim_end_matches('/')
            ),
            username: config.username.clone(),
            password: config.password.clone(),
        })
    }

    /// Fetch a fresh credential.
    ///
    /// Failures are explicit: callers decide whether to abort or to
    /// degrade to [`Credential::anonymous`].
    pub async fn fetch(&self) -> Result<Credential> {
        let response = self
            .client
            .post(&self.token_url)
            .json(&TokenRequest {
                username: &self.username,
                password: &self.password,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(CollectorError::Status {
                endpoint: self.token_url.clone(),
                status: status.as_u16(),
            });
        }

        let body: TokenResponse = response.json().await?;
        let token = body.token.ok_or(CollectorError::MissingToken)?;

        tracing::debug!("Obtained bearer token from {}", self.token_url);
        Ok(Credential::bearer(token))
    }
}
