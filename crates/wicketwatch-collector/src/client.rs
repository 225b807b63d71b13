//! Delivery of extracted match data to the collector service.

use crate::auth::Credential;
use crate::error::{CollectorError, Result};
use serde_json::{json, Map, Value};
use wicketwatch_core::{CollectorConfig, MatchId};

/// Strip null-valued keys from an object, one level deep.
fn strip_nulls(object: &Map<String, Value>) -> Map<String, Value> {
    object
        .iter()
        .filter(|(_, v)| !v.is_null())
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

/// Shape a record for delivery.
///
/// Null-valued fields are stripped (shallow; for arrays, within each
/// element) and the originating match identifier is attached: object
/// payloads gain a `url` key, array payloads are wrapped as
/// `{"data": [...], "url": <id>}`.
#[must_use]
pub fn shape_payload(data: &Value, id: &MatchId) -> Value {
    match data {
        Value::Array(items) => {
            let filtered: Vec<Value> = items
                .iter()
                .map(|item| match item {
                    Value::Object(object) => Value::Object(strip_nulls(object)),
                    other => other.clone(),
                })
                .collect();
            json!({ "data": filtered, "url": id.as_str() })
        }
        Value::Object(object) => {
            let mut filtered = strip_nulls(object);
            filtered.insert("url".to_string(), Value::String(id.as_str().to_string()));
            Value::Object(filtered)
        }
        other => json!({ "data": other.clone(), "url": id.as_str() }),
    }
}

/// HTTP client for the collector endpoints.
pub struct CollectorClient {
    client: reqwest::Client,
    data_url: String,
    live_matches_url: String,
}

impl CollectorClient {
    /// Build a client from collector settings.
    pub fn new(config: &CollectorConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| CollectorError::Internal(format!("failed to create HTTP client: {e}")))?;

        let base = config.base_url.trim_end_matches('/');
        Ok(Self {
            client,
            data_url: format!("{base}/cricket-data"),
            live_matches_url: format!("{base}/cricket-data/add-live-matches"),
        })
    }

    /// Deliver one filtered record for a match. No retry; the caller
    /// logs and proceeds on failure.
    pub async fn send_match_data(
        &self,
        data: &Value,
        credential: &Credential,
        id: &MatchId,
    ) -> Result<()> {
        let payload = shape_payload(data, id);
        self.post(&self.data_url, &payload, credential).await
    }

    /// Forward the full discovered identifier list.
    pub async fn add_live_matches(&self, ids: &[MatchId], credential: &Credential) -> Result<()> {
        let payload = json!(ids);
        self.post(&self.live_matches_url, &payload, credential)
            .await
    }

    async fn post(&self, url: &str, payload: &Value, credential: &Credential) -> Result<()> {
        let mut request = self.client.post(url).json(payload);
        if let Some(token) = credential.token() {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            tracing::debug!("Delivered payload to {}", url);
            Ok(())
        } else {
            Err(CollectorError::Status {
                endpoint: url.to_string(),
                status: status.as_u16(),
            })
        }
    }
}
