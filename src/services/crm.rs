// CRM Sync Service
// Best-effort contact upserts toward a HubSpot-style CRM; failures are logged
// by callers and never surface into referral or signup writes

use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{error, info, instrument};

use crate::app_config::CrmConfig;

#[derive(Debug, Error)]
pub enum CrmError {
    #[error("CRM request failed: {0}")]
    RequestFailed(String),

    #[error("CRM service unavailable")]
    ServiceUnavailable,
}

/// Contact upsert seam toward the marketing CRM
#[async_trait]
pub trait CrmSync: Send + Sync {
    async fn upsert_contact(
        &self,
        email: &str,
        attributes: serde_json::Value,
    ) -> Result<(), CrmError>;
}

/// HTTP client for a HubSpot-style contacts endpoint
#[derive(Clone)]
pub struct HubSpotClient {
    client: Arc<Client>,
    api_url: String,
    api_key: String,
}

impl HubSpotClient {
    pub fn new(config: &CrmConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(5))
            .build()
            .unwrap_or_default();

        Self {
            client: Arc::new(client),
            api_url: config.api_url.clone(),
            api_key: config.api_key.clone(),
        }
    }
}

#[async_trait]
impl CrmSync for HubSpotClient {
    #[instrument(skip(self, attributes))]
    async fn upsert_contact(
        &self,
        email: &str,
        attributes: serde_json::Value,
    ) -> Result<(), CrmError> {
        let payload = json!({
            "properties": {
                "email": email,
            },
            "attributes": attributes,
        });

        let response = self
            .client
            .post(&self.api_url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&payload)
            .send()
            .await;

        match response {
            Ok(res) if res.status().is_success() => {
                info!("CRM contact upserted for {}", email);
                Ok(())
            },
            Ok(res) if res.status().is_server_error() => {
                error!("CRM upsert failed with status {}", res.status());
                Err(CrmError::ServiceUnavailable)
            },
            Ok(res) => Err(CrmError::RequestFailed(format!(
                "status {}",
                res.status()
            ))),
            Err(e) => {
                error!("CRM network error: {}", e);
                Err(CrmError::RequestFailed(e.to_string()))
            },
        }
    }
}

/// Disabled CRM: swallows every upsert. Used when no CRM is configured and
/// by the test suite.
#[derive(Default, Clone)]
pub struct NoopCrm;

#[async_trait]
impl CrmSync for NoopCrm {
    async fn upsert_contact(
        &self,
        _email: &str,
        _attributes: serde_json::Value,
    ) -> Result<(), CrmError> {
        Ok(())
    }
}
