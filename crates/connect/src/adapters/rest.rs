//! Generic JSON-over-REST platform adapter.
//!
//! Every supported platform speaks a JSON API whose normalized payloads
//! deserialize directly into the canonical record shapes; per-platform
//! field mapping beyond that shape lives behind each platform's gateway
//! and is out of scope here. All requests are blocking-per-job with a
//! bounded timeout, so a stalled platform only occupies its own worker
//! slot.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::debug;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;

use super::{AdapterError, PlatformAdapter};
use crate::credentials::CredentialProvider;
use clearway_core::connections::{Connection, Platform};
use clearway_core::holdings::PlatformHolding;
use clearway_core::investors::{PlatformCapitalCall, PlatformInvestor};
use clearway_core::performance::{PerformancePeriod, PlatformPerformance};
use clearway_core::transactions::PlatformTransaction;

/// Per-request timeout for all platform calls.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct RestAdapterConfig {
    pub base_url: String,
}

/// REST adapter for one platform.
pub struct RestPlatformAdapter {
    platform: Platform,
    config: RestAdapterConfig,
    credentials: Arc<dyn CredentialProvider>,
    client: reqwest::Client,
}

impl RestPlatformAdapter {
    pub fn new(
        platform: Platform,
        config: RestAdapterConfig,
        credentials: Arc<dyn CredentialProvider>,
    ) -> Result<Self, AdapterError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| AdapterError::Http {
                platform: platform.to_string(),
                message: e.to_string(),
            })?;
        Ok(Self {
            platform,
            config,
            credentials,
            client,
        })
    }

    fn url(&self, connection: &Connection, path: &str) -> String {
        format!(
            "{}/accounts/{}/{}",
            self.config.base_url.trim_end_matches('/'),
            connection.account_id,
            path
        )
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        connection: &Connection,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, AdapterError> {
        let token = self.credentials.bearer_token(connection).await?;
        let url = self.url(connection, path);
        debug!("GET {} ({})", url, self.platform);

        let response = self
            .client
            .get(&url)
            .bearer_auth(token)
            .query(query)
            .send()
            .await
            .map_err(|e| AdapterError::Http {
                platform: self.platform.to_string(),
                message: e.to_string(),
            })?;

        match response.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(AdapterError::Auth {
                platform: self.platform.to_string(),
                message: format!("{} returned {}", url, response.status()),
            }),
            status if !status.is_success() => Err(AdapterError::Http {
                platform: self.platform.to_string(),
                message: format!("{} returned {}", url, status),
            }),
            _ => response.json::<T>().await.map_err(|e| AdapterError::Data {
                platform: self.platform.to_string(),
                message: e.to_string(),
            }),
        }
    }
}

#[async_trait]
impl PlatformAdapter for RestPlatformAdapter {
    fn platform(&self) -> Platform {
        self.platform
    }

    async fn fetch_holdings(
        &self,
        connection: &Connection,
    ) -> Result<Vec<PlatformHolding>, AdapterError> {
        self.get_json(connection, "holdings", &[]).await
    }

    async fn fetch_transactions(
        &self,
        connection: &Connection,
        since: DateTime<Utc>,
    ) -> Result<Vec<PlatformTransaction>, AdapterError> {
        self.get_json(
            connection,
            "transactions",
            &[("since", since.to_rfc3339())],
        )
        .await
    }

    async fn fetch_performance(
        &self,
        connection: &Connection,
        period: PerformancePeriod,
    ) -> Result<Vec<PlatformPerformance>, AdapterError> {
        self.get_json(
            connection,
            "performance",
            &[("period", period.as_str().to_string())],
        )
        .await
    }

    async fn fetch_investors(
        &self,
        connection: &Connection,
    ) -> Result<Vec<PlatformInvestor>, AdapterError> {
        if !self.platform.is_fund_admin() {
            return Ok(Vec::new());
        }
        self.get_json(connection, "investors", &[]).await
    }

    async fn fetch_capital_calls(
        &self,
        connection: &Connection,
    ) -> Result<Vec<PlatformCapitalCall>, AdapterError> {
        if !self.platform.is_fund_admin() {
            return Ok(Vec::new());
        }
        self.get_json(connection, "capital-calls", &[]).await
    }

    async fn test_connection(&self, connection: &Connection) -> Result<bool, AdapterError> {
        match self
            .get_json::<serde_json::Value>(connection, "status", &[])
            .await
        {
            Ok(_) => Ok(true),
            Err(AdapterError::Auth { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn revoke_access(&self, connection: &Connection) -> Result<(), AdapterError> {
        let token = self.credentials.bearer_token(connection).await?;
        let url = self.url(connection, "authorization");
        let response = self
            .client
            .delete(&url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| AdapterError::Http {
                platform: self.platform.to_string(),
                message: e.to_string(),
            })?;
        if response.status().is_success() || response.status() == StatusCode::NOT_FOUND {
            Ok(())
        } else {
            Err(AdapterError::Http {
                platform: self.platform.to_string(),
                message: format!("{} returned {}", url, response.status()),
            })
        }
    }
}
