//! HTTP client for the accrual oracle.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::{Client, StatusCode};
use tracing::debug;

use loyalty_shared::OrderNumber;

use crate::oracle::{AccrualInfo, AccrualOracle, OracleError, OracleResponse};

/// `AccrualOracle` speaking `GET {base}/api/orders/{number}`.
#[derive(Debug, Clone)]
pub struct HttpAccrualOracle {
    client: Client,
    base_url: String,
}

impl HttpAccrualOracle {
    /// Builds a client with a per-request timeout.
    ///
    /// A base URL without a scheme is treated as plain `http://`.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, OracleError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: normalize_base_url(base_url),
        })
    }

    /// Returns the normalized base URL.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

fn normalize_base_url(raw: &str) -> String {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("http://{trimmed}")
    }
}

/// Reads `Retry-After` as whole seconds. HTTP-date values are not supported.
fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

#[async_trait]
impl AccrualOracle for HttpAccrualOracle {
    async fn order_info(&self, number: OrderNumber) -> Result<OracleResponse, OracleError> {
        let url = format!("{}/api/orders/{number}", self.base_url);
        let response = self.client.get(&url).send().await?;
        let status = response.status();
        debug!(order = %number, status = status.as_u16(), "Oracle answered");

        match status {
            StatusCode::OK => {
                let info: AccrualInfo = response
                    .json()
                    .await
                    .map_err(|e| OracleError::MalformedBody(e.to_string()))?;
                Ok(OracleResponse::Resolved(info))
            }
            StatusCode::TOO_MANY_REQUESTS => Ok(OracleResponse::RateLimited {
                retry_after: parse_retry_after(response.headers()),
            }),
            StatusCode::NO_CONTENT => Ok(OracleResponse::NotRegistered),
            other => Err(OracleError::UnexpectedStatus(other.as_u16())),
        }
    }
}
