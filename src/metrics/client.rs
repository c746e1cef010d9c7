use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info};

use super::kind::MetricKind;
use super::query::QueryBuilder;
use super::sample::{MetricSample, QueryError};

/// Issues one metric query against one node
#[async_trait]
pub trait MetricsClient: Send + Sync {
    /// Fetch a single value, keeping the failure detail for diagnostics
    async fn fetch(&self, kind: MetricKind, address: &str) -> Result<f64, QueryError>;

    async fn query(&self, kind: MetricKind, address: &str) -> MetricSample {
        MetricSample::from(self.fetch(kind, address).await)
    }
}

/// Client for the Prometheus instant query API (`/api/v1/query`)
pub struct PrometheusClient {
    http: Client,
    endpoint: String,
    queries: Arc<dyn QueryBuilder>,
}

impl PrometheusClient {
    pub fn new(endpoint: impl Into<String>, queries: Arc<dyn QueryBuilder>) -> Result<Self> {
        let endpoint = endpoint.into();
        let http = Client::builder()
            .build()
            .context("Failed to create HTTP client")?;

        info!("Prometheus client initialized for endpoint {}", endpoint);

        Ok(Self {
            http,
            endpoint,
            queries,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl MetricsClient for PrometheusClient {
    async fn fetch(&self, kind: MetricKind, address: &str) -> Result<f64, QueryError> {
        let query = self.queries.build(kind, address);
        debug!(%address, %kind, %query, "Sending metrics query");

        let response = self
            .http
            .get(&self.endpoint)
            .query(&[("query", query.as_str())])
            .send()
            .await
            .map_err(|e| QueryError::transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(QueryError::transport(format!("HTTP status {}", status)));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| QueryError::transport(format!("malformed response body: {}", e)))?;

        extract_value(&body)
    }
}

/// Pull `data.result[0].value[1]` out of an instant query response
pub fn extract_value(body: &Value) -> Result<f64, QueryError> {
    let results = body
        .get("data")
        .and_then(|data| data.get("result"))
        .and_then(Value::as_array)
        .ok_or_else(|| QueryError::shape("missing data.result"))?;

    let first = results
        .first()
        .ok_or_else(|| QueryError::shape("result list empty"))?;

    let pair = first
        .get("value")
        .and_then(Value::as_array)
        .ok_or_else(|| QueryError::shape("first result has no value"))?;

    let raw = pair
        .get(1)
        .ok_or_else(|| QueryError::shape("value list too short"))?;

    match raw {
        Value::String(text) => text
            .parse::<f64>()
            .map_err(|_| QueryError::shape(format!("value '{}' is not a number", text))),
        // Prometheus encodes sample values as strings
        other => Err(QueryError::shape(format!("value {} is not a string", other))),
    }
}
