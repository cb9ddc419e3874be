//! Row sources
//!
//! A row source turns a URL into one batch of raw rows. The HTTP source is
//! what the dashboard polls in production; tests plug in their own sources.

use crate::types::{RawRow, Result, TelemetryError};
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

/// Something that can deliver one batch of raw rows for a URL
#[async_trait]
pub trait RowSource: Send + Sync {
    /// Fetch and parse one batch. An empty batch is not an error.
    async fn fetch_rows(&self, url: &str) -> Result<Vec<RawRow>>;
}

/// Fetches a JSON array of flat objects with `GET <url>`
pub struct HttpRowSource {
    http_client: reqwest::Client,
}

impl HttpRowSource {
    /// Create a source whose requests give up after `timeout`
    pub fn new(timeout: Duration) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("telemetry-core/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { http_client })
    }
}

#[async_trait]
impl RowSource for HttpRowSource {
    async fn fetch_rows(&self, url: &str) -> Result<Vec<RawRow>> {
        log::debug!("GET {}", url);

        let response = self.http_client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(TelemetryError::HttpStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let body = response.text().await?;
        log::trace!("Received {} bytes from {}", body.len(), url);

        parse_batch(&body)
    }
}

/// Parse a response body into raw rows
///
/// `null` and `[]` both mean "nothing new". Any other non-array document, or
/// an array holding anything but objects, is malformed.
pub fn parse_batch(body: &str) -> Result<Vec<RawRow>> {
    let document: Value = serde_json::from_str(body)?;

    match document {
        Value::Null => Ok(Vec::new()),
        Value::Array(items) => items
            .into_iter()
            .enumerate()
            .map(|(idx, item)| match item {
                Value::Object(row) => Ok(row),
                other => Err(TelemetryError::MalformedPayload(format!(
                    "row {} is {}, expected an object",
                    idx,
                    json_kind(&other)
                ))),
            })
            .collect(),
        other => Err(TelemetryError::MalformedPayload(format!(
            "expected an array of rows, got {}",
            json_kind(&other)
        ))),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
