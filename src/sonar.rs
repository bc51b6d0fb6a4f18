use std::error::Error as _;
use std::io;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::error::StepError;
use crate::types::{MeasuresResponse, MetricsSnapshot};

pub const MEASURES_PATH: &str = "/api/measures/search";

pub const METRIC_KEYS: &str = "alert_status,bugs,reliability_rating,vulnerabilities,security_rating,code_smells,sqale_rating,duplicated_lines_density,coverage,ncloc,ncloc_language_distribution";

/// Anything that can produce a metrics snapshot for a Sonar project.
#[async_trait]
pub trait MetricsSource: Send + Sync {
    async fn fetch_measures(&self, project_key: &str) -> Result<MetricsSnapshot, StepError>;
}

pub struct SonarClient {
    host: String,
    token: String,
    http: reqwest::Client,
}

impl SonarClient {
    pub fn new(host: &str, token: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            host: host.to_string(),
            token: token.to_string(),
            http,
        })
    }

    pub fn measures_url(&self) -> String {
        format!("{}{}", self.host, MEASURES_PATH)
    }

    fn build_request(&self, project_key: &str) -> reqwest::RequestBuilder {
        let req = self
            .http
            .get(self.measures_url())
            .query(&[("projectKeys", project_key), ("metricKeys", METRIC_KEYS)]);
        // public projects are readable anonymously
        if self.token.is_empty() {
            req
        } else {
            req.bearer_auth(&self.token)
        }
    }
}

#[async_trait]
impl MetricsSource for SonarClient {
    async fn fetch_measures(&self, project_key: &str) -> Result<MetricsSnapshot, StepError> {
        let url = self.measures_url();
        info!(
            "request sonar metrics from {} with params projectKeys={} metricKeys={}",
            url, project_key, METRIC_KEYS
        );

        let res = self
            .build_request(project_key)
            .send()
            .await
            .map_err(transport_error)?;

        let status = res.status();
        let body = res.text().await.map_err(transport_error)?;
        debug!(status = status.as_u16(), body_bytes = body.len(), "received sonar response");

        if !status.is_success() {
            return Err(StepError::transport(
                status_code(status),
                format!("Request failed with status code {}", status.as_u16()),
                serialize_body(&body),
            ));
        }

        let parsed: MeasuresResponse = serde_json::from_str(&body).map_err(|e| {
            StepError::transport("ERR_BAD_RESPONSE", e.to_string(), serialize_body(&body))
        })?;
        Ok(flatten_measures(parsed))
    }
}

/// Later entries win on duplicate metric names; measures without a value are dropped.
pub fn flatten_measures(response: MeasuresResponse) -> MetricsSnapshot {
    response
        .measures
        .into_iter()
        .filter_map(|m| m.value.map(|v| (m.metric, v)))
        .collect()
}

fn status_code(status: reqwest::StatusCode) -> &'static str {
    if status.is_client_error() {
        "ERR_BAD_REQUEST"
    } else {
        "ERR_BAD_RESPONSE"
    }
}

/// errno-style name for the socket failures a connect can hit.
fn io_error_code(kind: io::ErrorKind) -> &'static str {
    match kind {
        io::ErrorKind::ConnectionRefused => "ECONNREFUSED",
        io::ErrorKind::ConnectionReset => "ECONNRESET",
        io::ErrorKind::ConnectionAborted => "ECONNABORTED",
        io::ErrorKind::TimedOut => "ETIMEDOUT",
        io::ErrorKind::AddrNotAvailable => "EADDRNOTAVAIL",
        io::ErrorKind::NotFound => "ENOTFOUND",
        _ => "ERR_NETWORK",
    }
}

fn io_kind(err: &reqwest::Error) -> Option<io::ErrorKind> {
    let mut source = err.source();
    while let Some(cause) = source {
        if let Some(io_err) = cause.downcast_ref::<io::Error>() {
            return Some(io_err.kind());
        }
        source = cause.source();
    }
    None
}

fn transport_error(err: reqwest::Error) -> StepError {
    let code = if let Some(status) = err.status() {
        status_code(status)
    } else if err.is_timeout() {
        "ERR_TIMEOUT"
    } else if err.is_decode() || err.is_body() {
        "ERR_BAD_RESPONSE"
    } else {
        io_kind(&err).map(io_error_code).unwrap_or("ERR_NETWORK")
    };

    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    StepError::transport(code, message, None)
}

fn serialize_body(body: &str) -> Option<String> {
    if body.is_empty() {
        return None;
    }
    match serde_json::from_str::<serde_json::Value>(body) {
        Ok(value) => Some(value.to_string()),
        Err(_) => serde_json::to_string(body).ok(),
    }
}
