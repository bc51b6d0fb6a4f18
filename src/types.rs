use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// `None` when PIPELINE_ID is absent or not an integer.
    pub pipeline_id: Option<i64>,
    pub pipeline_name: String,
    pub build_number: Option<i64>,
    pub work_space: String,
    pub project_dir: String,
    pub build_job_id: Option<i64>,
    pub sonar_host: String,
    pub sonar_token: String,
    pub sonar_project_key: String,
    pub check_redlines: Option<String>,
    pub request_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            pipeline_id: None,
            pipeline_name: String::new(),
            build_number: None,
            work_space: String::new(),
            project_dir: String::new(),
            build_job_id: None,
            sonar_host: String::new(),
            sonar_token: String::new(),
            sonar_project_key: String::new(),
            check_redlines: None,
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

/// Metric name to raw value, as reported by the Sonar server.
pub type MetricsSnapshot = HashMap<String, String>;

#[derive(Debug, Deserialize)]
pub struct SonarMeasure {
    pub metric: String,
    #[serde(default)]
    pub value: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct MeasuresResponse {
    pub measures: Vec<SonarMeasure>,
}

/// Error: red, Warning: orange, Default: grey.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RedlineStyle {
    Error,
    Warning,
    Default,
}

impl fmt::Display for RedlineStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RedlineStyle::Error => "Error",
            RedlineStyle::Warning => "Warning",
            RedlineStyle::Default => "Default",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RedlineResult {
    /// Must match the redline key declared by the pipeline step.
    pub key: String,
    pub title: String,
    pub value: f64,
    pub style: RedlineStyle,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RedlineInfo {
    pub title: String,
    #[serde(rename = "reportUrl")]
    pub report_url: String,
    #[serde(rename = "readlineResults")]
    pub redline_results: Vec<RedlineResult>,
}
