use std::collections::HashMap;
use std::time::Duration;

use crate::parsing::parse_integer;
use crate::types::{Config, DEFAULT_TIMEOUT_SECS};

/// Trait for abstracting environment variable access
pub trait EnvironmentProvider {
    fn get_var(&self, key: &str) -> Option<String>;
}

/// Production implementation using std::env
pub struct SystemEnvironment;

impl EnvironmentProvider for SystemEnvironment {
    fn get_var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

/// Mock implementation for testing
#[derive(Debug, Default)]
pub struct MockEnvironment {
    vars: HashMap<String, String>,
}

impl MockEnvironment {
    pub fn new() -> Self {
        Self {
            vars: HashMap::new(),
        }
    }

    pub fn set_var<K, V>(&mut self, key: K, value: V) -> &mut Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.vars.insert(key.into(), value.into());
        self
    }

    pub fn with_var<K, V>(mut self, key: K, value: V) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.set_var(key, value);
        self
    }
}

impl EnvironmentProvider for MockEnvironment {
    fn get_var(&self, key: &str) -> Option<String> {
        self.vars.get(key).cloned()
    }
}

pub fn load_config() -> Config {
    load_config_with_env(&SystemEnvironment)
}

/// Never fails: bad numbers become `None` and missing strings become empty.
/// Required-field checks happen in the step runner.
pub fn load_config_with_env<E: EnvironmentProvider>(env: &E) -> Config {
    let integer = |key: &str| parse_integer(env.get_var(key).as_deref());
    let string = |key: &str| env.get_var(key).unwrap_or_default();

    let request_timeout = env
        .get_var("STEP_SONAR_TIMEOUT_SECS")
        .and_then(|v| v.trim().parse::<u64>().ok())
        .filter(|secs| *secs > 0)
        .unwrap_or(DEFAULT_TIMEOUT_SECS);

    Config {
        pipeline_id: integer("PIPELINE_ID"),
        pipeline_name: string("PIPELINE_NAME"),
        build_number: integer("BUILD_NUMBER"),
        work_space: string("WORK_SPACE"),
        project_dir: string("PROJECT_DIR"),
        build_job_id: integer("BUILD_JOB_ID"),
        sonar_host: string("STEP_SONAR_HOST"),
        sonar_token: string("STEP_SONAR_TOKEN"),
        sonar_project_key: string("STEP_SONAR_PROJECT_KEY"),
        check_redlines: env.get_var("CHECK_REDLINES"),
        request_timeout: Duration::from_secs(request_timeout),
    }
}
