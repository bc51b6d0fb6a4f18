// Public modules
pub mod types;
pub mod config;
pub mod parsing;
pub mod error;
pub mod sonar;
pub mod redline;
pub mod step;

// Re-export commonly used items
pub use types::*;
pub use config::{load_config, load_config_with_env, EnvironmentProvider, SystemEnvironment, MockEnvironment};
pub use parsing::{parse_number, parse_integer};
pub use error::StepError;
pub use sonar::{MetricsSource, SonarClient, METRIC_KEYS};
pub use redline::{RedlineChecker, RuleRedlineChecker, parse_rules};
pub use step::{StepRunner, build_redline_results, build_redline_info, log_and_validate, report_url};
