use std::future::Future;
use std::io;

use tracing::{debug, info};

use crate::error::StepError;
use crate::parsing::{display_integer, parse_number};
use crate::redline::RedlineChecker;
use crate::sonar::MetricsSource;
use crate::types::{Config, MetricsSnapshot, RedlineInfo, RedlineResult, RedlineStyle};

pub const REPORT_TITLE: &str = "Redline Sonar";

/// Logs every configuration field and rejects a run with no Sonar target.
pub fn log_and_validate(cfg: &Config) -> Result<(), StepError> {
    info!("PIPELINE_ID={}", display_integer(cfg.pipeline_id));
    info!("PIPELINE_NAME={}", cfg.pipeline_name);
    info!("BUILD_NUMBER={}", display_integer(cfg.build_number));
    info!("WORK_SPACE={}", cfg.work_space);
    info!("PROJECT_DIR={}", cfg.project_dir);
    info!("BUILD_JOB_ID={}", display_integer(cfg.build_job_id));
    info!("SONAR_HOST={}", cfg.sonar_host);
    info!("SONAR_PROJECT_KEY={}", cfg.sonar_project_key);

    if cfg.sonar_host.is_empty() || cfg.sonar_project_key.is_empty() {
        return Err(StepError::Config(
            "sonarHost or sonarProjectKey is empty".to_string(),
        ));
    }
    debug!("SONAR_TOKEN={}", cfg.sonar_token);
    Ok(())
}

fn redline_result(key: &str, title: &str, value: f64, style: RedlineStyle) -> RedlineResult {
    RedlineResult {
        key: key.to_string(),
        title: title.to_string(),
        value,
        style,
    }
}

/// Always four results, always in this order. Unparsable or missing
/// metrics come through as NaN.
pub fn build_redline_results(metrics: &MetricsSnapshot) -> Vec<RedlineResult> {
    let value = |metric: &str| parse_number(metrics.get(metric).map(String::as_str));

    vec![
        redline_result("Bugs", "缺陷", value("bugs"), RedlineStyle::Error),
        redline_result("Vulnerabilities", "漏洞", value("vulnerabilities"), RedlineStyle::Error),
        redline_result("Smells", "坏味道", value("code_smells"), RedlineStyle::Error),
        redline_result("Coverage", "覆盖率", value("coverage"), RedlineStyle::Warning),
    ]
}

pub fn report_url(cfg: &Config) -> String {
    format!("{}/component_measures?id={}", cfg.sonar_host, cfg.sonar_project_key)
}

pub fn build_redline_info(cfg: &Config, redline_results: Vec<RedlineResult>) -> RedlineInfo {
    RedlineInfo {
        title: REPORT_TITLE.to_string(),
        report_url: report_url(cfg),
        redline_results,
    }
}

pub struct StepRunner<'a, S, R> {
    config: &'a Config,
    source: &'a S,
    checker: &'a R,
}

impl<'a, S, R> StepRunner<'a, S, R>
where
    S: MetricsSource,
    R: RedlineChecker,
{
    pub fn new(config: &'a Config, source: &'a S, checker: &'a R) -> Self {
        Self {
            config,
            source,
            checker,
        }
    }

    /// Runs the step once. Returns the report that was handed to the checker.
    pub async fn run(&self) -> Result<RedlineInfo, StepError> {
        log_and_validate(self.config)?;

        let metrics = self
            .source
            .fetch_measures(&self.config.sonar_project_key)
            .await?;
        info!(
            "Sonar Metrics: {}",
            serde_json::to_string(&metrics).unwrap_or_default()
        );

        let results = build_redline_results(&metrics);
        let redline_info = build_redline_info(self.config, results);
        self.checker
            .redline_check(&redline_info, self.config.check_redlines.as_deref())?;
        Ok(redline_info)
    }

    /// Like [`run`](Self::run), but gives up once `cancel` resolves with `Ok`.
    /// A `cancel` that fails (e.g. no signal handler) never interrupts the run.
    pub async fn run_until_cancelled<C>(&self, cancel: C) -> Result<RedlineInfo, StepError>
    where
        C: Future<Output = io::Result<()>>,
    {
        tokio::select! {
            res = self.run() => res,
            Ok(()) = cancel => Err(StepError::Cancelled),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::cell::RefCell;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct StubSource {
        metrics: MetricsSnapshot,
        calls: AtomicUsize,
    }

    impl StubSource {
        fn new(pairs: &[(&str, &str)]) -> Self {
            Self {
                metrics: pairs
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl MetricsSource for StubSource {
        async fn fetch_measures(&self, _project_key: &str) -> Result<MetricsSnapshot, StepError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.metrics.clone())
        }
    }

    #[derive(Default)]
    struct RecordingChecker {
        seen: RefCell<Vec<(RedlineInfo, Option<String>)>>,
        reject: bool,
    }

    impl RedlineChecker for RecordingChecker {
        fn redline_check(&self, info: &RedlineInfo, check_redlines: Option<&str>) -> Result<(), StepError> {
            self.seen
                .borrow_mut()
                .push((info.clone(), check_redlines.map(str::to_string)));
            if self.reject {
                Err(StepError::Redline("Bugs=3 violates Bugs<=0".to_string()))
            } else {
                Ok(())
            }
        }
    }

    fn config() -> Config {
        Config {
            sonar_host: "https://sonar.example.com".to_string(),
            sonar_project_key: "demo".to_string(),
            check_redlines: Some("Bugs<=0".to_string()),
            ..Config::default()
        }
    }

    #[test]
    fn test_validation_rejects_empty_target() {
        let mut cfg = config();
        cfg.sonar_host.clear();
        let err = log_and_validate(&cfg).unwrap_err();
        assert_eq!(err.to_string(), "sonarHost or sonarProjectKey is empty");

        let mut cfg = config();
        cfg.sonar_project_key.clear();
        assert!(log_and_validate(&cfg).is_err());

        assert!(log_and_validate(&config()).is_ok());
    }

    #[test]
    fn test_build_redline_results_order_and_style() {
        let metrics: MetricsSnapshot = [
            ("bugs", "3"),
            ("vulnerabilities", "1"),
            ("code_smells", "10"),
            ("coverage", "82.5"),
        ]
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        let results = build_redline_results(&metrics);
        let summary: Vec<(&str, f64, RedlineStyle)> = results
            .iter()
            .map(|r| (r.key.as_str(), r.value, r.style))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("Bugs", 3.0, RedlineStyle::Error),
                ("Vulnerabilities", 1.0, RedlineStyle::Error),
                ("Smells", 10.0, RedlineStyle::Error),
                ("Coverage", 82.5, RedlineStyle::Warning),
            ]
        );
    }

    #[test]
    fn test_missing_metrics_become_nan() {
        let results = build_redline_results(&MetricsSnapshot::new());
        assert_eq!(results.len(), 4);
        assert!(results.iter().all(|r| r.value.is_nan()));
    }

    #[test]
    fn test_report_url_is_plain_interpolation() {
        let mut cfg = config();
        cfg.sonar_project_key = "org:my project".to_string();
        assert_eq!(
            report_url(&cfg),
            "https://sonar.example.com/component_measures?id=org:my project"
        );
    }

    #[test]
    fn test_run_passes_report_and_flag_to_checker() {
        let cfg = config();
        let source = StubSource::new(&[("bugs", "0"), ("coverage", "90")]);
        let checker = RecordingChecker::default();

        let info = tokio_test::block_on(StepRunner::new(&cfg, &source, &checker).run()).unwrap();

        assert_eq!(info.title, "Redline Sonar");
        assert_eq!(info.report_url, "https://sonar.example.com/component_measures?id=demo");
        let seen = checker.seen.borrow();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].0.report_url, info.report_url);
        assert_eq!(seen[0].0.redline_results.len(), 4);
        assert_eq!(seen[0].0.redline_results[0].value, 0.0);
        assert!(seen[0].0.redline_results[1].value.is_nan());
        assert_eq!(seen[0].0.redline_results[3].value, 90.0);
        assert_eq!(seen[0].1.as_deref(), Some("Bugs<=0"));
    }

    #[test]
    fn test_run_fails_fast_without_network_call() {
        let mut cfg = config();
        cfg.sonar_project_key.clear();
        let source = StubSource::new(&[]);
        let checker = RecordingChecker::default();

        let err = tokio_test::block_on(StepRunner::new(&cfg, &source, &checker).run()).unwrap_err();

        assert!(err.to_string().contains("sonarHost or sonarProjectKey is empty"));
        assert_eq!(source.calls.load(Ordering::SeqCst), 0);
        assert!(checker.seen.borrow().is_empty());
    }

    struct HangingSource;

    #[async_trait]
    impl MetricsSource for HangingSource {
        async fn fetch_measures(&self, _project_key: &str) -> Result<MetricsSnapshot, StepError> {
            std::future::pending().await
        }
    }

    #[test]
    fn test_cancel_interrupts_pending_fetch() {
        let cfg = config();
        let checker = RecordingChecker::default();

        let err = tokio_test::block_on(
            StepRunner::new(&cfg, &HangingSource, &checker).run_until_cancelled(async { Ok::<(), io::Error>(()) }),
        )
        .unwrap_err();

        assert!(matches!(err, StepError::Cancelled));
        assert!(checker.seen.borrow().is_empty());
    }

    #[test]
    fn test_failed_cancel_source_does_not_cancel() {
        let cfg = config();
        let source = StubSource::new(&[("bugs", "0")]);
        let checker = RecordingChecker::default();

        let cancel = async { Err::<(), _>(io::Error::new(io::ErrorKind::Other, "no signal handler")) };
        let info = tokio_test::block_on(
            StepRunner::new(&cfg, &source, &checker).run_until_cancelled(cancel),
        )
        .unwrap();

        assert_eq!(info.redline_results.len(), 4);
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_checker_failure_propagates() {
        let cfg = config();
        let source = StubSource::new(&[("bugs", "3")]);
        let checker = RecordingChecker {
            reject: true,
            ..RecordingChecker::default()
        };

        let err = tokio_test::block_on(StepRunner::new(&cfg, &source, &checker).run()).unwrap_err();
        assert!(matches!(err, StepError::Redline(_)));
    }
}
