//! Redline enforcement.
//!
//! The step only builds the report; evaluation is behind [`RedlineChecker`].
//! [`RuleRedlineChecker`] is the implementation wired into the binary: it
//! reads rules such as `Bugs<=0,Coverage>=80` from the strictness flag.

use std::fmt;

use tracing::{info, warn};

use crate::error::StepError;
use crate::types::{RedlineInfo, RedlineResult, RedlineStyle};

pub trait RedlineChecker {
    fn redline_check(&self, info: &RedlineInfo, check_redlines: Option<&str>) -> Result<(), StepError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Le,
    Lt,
    Ge,
    Gt,
    Eq,
}

impl Comparison {
    fn holds(self, value: f64, limit: f64) -> bool {
        match self {
            Comparison::Le => value <= limit,
            Comparison::Lt => value < limit,
            Comparison::Ge => value >= limit,
            Comparison::Gt => value > limit,
            Comparison::Eq => value == limit,
        }
    }

    fn symbol(self) -> &'static str {
        match self {
            Comparison::Le => "<=",
            Comparison::Lt => "<",
            Comparison::Ge => ">=",
            Comparison::Gt => ">",
            Comparison::Eq => "==",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RedlineRule {
    pub key: String,
    pub comparison: Comparison,
    pub limit: f64,
}

impl fmt::Display for RedlineRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.key, self.comparison.symbol(), self.limit)
    }
}

impl RedlineRule {
    /// NaN never satisfies a rule.
    pub fn passes(&self, value: f64) -> bool {
        self.comparison.holds(value, self.limit)
    }
}

const OPERATORS: &[(&str, Comparison)] = &[
    ("<=", Comparison::Le),
    (">=", Comparison::Ge),
    ("==", Comparison::Eq),
    ("<", Comparison::Lt),
    (">", Comparison::Gt),
];

pub fn parse_rules(spec: &str) -> Result<Vec<RedlineRule>, StepError> {
    let mut rules = Vec::new();
    for raw in spec.split(',') {
        let raw = raw.trim();
        if raw.is_empty() {
            continue;
        }
        // leftmost operator wins; on a tie the longer one, so "<=" is not read as "<"
        let (pos, op, comparison) = OPERATORS
            .iter()
            .filter_map(|(op, cmp)| raw.find(op).map(|pos| (pos, *op, *cmp)))
            .min_by_key(|(pos, op, _)| (*pos, usize::MAX - op.len()))
            .ok_or_else(|| StepError::InvalidRule(raw.to_string()))?;

        let key = raw[..pos].trim();
        let limit = raw[pos + op.len()..].trim();
        if key.is_empty() {
            return Err(StepError::InvalidRule(raw.to_string()));
        }
        let limit: f64 = limit
            .parse()
            .ok()
            .filter(|v: &f64| v.is_finite())
            .ok_or_else(|| StepError::InvalidRule(raw.to_string()))?;

        rules.push(RedlineRule {
            key: key.to_string(),
            comparison,
            limit,
        });
    }
    Ok(rules)
}

#[derive(Debug, Default, Clone, Copy)]
pub struct RuleRedlineChecker;

impl RuleRedlineChecker {
    pub fn new() -> Self {
        Self
    }

    fn report(&self, info: &RedlineInfo) {
        let json = serde_json::to_string(info).unwrap_or_default();
        info!(title = %info.title, report_url = %info.report_url, "redline report: {}", json);
        for r in &info.redline_results {
            info!("{} ({}) = {} [{}]", r.key, r.title, r.value, r.style);
        }
    }
}

impl RedlineChecker for RuleRedlineChecker {
    fn redline_check(&self, info: &RedlineInfo, check_redlines: Option<&str>) -> Result<(), StepError> {
        self.report(info);

        let spec = match check_redlines.map(str::trim) {
            Some(s) if !s.is_empty() => s,
            _ => {
                info!("CHECK_REDLINES not set, redlines are reported but not enforced");
                return Ok(());
            }
        };

        let rules = parse_rules(spec)?;
        let mut blocking: Vec<String> = Vec::new();

        for rule in &rules {
            let Some(result) = find_result(&info.redline_results, &rule.key) else {
                warn!("redline rule {} does not match any result", rule);
                continue;
            };
            if rule.passes(result.value) {
                continue;
            }
            match result.style {
                RedlineStyle::Error => {
                    blocking.push(format!("{}={} violates {}", result.key, result.value, rule));
                }
                RedlineStyle::Warning | RedlineStyle::Default => {
                    warn!("{}={} violates {}", result.key, result.value, rule);
                }
            }
        }

        if blocking.is_empty() {
            info!("all redlines passed");
            Ok(())
        } else {
            Err(StepError::Redline(blocking.join("; ")))
        }
    }
}

fn find_result<'a>(results: &'a [RedlineResult], key: &str) -> Option<&'a RedlineResult> {
    results.iter().find(|r| r.key == key)
}
