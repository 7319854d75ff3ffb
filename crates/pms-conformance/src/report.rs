//! # Run Report
//!
//! Every check produces one [`CheckResult`]. Failures carry the concrete
//! reason (offending field names, unexpected status, schema violations);
//! a check that could not run because an earlier step failed is skipped
//! with the diagnostic of that step, never silently dropped.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Outcome of a single check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "lowercase")]
pub enum Outcome {
    Passed,
    Failed(String),
    Skipped(String),
}

impl Outcome {
    /// `Passed` for `Ok`, `Failed` with the error text otherwise.
    pub fn from_result<E: fmt::Display>(result: Result<(), E>) -> Self {
        match result {
            Ok(()) => Outcome::Passed,
            Err(e) => Outcome::Failed(e.to_string()),
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Outcome::Failed(_))
    }
}

/// One executed (or skipped) check.
#[derive(Debug, Clone, Serialize)]
pub struct CheckResult {
    /// e.g. `as board on people`.
    pub suite: String,
    /// e.g. `should only contain viewable fields`.
    pub name: String,
    pub outcome: Outcome,
}

/// All results of one harness run.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub checks: Vec<CheckResult>,
}

impl Default for Report {
    fn default() -> Self {
        Self::new()
    }
}

impl Report {
    pub fn new() -> Self {
        Self {
            started_at: Utc::now(),
            finished_at: None,
            checks: Vec::new(),
        }
    }

    /// Append a result, logging it.
    pub fn record(&mut self, suite: &str, name: &str, outcome: Outcome) {
        match &outcome {
            Outcome::Passed => tracing::info!(suite, check = name, "passed"),
            Outcome::Failed(reason) => tracing::warn!(suite, check = name, %reason, "failed"),
            Outcome::Skipped(reason) => tracing::info!(suite, check = name, %reason, "skipped"),
        }
        self.checks.push(CheckResult {
            suite: suite.to_string(),
            name: name.to_string(),
            outcome,
        });
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    pub fn passed(&self) -> usize {
        self.count(|o| matches!(o, Outcome::Passed))
    }

    pub fn failed(&self) -> usize {
        self.count(Outcome::is_failed)
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, Outcome::Skipped(_)))
    }

    /// True when no check failed. Skipped checks do not fail a run on
    /// their own; the step that caused the skip has already failed.
    pub fn is_success(&self) -> bool {
        self.failed() == 0
    }

    /// Results of one suite, in execution order.
    pub fn suite<'a>(&'a self, suite: &'a str) -> impl Iterator<Item = &'a CheckResult> + 'a {
        self.checks.iter().filter(move |c| c.suite == suite)
    }

    /// Find a result by suite and check name.
    pub fn find(&self, suite: &str, name: &str) -> Option<&CheckResult> {
        self.checks.iter().find(|c| c.suite == suite && c.name == name)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    fn count(&self, pred: impl Fn(&Outcome) -> bool) -> usize {
        self.checks.iter().filter(|c| pred(&c.outcome)).count()
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut current_suite: Option<&str> = None;
        for check in &self.checks {
            if current_suite != Some(check.suite.as_str()) {
                writeln!(f, "{}", check.suite)?;
                current_suite = Some(check.suite.as_str());
            }
            match &check.outcome {
                Outcome::Passed => writeln!(f, "  ok    {}", check.name)?,
                Outcome::Skipped(reason) => writeln!(f, "  skip  {} ({reason})", check.name)?,
                Outcome::Failed(reason) => {
                    writeln!(f, "  FAIL  {}", check.name)?;
                    for line in reason.lines() {
                        writeln!(f, "          {line}")?;
                    }
                }
            }
        }
        write!(
            f,
            "\n{} passed, {} failed, {} skipped",
            self.passed(),
            self.failed(),
            self.skipped()
        )
    }
}
