//! # Run Subcommand
//!
//! `pms-conformance run --plan <file>` executes a test plan and prints the
//! report. Flags override the plan's deployment settings, which override
//! the `PMS_*` environment variables.

use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, ValueEnum};

use crate::plan::TestPlan;
use crate::report::Report;
use crate::runner::Runner;

/// Report output format.
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Arguments for the run subcommand.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Test plan (YAML).
    #[arg(long)]
    pub plan: PathBuf,

    /// Base URL of the deployment, overriding the plan.
    #[arg(long)]
    pub base_url: Option<String>,

    /// API root path, overriding the plan.
    #[arg(long)]
    pub api_root: Option<String>,

    /// Request timeout in seconds, overriding the plan.
    #[arg(long)]
    pub timeout_secs: Option<u64>,

    /// Swagger/OpenAPI document to validate responses against, overriding
    /// the plan.
    #[arg(long)]
    pub swagger: Option<PathBuf>,

    /// Report format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

impl RunArgs {
    /// Load the plan and apply command-line overrides.
    pub fn load_plan(&self) -> anyhow::Result<TestPlan> {
        let mut plan = TestPlan::load(&self.plan)?;
        if let Some(base_url) = &self.base_url {
            plan.base_url = Some(base_url.clone());
        }
        if let Some(api_root) = &self.api_root {
            plan.api_root = Some(api_root.clone());
        }
        if let Some(timeout_secs) = self.timeout_secs {
            plan.timeout_secs = Some(timeout_secs);
        }
        if let Some(swagger) = &self.swagger {
            plan.swagger = Some(swagger.clone());
        }
        Ok(plan)
    }
}

/// Run the plan and return the finished report.
pub async fn run(args: &RunArgs) -> anyhow::Result<Report> {
    let plan = args.load_plan()?;
    let runner = Runner::new(plan)
        .with_context(|| format!("cannot prepare run of {}", args.plan.display()))?;
    Ok(runner.run().await)
}

/// Render `report` in `format`.
pub fn render(report: &Report, format: OutputFormat) -> anyhow::Result<String> {
    match format {
        OutputFormat::Text => Ok(report.to_string()),
        OutputFormat::Json => report.to_json().context("cannot serialize report"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_plan(dir: &std::path::Path) -> PathBuf {
        let path = dir.join("plan.yaml");
        std::fs::File::create(&path)
            .unwrap()
            .write_all(
                b"base_url: http://localhost:1\nswagger: swagger.yaml\nunauthorized:\n  user: a@b.c\n  wrong_password: x\n",
            )
            .unwrap();
        path
    }

    #[test]
    fn overrides_replace_plan_settings() {
        let dir = tempfile::tempdir().unwrap();
        let args = RunArgs {
            plan: write_plan(dir.path()),
            base_url: Some("http://127.0.0.1:9999".into()),
            api_root: Some("/v2".into()),
            timeout_secs: Some(4),
            swagger: Some(PathBuf::from("/tmp/other.yaml")),
            format: OutputFormat::Json,
        };
        let plan = args.load_plan().unwrap();
        assert_eq!(plan.base_url.as_deref(), Some("http://127.0.0.1:9999"));
        assert_eq!(plan.api_root.as_deref(), Some("/v2"));
        assert_eq!(plan.timeout_secs, Some(4));
        assert_eq!(plan.swagger, Some(PathBuf::from("/tmp/other.yaml")));
    }

    #[test]
    fn plan_settings_kept_without_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let args = RunArgs {
            plan: write_plan(dir.path()),
            base_url: None,
            api_root: None,
            timeout_secs: None,
            swagger: None,
            format: OutputFormat::Text,
        };
        let plan = args.load_plan().unwrap();
        assert_eq!(plan.base_url.as_deref(), Some("http://localhost:1"));
        assert!(plan.api_root.is_none());
        assert_eq!(plan.swagger, Some(dir.path().join("swagger.yaml")));
    }

    #[test]
    fn render_formats() {
        let report = Report::new();
        assert!(render(&report, OutputFormat::Text)
            .unwrap()
            .contains("0 passed"));
        let json: serde_json::Value =
            serde_json::from_str(&render(&report, OutputFormat::Json).unwrap()).unwrap();
        assert!(json["checks"].as_array().unwrap().is_empty());
    }
}
