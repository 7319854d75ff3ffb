//! # Test Plan
//!
//! What the harness runs, loaded from YAML:
//!
//! ```yaml
//! base_url: http://pms.zaphod
//! api_root: /api
//! timeout_secs: 30
//! swagger: swagger.yaml
//! id_fields:
//!   people: id
//! roles:
//!   - name: board
//!     user: sammy@example.com
//!     password: "1234"
//!     resources: [people, roles]
//! unauthorized:
//!   user: wikkert@example.com
//!   wrong_password: "1234s"
//!   protected_resources: [people, roles, fields]
//! ```
//!
//! Passwords are zeroized on drop and redacted from `Debug` output.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::{Path, PathBuf};

use pms_client::{ConfigError, PmsApiConfig};
use serde::{Deserialize, Deserializer};
use thiserror::Error;
use zeroize::Zeroizing;

/// Errors loading or validating a test plan.
#[derive(Error, Debug)]
pub enum PlanError {
    #[error("cannot read plan '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("invalid plan '{path}': {reason}")]
    Parse { path: String, reason: String },

    #[error("invalid plan: {0}")]
    Invalid(String),
}

/// The full set of checks to run against one deployment.
#[derive(Debug, Clone, Deserialize)]
pub struct TestPlan {
    /// Deployment settings. Unset fields fall back to `PMS_BASE_URL`,
    /// `PMS_API_ROOT` and `PMS_TIMEOUT_SECS`, then to the client defaults.
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub api_root: Option<String>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    /// Swagger document responses are validated against, if any.
    #[serde(default)]
    pub swagger: Option<PathBuf>,
    /// Identifier attribute per resource for ownership decisions.
    /// Resources not listed use `id`.
    #[serde(default)]
    pub id_fields: BTreeMap<String, String>,
    #[serde(default)]
    pub roles: Vec<RolePlan>,
    #[serde(default)]
    pub unauthorized: Option<UnauthorizedPlan>,
}

/// A caller role: credentials and the resources to check as that role.
#[derive(Clone, Deserialize)]
pub struct RolePlan {
    pub name: String,
    pub user: String,
    #[serde(deserialize_with = "secret")]
    pub password: Zeroizing<String>,
    #[serde(default)]
    pub resources: Vec<String>,
}

impl fmt::Debug for RolePlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RolePlan")
            .field("name", &self.name)
            .field("user", &self.user)
            .field("password", &"[REDACTED]")
            .field("resources", &self.resources)
            .finish()
    }
}

/// Checks run without a session.
#[derive(Clone, Deserialize)]
pub struct UnauthorizedPlan {
    /// An existing user, logged in with a wrong and a null password.
    pub user: String,
    #[serde(deserialize_with = "secret")]
    pub wrong_password: Zeroizing<String>,
    /// Resources that must reject requests without a token.
    #[serde(default)]
    pub protected_resources: Vec<String>,
}

impl fmt::Debug for UnauthorizedPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnauthorizedPlan")
            .field("user", &self.user)
            .field("wrong_password", &"[REDACTED]")
            .field("protected_resources", &self.protected_resources)
            .finish()
    }
}

fn secret<'de, D>(deserializer: D) -> Result<Zeroizing<String>, D::Error>
where
    D: Deserializer<'de>,
{
    String::deserialize(deserializer).map(Zeroizing::new)
}

impl TestPlan {
    /// Load and validate a plan from a YAML file.
    ///
    /// A relative `swagger` path is resolved against the plan's directory.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, PlanError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| PlanError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let mut plan = Self::from_yaml(&content).map_err(|e| match e {
            PlanError::Parse { reason, .. } => PlanError::Parse {
                path: path.display().to_string(),
                reason,
            },
            other => other,
        })?;

        if let (Some(swagger), Some(dir)) = (&plan.swagger, path.parent()) {
            if swagger.is_relative() {
                plan.swagger = Some(dir.join(swagger));
            }
        }
        Ok(plan)
    }

    /// Parse and validate a plan from YAML text.
    pub fn from_yaml(content: &str) -> Result<Self, PlanError> {
        let plan: TestPlan = serde_yaml::from_str(content).map_err(|e| PlanError::Parse {
            path: "<inline>".to_string(),
            reason: e.to_string(),
        })?;
        plan.validate()?;
        Ok(plan)
    }

    /// Reject plans whose reports would be ambiguous.
    pub fn validate(&self) -> Result<(), PlanError> {
        let mut names = BTreeSet::new();
        for role in &self.roles {
            if role.name.trim().is_empty() {
                return Err(PlanError::Invalid("role with empty name".into()));
            }
            if !names.insert(role.name.as_str()) {
                return Err(PlanError::Invalid(format!("duplicate role '{}'", role.name)));
            }
            if role.user.trim().is_empty() {
                return Err(PlanError::Invalid(format!("role '{}' has no user", role.name)));
            }
        }
        if self.roles.is_empty() && self.unauthorized.is_none() {
            return Err(PlanError::Invalid("plan defines no checks".into()));
        }
        Ok(())
    }

    /// Client configuration for this plan's deployment: the environment,
    /// overridden by the plan.
    pub fn api_config(&self) -> Result<PmsApiConfig, ConfigError> {
        self.apply_to(PmsApiConfig::from_env()?)
    }

    /// Override `config` with the settings this plan names.
    pub fn apply_to(&self, mut config: PmsApiConfig) -> Result<PmsApiConfig, ConfigError> {
        if let Some(base_url) = &self.base_url {
            config.base_url = PmsApiConfig::new(base_url)?.base_url;
        }
        if let Some(api_root) = &self.api_root {
            config.api_root = api_root.clone();
        }
        if let Some(timeout_secs) = self.timeout_secs {
            config.timeout_secs = timeout_secs;
        }
        Ok(config)
    }
}
