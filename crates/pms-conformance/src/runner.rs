//! # Runner
//!
//! Executes a [`TestPlan`]: one login suite per role, the resource checks
//! for each of the role's resources, then the unauthorized suite.

use pms_client::{ConfigError, PmsApiError, PmsClient};
use pms_core::Session;
use pms_schema::{ApiContract, SchemaValidationError};
use thiserror::Error;
use tracing::Instrument;

use crate::checks::CheckContext;
use crate::plan::{RolePlan, TestPlan};
use crate::report::{Outcome, Report};
use crate::{resource, unauthorized};

pub const CAN_LOGIN: &str = "can login";

/// Errors that prevent a run from starting. Once running, every problem
/// becomes a check result instead.
#[derive(Error, Debug)]
pub enum RunError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Client(#[from] PmsApiError),

    #[error(transparent)]
    Contract(#[from] SchemaValidationError),
}

/// A loaded plan with its client and optional API contract.
#[derive(Debug)]
pub struct Runner {
    plan: TestPlan,
    client: PmsClient,
    contract: Option<ApiContract>,
}

impl Runner {
    /// Build the client for the plan's deployment and load its Swagger
    /// document, if one is named.
    pub fn new(plan: TestPlan) -> Result<Self, RunError> {
        let client = PmsClient::new(plan.api_config()?)?;
        let contract = plan.swagger.as_deref().map(ApiContract::load).transpose()?;
        Ok(Self {
            plan,
            client,
            contract,
        })
    }

    /// Replace the contract loaded from the plan.
    pub fn with_contract(mut self, contract: Option<ApiContract>) -> Self {
        self.contract = contract;
        self
    }

    pub async fn run(&self) -> Report {
        let ctx = CheckContext {
            client: &self.client,
            contract: self.contract.as_ref(),
            id_fields: &self.plan.id_fields,
        };
        let mut report = Report::new();
        tracing::info!(
            base_url = %self.client.config().base_url,
            roles = self.plan.roles.len(),
            contract = self.contract.as_ref().map(ApiContract::source),
            "starting conformance run"
        );

        for role in &self.plan.roles {
            run_role(&ctx, role, &mut report)
                .instrument(tracing::info_span!("role", role = %role.name))
                .await;
        }

        if let Some(plan) = &self.plan.unauthorized {
            unauthorized::run(&ctx, plan, &mut report)
                .instrument(tracing::info_span!("unauthorized"))
                .await;
        }

        report.finish();
        tracing::info!(
            passed = report.passed(),
            failed = report.failed(),
            skipped = report.skipped(),
            "conformance run finished"
        );
        report
    }
}

/// Suite name of the resource checks for `resource` as `role`.
pub fn resource_suite(role: &str, resource: &str) -> String {
    format!("as {role} on {resource}")
}

async fn run_role(ctx: &CheckContext<'_>, role: &RolePlan, report: &mut Report) {
    let suite = format!("as {}", role.name);

    let login = login(ctx, role).await.and_then(|session| {
        let client = ctx.client.authorized(&session).map_err(|e| e.to_string())?;
        Ok((session, client))
    });

    let (session, client) = match login {
        Ok(logged_in) => {
            report.record(&suite, CAN_LOGIN, Outcome::Passed);
            logged_in
        }
        Err(reason) => {
            report.record(&suite, CAN_LOGIN, Outcome::Failed(reason.clone()));
            let skipped = format!("login as {} failed: {reason}", role.name);
            for resource in &role.resources {
                let suite = resource_suite(&role.name, resource);
                for check in [
                    resource::RETURN_RESOURCES,
                    resource::VIEWABLE_FIELDS,
                    resource::SINGLE_ITEM,
                    resource::EMPTY_CREATE,
                ] {
                    report.record(&suite, check, Outcome::Skipped(skipped.clone()));
                }
            }
            return;
        }
    };

    for resource_name in &role.resources {
        let suite = resource_suite(&role.name, resource_name);
        resource::run(ctx, &client, &session, &suite, resource_name, report)
            .instrument(tracing::info_span!("resource", resource = %resource_name))
            .await;
    }
}

async fn login(ctx: &CheckContext<'_>, role: &RolePlan) -> Result<Session, String> {
    let resp = ctx
        .client
        .login(&role.user, Some(role.password.as_str()))
        .await
        .map_err(|e| e.to_string())?;
    ctx.expect(&resp, 200, "POST", "/login")?;
    let endpoint = resp.endpoint.clone();
    resp.into_session().map_err(|e| format!("{endpoint}: {e}"))
}
