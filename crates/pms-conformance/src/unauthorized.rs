//! # Unauthorized Checks
//!
//! Requests without a session must be rejected:
//!
//! - login with a wrong password → 400 (contract-validated);
//! - login with a `null` password → 400;
//! - each protected resource without a token → 400 with
//!   `No Authorization header found`.

use pms_core::contract::{NO_AUTHORIZATION_HEADER, REJECTED_STATUS};

use crate::checks::{expect_error, CheckContext};
use crate::plan::UnauthorizedPlan;
use crate::report::{Outcome, Report};

pub const SUITE: &str = "unauthorized";
pub const WRONG_PASSWORD: &str = "can not login.";
pub const NULL_PASSWORD: &str = "can not login with null password";

/// Name of the protected-resource check for `resource`.
pub fn protected_check_name(resource: &str) -> String {
    format!("should not get {resource} without authorization.")
}

pub async fn run(ctx: &CheckContext<'_>, plan: &UnauthorizedPlan, report: &mut Report) {
    let client = ctx.client;

    let result = match client.login(&plan.user, Some(plan.wrong_password.as_str())).await {
        Ok(resp) => ctx.expect(&resp, REJECTED_STATUS, "POST", "/login"),
        Err(e) => Err(e.to_string()),
    };
    report.record(SUITE, WRONG_PASSWORD, Outcome::from_result(result));

    let result = match client.login(&plan.user, None).await {
        Ok(resp) => ctx.expect_status(&resp, REJECTED_STATUS),
        Err(e) => Err(e.to_string()),
    };
    report.record(SUITE, NULL_PASSWORD, Outcome::from_result(result));

    for resource in &plan.protected_resources {
        let result = match client.list(resource).await {
            Ok(resp) => ctx
                .expect(&resp, REJECTED_STATUS, "GET", &format!("/{resource}"))
                .and_then(|()| expect_error(&resp, NO_AUTHORIZATION_HEADER)),
            Err(e) => Err(e.to_string()),
        };
        report.record(SUITE, &protected_check_name(resource), Outcome::from_result(result));
    }
}
