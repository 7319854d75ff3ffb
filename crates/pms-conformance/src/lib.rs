//! # pms-conformance: PMS API Conformance Harness
//!
//! Logs in as each role of a [`plan::TestPlan`], fetches the role's
//! resources and checks every returned item against the role's permission
//! declaration. Rejection behavior (empty creates, missing or wrong
//! credentials) and, when a Swagger document is given, the shape of every
//! response are checked as well.
//!
//! ## Suites
//!
//! - `as {role}`: login.
//! - `as {role} on {resource}`: collection, field visibility, single item,
//!   empty create. See [`resource`].
//! - `unauthorized`: see [`unauthorized`].
//!
//! Results are collected into a [`report::Report`]; a check that cannot
//! run because an earlier step failed is reported as skipped.

pub mod checks;
pub mod cli;
pub mod plan;
pub mod report;
pub mod resource;
pub mod runner;
pub mod unauthorized;

pub use plan::{PlanError, TestPlan};
pub use report::{CheckResult, Outcome, Report};
pub use runner::{RunError, Runner};
