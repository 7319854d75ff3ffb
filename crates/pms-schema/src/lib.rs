//! # pms-schema: API Contract Validation
//!
//! Checks PMS API responses against the Swagger document describing the
//! API, the way the harness did with a Swagger-aware HTTP assertion layer.
//!
//! ## Runtime Validation (`validate`)
//!
//! - [`ApiContract::load`] reads a Swagger 2.0 or OpenAPI 3 document from
//!   YAML or JSON.
//! - [`ApiContract::validate_response`] finds the documented response for
//!   an operation and status code and validates the body against its
//!   schema. Local `$ref`s into `#/definitions` and `#/components` resolve
//!   in place; the document is never rewritten.
//!
//! ## Crate Policy
//!
//! - No network access: remote `$ref`s resolve to a permissive schema.
//! - Violations are structured: instance path, schema path, message.

pub mod validate;

pub use validate::{ApiContract, SchemaValidationError, ValidationViolations, Violation};
