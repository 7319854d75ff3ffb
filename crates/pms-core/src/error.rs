//! # Error Types
//!
//! All errors use `thiserror` for derive-based `Display` and `Error`
//! implementations.
//!
//! ## Design
//!
//! - Token errors are fatal to a session: without an identity no ownership
//!   decision can be made.
//! - Item errors are local to one item. A collection with one malformed
//!   item still has every other item checked.
//! - A resource without declared permissions is not an error at all; it
//!   surfaces as a [`FieldViolation`](crate::FieldViolation) naming every
//!   field of the item.

use thiserror::Error;

/// Top-level error type for the PMS conformance core.
#[derive(Error, Debug)]
pub enum PmsError {
    /// The session token does not carry a usable identity.
    #[error("malformed token: {0}")]
    MalformedToken(#[from] MalformedTokenError),

    /// An item returned by the API is not a key/value record.
    #[error("invalid item: {0}")]
    InvalidItem(#[from] InvalidItemError),

    /// The login response body does not have the expected shape.
    #[error("invalid login response: {0}")]
    InvalidLoginResponse(String),
}

/// The identity claim could not be read from a token.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MalformedTokenError {
    /// Splitting on `.` did not yield a payload segment.
    #[error("token has {segments} segment(s), expected at least two")]
    MissingPayload {
        /// Number of `.`-separated segments found.
        segments: usize,
    },

    /// The payload segment is not base64.
    #[error("payload segment is not valid base64: {0}")]
    Base64(String),

    /// The decoded payload is not JSON.
    #[error("payload is not valid JSON: {0}")]
    Json(String),

    /// The decoded payload is JSON, but not an object.
    #[error("payload is not a JSON object")]
    NotAnObject,

    /// The payload object has no (non-null) `user` claim.
    #[error("payload has no `user` claim")]
    MissingUser,
}

/// An item of a fetched collection is not a record of key/value pairs.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("item {item} of '{resource}' is not a record (found {found})")]
pub struct InvalidItemError {
    /// Resource the item was fetched from.
    pub resource: String,
    /// Label of the offending item (collection key or `?`).
    pub item: String,
    /// JSON type that was found instead of an object.
    pub found: &'static str,
}
