//! # pms-core: Permission Verification for the PMS API
//!
//! The logic of the conformance harness that is worth more than glue:
//! deciding which fields of an API item a caller may see, and who the
//! caller is.
//!
//! ## Components
//!
//! 1. **Token identity** ([`identity`]). Reads the `user` claim from the
//!    payload segment of the session token. The signature is not checked;
//!    the identity only decides ownership.
//!
//! 2. **Permission declarations** ([`permission`]). Per-resource `view`,
//!    `self.view` and `create` rules returned at login.
//!
//! 3. **Field visibility** ([`visibility`]). Per item, the allowed field
//!    set and the fields exposed beyond it.
//!
//! 4. **HTTP contract** ([`contract`]). Error messages the API returns for
//!    rejected requests.
//!
//! ## Crate Policy
//!
//! - No I/O. Everything here is a pure function of its inputs.
//! - No shared mutable state: sessions are passed explicitly.
//! - No `.unwrap()` outside tests.

pub mod contract;
pub mod error;
pub mod identity;
pub mod permission;
pub mod session;
pub mod visibility;

pub use error::{InvalidItemError, MalformedTokenError, PmsError};
pub use identity::{derive_identity, Identity};
pub use permission::{OwnPermissions, PermissionDeclaration, PermissionRecord};
pub use session::{LoginResponse, Session};
pub use visibility::{
    allowed_fields, ownership_of, violations, FieldViolation, Ownership, PermissionDiffer,
    DEFAULT_ID_FIELD,
};
