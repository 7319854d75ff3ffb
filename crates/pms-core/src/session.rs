//! # Session
//!
//! An authenticated caller: the token to send, the permissions the API
//! declared at login, and the identity read from the token. All three are
//! fixed at login and passed explicitly to every check.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{MalformedTokenError, PmsError};
use crate::identity::{derive_identity, Identity};
use crate::permission::PermissionDeclaration;
use crate::visibility::PermissionDiffer;

/// Body of a successful `POST /login`.
#[derive(Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    #[serde(default)]
    pub permissions: PermissionDeclaration,
}

impl fmt::Debug for LoginResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginResponse")
            .field("token", &"[REDACTED]")
            .field("permissions", &self.permissions)
            .finish()
    }
}

/// Authenticated caller state.
///
/// Custom `Debug` implementation redacts the token.
#[derive(Clone)]
pub struct Session {
    token: String,
    permissions: PermissionDeclaration,
    identity: Identity,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("token", &"[REDACTED]")
            .field("permissions", &self.permissions)
            .field("identity", &self.identity)
            .finish()
    }
}

impl Session {
    /// Build a session from a login response, deriving the identity.
    ///
    /// # Errors
    ///
    /// Returns [`MalformedTokenError`] when the token carries no identity.
    /// The session is unusable in that case.
    pub fn from_login(login: LoginResponse) -> Result<Self, MalformedTokenError> {
        let identity = derive_identity(&login.token)?;
        tracing::info!(
            %identity,
            resources = login.permissions.len(),
            "session established"
        );
        Ok(Self {
            token: login.token,
            permissions: login.permissions,
            identity,
        })
    }

    /// Parse a raw login response body and build a session from it.
    ///
    /// # Errors
    ///
    /// Returns [`PmsError::InvalidLoginResponse`] when the body lacks a
    /// string `token` or has malformed `permissions`, and
    /// [`PmsError::MalformedToken`] when the token carries no identity.
    pub fn from_login_body(body: &Value) -> Result<Self, PmsError> {
        let login: LoginResponse = serde_json::from_value(body.clone())
            .map_err(|e| PmsError::InvalidLoginResponse(e.to_string()))?;
        Ok(Self::from_login(login)?)
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn permissions(&self) -> &PermissionDeclaration {
        &self.permissions
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    /// Field-visibility checker bound to this session.
    pub fn differ(&self) -> PermissionDiffer<'_> {
        PermissionDiffer::new(&self.permissions, Some(&self.identity))
    }
}
