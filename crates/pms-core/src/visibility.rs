//! # Field Visibility
//!
//! Decides, per item, which fields a caller may see and reports the fields
//! an API response exposes beyond that.
//!
//! ## Rules
//!
//! - Undeclared resource: no field is allowed.
//! - Other caller's item: the resource's `view` fields.
//! - Own item: `view` plus `self.view`. Ownership only ever adds fields.
//!
//! ## Invariant
//!
//! The allowed set is computed independently for every item. Items of one
//! collection can have different owners, so a single allowed set must never
//! be applied to a whole collection.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::InvalidItemError;
use crate::identity::{normalized_id, Identity};
use crate::permission::PermissionDeclaration;

/// Attribute compared against the caller identity unless a resource
/// overrides it.
pub const DEFAULT_ID_FIELD: &str = "id";

/// How an item relates to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Ownership {
    Own,
    Other,
}

impl Ownership {
    pub fn is_own(self) -> bool {
        matches!(self, Ownership::Own)
    }
}

impl From<bool> for Ownership {
    fn from(is_own: bool) -> Self {
        if is_own {
            Ownership::Own
        } else {
            Ownership::Other
        }
    }
}

impl fmt::Display for Ownership {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ownership::Own => f.write_str("own"),
            Ownership::Other => f.write_str("other"),
        }
    }
}

/// Result of checking one item: the fields it exposes without permission.
///
/// An empty `unexpected` set means the item passes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldViolation {
    pub resource: String,
    /// Collection key of the item, or its identifier attribute.
    pub item: String,
    pub ownership: Ownership,
    pub unexpected: BTreeSet<String>,
}

impl FieldViolation {
    pub fn is_empty(&self) -> bool {
        self.unexpected.is_empty()
    }
}

impl fmt::Display for FieldViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fields: Vec<&str> = self.unexpected.iter().map(String::as_str).collect();
        write!(
            f,
            "{} item {} ({}) exposes unexpected fields: [{}]",
            self.resource,
            self.item,
            self.ownership,
            fields.join(", ")
        )
    }
}

/// Fields visible on an item of `resource`.
pub fn allowed_fields(
    declaration: &PermissionDeclaration,
    resource: &str,
    is_own: bool,
) -> BTreeSet<String> {
    let Some(record) = declaration.get(resource) else {
        return BTreeSet::new();
    };

    let mut allowed: BTreeSet<String> = record.view.iter().cloned().collect();
    if is_own {
        allowed.extend(record.own_view().iter().cloned());
    }
    allowed
}

/// Whether `item` belongs to `identity`, judged by its `id_field`.
///
/// Non-record items and items without the attribute are never owned.
pub fn ownership_of(item: &Value, id_field: &str, identity: &Identity) -> bool {
    item.get(id_field).is_some_and(|id| identity.matches(id))
}

/// Fields of `item` outside its allowed set, using the default identifier
/// attribute.
///
/// # Errors
///
/// Returns [`InvalidItemError`] when `item` is not a JSON object.
pub fn violations(
    declaration: &PermissionDeclaration,
    resource: &str,
    item: &Value,
    identity: &Identity,
) -> Result<BTreeSet<String>, InvalidItemError> {
    PermissionDiffer::new(declaration, Some(identity))
        .check_item(resource, None, item)
        .map(|v| v.unexpected)
}

/// Checks fetched items against one session's permission declaration.
///
/// Borrows the declaration and identity; both are immutable for the
/// session, so a differ is cheap to build per check and safe to share.
/// Without an identity every item is evaluated as someone else's.
#[derive(Debug, Clone)]
pub struct PermissionDiffer<'a> {
    declaration: &'a PermissionDeclaration,
    identity: Option<&'a Identity>,
    id_fields: BTreeMap<String, String>,
}

impl<'a> PermissionDiffer<'a> {
    pub fn new(declaration: &'a PermissionDeclaration, identity: Option<&'a Identity>) -> Self {
        Self {
            declaration,
            identity,
            id_fields: BTreeMap::new(),
        }
    }

    /// Compare `field` instead of `id` when deciding ownership on `resource`.
    pub fn with_id_field(mut self, resource: impl Into<String>, field: impl Into<String>) -> Self {
        self.id_fields.insert(resource.into(), field.into());
        self
    }

    /// Apply several identifier overrides at once.
    pub fn with_id_fields<'m>(
        mut self,
        fields: impl IntoIterator<Item = (&'m String, &'m String)>,
    ) -> Self {
        for (resource, field) in fields {
            self.id_fields.insert(resource.clone(), field.clone());
        }
        self
    }

    /// Identifier attribute used for `resource`.
    pub fn id_field(&self, resource: &str) -> &str {
        self.id_fields
            .get(resource)
            .map(String::as_str)
            .unwrap_or(DEFAULT_ID_FIELD)
    }

    pub fn ownership_of(&self, resource: &str, item: &Value) -> Ownership {
        match self.identity {
            Some(identity) => ownership_of(item, self.id_field(resource), identity).into(),
            None => Ownership::Other,
        }
    }

    pub fn allowed_fields(&self, resource: &str, ownership: Ownership) -> BTreeSet<String> {
        allowed_fields(self.declaration, resource, ownership.is_own())
    }

    /// Check a single item.
    ///
    /// `key` is the item's collection key, used to label the result.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidItemError`] when `item` is not a JSON object.
    pub fn check_item(
        &self,
        resource: &str,
        key: Option<&str>,
        item: &Value,
    ) -> Result<FieldViolation, InvalidItemError> {
        let label = key
            .map(str::to_string)
            .or_else(|| item.get(self.id_field(resource)).and_then(normalized_id))
            .unwrap_or_else(|| "?".to_string());

        let Value::Object(fields) = item else {
            return Err(InvalidItemError {
                resource: resource.to_string(),
                item: label,
                found: json_type(item),
            });
        };

        let ownership = self.ownership_of(resource, item);
        let allowed = self.allowed_fields(resource, ownership);
        let unexpected: BTreeSet<String> = fields
            .keys()
            .filter(|k| !allowed.contains(*k))
            .cloned()
            .collect();

        if !unexpected.is_empty() {
            tracing::debug!(
                resource,
                item = %label,
                %ownership,
                count = unexpected.len(),
                "item exposes fields outside its permissions"
            );
        }

        Ok(FieldViolation {
            resource: resource.to_string(),
            item: label,
            ownership,
            unexpected,
        })
    }

    /// Check every item of a collection keyed by item identifier.
    ///
    /// Each item gets its own ownership decision and allowed set.
    pub fn check_collection(
        &self,
        resource: &str,
        items: &Map<String, Value>,
    ) -> Vec<Result<FieldViolation, InvalidItemError>> {
        items
            .iter()
            .map(|(key, item)| self.check_item(resource, Some(key), item))
            .collect()
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
