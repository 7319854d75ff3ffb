//! # Permission Declarations
//!
//! The per-resource field-visibility rules returned by the API at login:
//!
//! ```json
//! {
//!   "people": { "view": ["id", "name"], "self": { "view": ["email"] }, "create": {} },
//!   "roles":  { "view": ["id", "title"] }
//! }
//! ```
//!
//! A declaration is supplied once per session and never mutated afterwards.
//! Field lists are kept in wire order; consumers compare them as sets.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Field-visibility rules of one caller role, keyed by resource name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PermissionDeclaration(BTreeMap<String, PermissionRecord>);

impl PermissionDeclaration {
    /// Create an empty declaration (every resource undeclared).
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insertion of a resource record.
    pub fn with_resource(mut self, resource: impl Into<String>, record: PermissionRecord) -> Self {
        self.0.insert(resource.into(), record);
        self
    }

    /// Look up the record for `resource`.
    pub fn get(&self, resource: &str) -> Option<&PermissionRecord> {
        self.0.get(resource)
    }

    /// Whether the role declares `create` for `resource`.
    ///
    /// Presence of the key is what counts, whatever its value.
    pub fn can_create(&self, resource: &str) -> bool {
        self.get(resource).is_some_and(|r| r.create.is_some())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Permissions of a role on one resource.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PermissionRecord {
    /// Fields visible on every item of the resource.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub view: Vec<String>,

    /// Extra permissions that apply only to the caller's own items.
    #[serde(rename = "self", default, skip_serializing_if = "Option::is_none")]
    pub own: Option<OwnPermissions>,

    /// Present when the role may create items. A JSON `null` still counts
    /// as present.
    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub create: Option<Value>,

    /// Any other permission keys (`edit`, ...), kept for reporting.
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

impl PermissionRecord {
    /// Record with only general `view` fields.
    pub fn viewing<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            view: fields.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Add `self.view` fields.
    pub fn with_own_view<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.own = Some(OwnPermissions {
            view: fields.into_iter().map(Into::into).collect(),
            other: Map::new(),
        });
        self
    }

    /// Mark the resource as creatable.
    pub fn creatable(mut self) -> Self {
        self.create = Some(Value::Object(Map::new()));
        self
    }

    /// The `self.view` fields, empty when `self` is absent.
    pub fn own_view(&self) -> &[String] {
        self.own.as_ref().map(|o| o.view.as_slice()).unwrap_or_default()
    }
}

/// The `self` block of a permission record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OwnPermissions {
    /// Fields visible on own items, in addition to the general `view`.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub view: Vec<String>,

    #[serde(flatten)]
    pub other: Map<String, Value>,
}

/// `"view": null` reads as no fields.
fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<Vec<String>>::deserialize(deserializer).map(Option::unwrap_or_default)
}

fn present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_login_permissions() {
        let decl: PermissionDeclaration = serde_json::from_value(json!({
            "people": {
                "view": ["id", "name"],
                "self": { "view": ["email"], "edit": ["email"] },
                "create": ["name"],
                "edit": ["name"]
            },
            "roles": { "view": ["id", "title"] }
        }))
        .unwrap();

        assert_eq!(decl.len(), 2);
        let people = decl.get("people").unwrap();
        assert_eq!(people.view, vec!["id", "name"]);
        assert_eq!(people.own_view(), ["email".to_string()]);
        assert_eq!(people.other.get("edit"), Some(&json!(["name"])));
        assert!(decl.can_create("people"));
        assert!(!decl.can_create("roles"));
        assert!(decl.get("roles").unwrap().own_view().is_empty());
    }

    #[test]
    fn null_create_counts_as_present() {
        let decl: PermissionDeclaration =
            serde_json::from_value(json!({"people": {"view": [], "create": null}})).unwrap();
        assert!(decl.can_create("people"));
    }

    #[test]
    fn missing_view_is_empty() {
        let decl: PermissionDeclaration =
            serde_json::from_value(json!({"fields": {"create": {}}})).unwrap();
        assert!(decl.get("fields").unwrap().view.is_empty());
        assert!(decl.can_create("fields"));
    }

    #[test]
    fn null_view_is_empty() {
        let decl: PermissionDeclaration = serde_json::from_value(json!({
            "people": {"view": null, "self": {"view": null}},
            "roles": {"view": ["id"]}
        }))
        .unwrap();
        let people = decl.get("people").unwrap();
        assert!(people.view.is_empty());
        assert!(people.own_view().is_empty());
        assert_eq!(decl.get("roles").unwrap().view, vec!["id"]);
    }

    #[test]
    fn undeclared_resource_cannot_create() {
        assert!(!PermissionDeclaration::new().can_create("people"));
    }

    #[test]
    fn builder_matches_wire_form() {
        let built = PermissionDeclaration::new().with_resource(
            "people",
            PermissionRecord::viewing(["id", "name"])
                .with_own_view(["email"])
                .creatable(),
        );
        let parsed: PermissionDeclaration = serde_json::from_value(json!({
            "people": {"view": ["id", "name"], "self": {"view": ["email"]}, "create": {}}
        }))
        .unwrap();
        assert_eq!(built, parsed);
    }
}
