//! # HTTP Contract
//!
//! Error messages the PMS API returns for requests it rejects, and the
//! extraction of those messages from response bodies. The API owns this
//! contract; the harness only asserts it.

use serde_json::Value;

use crate::permission::PermissionDeclaration;

/// Body `error` of a protected-resource request without a token.
pub const NO_AUTHORIZATION_HEADER: &str = "No Authorization header found";

/// Body `error` of an empty create request by a role that may create.
pub const CREATING_NOTHING: &str = "Creating nothing is not allowed";

/// Status code of every rejected request in the contract.
pub const REJECTED_STATUS: u16 = 400;

/// Error message expected for an empty-body create on `resource`.
pub fn expected_empty_create_error(declaration: &PermissionDeclaration, resource: &str) -> String {
    if declaration.can_create(resource) {
        CREATING_NOTHING.to_string()
    } else {
        format!("Creating \"{resource}\" not allowed")
    }
}

/// Extract the error message from a response body.
///
/// The API sometimes wraps its message twice: `error` holds a JSON-encoded
/// object whose own `error` field is the message. The inner message wins
/// when present.
pub fn error_message(body: &Value) -> Option<String> {
    match body.get("error")? {
        Value::String(raw) => match serde_json::from_str::<Value>(raw) {
            Ok(inner) => inner.get("error").and_then(Value::as_str).map(str::to_string),
            Err(_) => Some(raw.clone()),
        },
        Value::Object(inner) => inner.get("error").and_then(Value::as_str).map(str::to_string),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::permission::PermissionRecord;
    use serde_json::json;

    #[test]
    fn empty_create_message_depends_on_create_permission() {
        let decl = PermissionDeclaration::new()
            .with_resource("people", PermissionRecord::viewing(["id"]).creatable())
            .with_resource("roles", PermissionRecord::viewing(["id"]));

        assert_eq!(expected_empty_create_error(&decl, "people"), CREATING_NOTHING);
        assert_eq!(
            expected_empty_create_error(&decl, "roles"),
            "Creating \"roles\" not allowed"
        );
        assert_eq!(
            expected_empty_create_error(&decl, "fields"),
            "Creating \"fields\" not allowed"
        );
    }

    #[test]
    fn plain_error_message() {
        let body = json!({"error": NO_AUTHORIZATION_HEADER});
        assert_eq!(error_message(&body).as_deref(), Some(NO_AUTHORIZATION_HEADER));
    }

    #[test]
    fn json_encoded_error_message() {
        let body = json!({"error": "{\"error\": \"Creating nothing is not allowed\"}"});
        assert_eq!(error_message(&body).as_deref(), Some(CREATING_NOTHING));
    }

    #[test]
    fn json_encoded_without_inner_error() {
        let body = json!({"error": "{\"detail\": 1}"});
        assert_eq!(error_message(&body), None);
    }

    #[test]
    fn missing_error_field() {
        assert_eq!(error_message(&json!({"people": {}})), None);
        assert_eq!(error_message(&json!("plain text")), None);
    }
}
