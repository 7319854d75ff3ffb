//! # Token Identity
//!
//! Derives the caller's subject identifier from a compact token of the form
//! `header.payload.signature`. Only the payload segment is read; the
//! signature is NOT verified. The identity is used to decide item ownership,
//! never to grant access.
//!
//! ## Payload Decoding
//!
//! The payload is URL-safe base64 without mandatory padding. Tokens that use
//! the standard alphabet (`+`, `/`) for the same positions are accepted too,
//! as are payloads with non-zero trailing bits, so the accepted input set
//! matches a browser `atob` after undoing the URL-safe substitutions.
//!
//! ## Ownership Normalization
//!
//! The `user` claim is passed through as-is. Comparison against an item
//! identifier normalizes both sides to their textual form: `42` and `"42"`
//! are the same subject. Arrays, objects and `null` never match.

use std::fmt;

use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::MalformedTokenError;

/// Name of the payload claim carrying the subject identifier.
pub const USER_CLAIM: &str = "user";

const PAYLOAD_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new()
        .with_decode_padding_mode(DecodePaddingMode::Indifferent)
        .with_decode_allow_trailing_bits(true),
);

/// Subject identifier of an authenticated caller.
///
/// Immutable once derived. Holds the raw claim value so that numeric and
/// string identifiers survive unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identity(Value);

impl Identity {
    /// Wrap a claim value as an identity.
    pub fn new(value: impl Into<Value>) -> Self {
        Self(value.into())
    }

    /// Access the raw claim value.
    pub fn as_value(&self) -> &Value {
        &self.0
    }

    /// Returns true when `candidate` identifies the same subject.
    pub fn matches(&self, candidate: &Value) -> bool {
        match (normalized_id(&self.0), normalized_id(candidate)) {
            (Some(own), Some(other)) => own == other,
            _ => false,
        }
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match normalized_id(&self.0) {
            Some(id) => write!(f, "{id}"),
            None => write!(f, "{}", self.0),
        }
    }
}

/// Textual form of a scalar identifier, or `None` for values that cannot
/// identify anything.
///
/// Numbers compare by value: a float without fractional part (`42.0`)
/// normalizes like the integer `42`.
pub fn normalized_id(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(normalized_number(n)),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

fn normalized_number(n: &serde_json::Number) -> String {
    if let Some(i) = n.as_i64() {
        return i.to_string();
    }
    if let Some(u) = n.as_u64() {
        return u.to_string();
    }
    match n.as_f64() {
        // Integral and exactly representable as i64.
        Some(f) if f.fract() == 0.0 && f.abs() < 9_007_199_254_740_992.0 => {
            (f as i64).to_string()
        }
        _ => n.to_string(),
    }
}

/// Derive the caller identity from the payload segment of `token`.
///
/// # Errors
///
/// Returns [`MalformedTokenError`] when the token has no payload segment,
/// the payload is not base64, does not decode to a JSON object, or lacks a
/// non-null `user` claim.
pub fn derive_identity(token: &str) -> Result<Identity, MalformedTokenError> {
    let mut segments = token.split('.');
    let payload = match (segments.next(), segments.next()) {
        (Some(_), Some(payload)) => payload,
        _ => return Err(MalformedTokenError::MissingPayload { segments: 1 }),
    };

    // Fold standard-alphabet characters onto their URL-safe counterparts.
    let payload = payload.replace('+', "-").replace('/', "_");
    let bytes = PAYLOAD_ENGINE
        .decode(payload.as_bytes())
        .map_err(|e| MalformedTokenError::Base64(e.to_string()))?;

    let claims: Value =
        serde_json::from_slice(&bytes).map_err(|e| MalformedTokenError::Json(e.to_string()))?;
    let claims = claims.as_object().ok_or(MalformedTokenError::NotAnObject)?;

    match claims.get(USER_CLAIM) {
        None | Some(Value::Null) => Err(MalformedTokenError::MissingUser),
        Some(user) => {
            tracing::debug!(user = %user, "derived identity from token payload");
            Ok(Identity(user.clone()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
    use serde_json::json;

    fn token_with_payload(payload: &Value) -> String {
        let encoded = URL_SAFE_NO_PAD.encode(serde_json::to_vec(payload).unwrap());
        format!("eyJhbGciOiJIUzI1NiJ9.{encoded}.c2lnbmF0dXJl")
    }

    #[test]
    fn derives_numeric_user() {
        let identity = derive_identity("aaa.eyJ1c2VyIjo0Mn0.bbb").unwrap();
        assert_eq!(identity.as_value(), &json!(42));
        assert_eq!(identity.to_string(), "42");
    }

    #[test]
    fn derives_string_user() {
        let token = token_with_payload(&json!({"user": "u-17", "exp": 1}));
        let identity = derive_identity(&token).unwrap();
        assert_eq!(identity.as_value(), &json!("u-17"));
    }

    #[test]
    fn two_segments_are_enough() {
        let identity = derive_identity("aaa.eyJ1c2VyIjo0Mn0").unwrap();
        assert_eq!(identity.as_value(), &json!(42));
    }

    #[test]
    fn padded_payload_is_accepted() {
        let identity = derive_identity("aaa.eyJ1c2VyIjo0Mn0=.bbb").unwrap();
        assert_eq!(identity.as_value(), &json!(42));
    }

    #[test]
    fn url_safe_and_standard_alphabets_agree() {
        // `?>` encodes to characters that differ between the two alphabets.
        let payload = json!({"user": 5, "note": "??>>??"});
        let bytes = serde_json::to_vec(&payload).unwrap();
        let standard = STANDARD.encode(&bytes);
        let url_safe = URL_SAFE_NO_PAD.encode(&bytes);
        assert_ne!(standard.trim_end_matches('='), url_safe);

        let a = derive_identity(&format!("h.{standard}.s")).unwrap();
        let b = derive_identity(&format!("h.{url_safe}.s")).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn is_deterministic() {
        let token = token_with_payload(&json!({"user": 9}));
        assert_eq!(derive_identity(&token).unwrap(), derive_identity(&token).unwrap());
    }

    #[test]
    fn rejects_token_without_separator() {
        assert_eq!(
            derive_identity("eyJ1c2VyIjo0Mn0").unwrap_err(),
            MalformedTokenError::MissingPayload { segments: 1 }
        );
    }

    #[test]
    fn rejects_invalid_base64() {
        let err = derive_identity("aaa.!!!not-base64!!!.bbb").unwrap_err();
        assert!(matches!(err, MalformedTokenError::Base64(_)), "got {err:?}");
    }

    #[test]
    fn rejects_impossible_base64_length() {
        // A single trailing character can never complete a byte.
        let err = derive_identity("aaa.eyJ1c.bbb").unwrap_err();
        assert!(matches!(err, MalformedTokenError::Base64(_)), "got {err:?}");
    }

    #[test]
    fn rejects_non_json_payload() {
        let encoded = URL_SAFE_NO_PAD.encode(b"user=42");
        let err = derive_identity(&format!("aaa.{encoded}.bbb")).unwrap_err();
        assert!(matches!(err, MalformedTokenError::Json(_)), "got {err:?}");
    }

    #[test]
    fn rejects_empty_payload() {
        let err = derive_identity("aaa..bbb").unwrap_err();
        assert!(matches!(err, MalformedTokenError::Json(_)), "got {err:?}");
    }

    #[test]
    fn rejects_non_object_payload() {
        let token = token_with_payload(&json!([42]));
        assert_eq!(derive_identity(&token).unwrap_err(), MalformedTokenError::NotAnObject);
    }

    #[test]
    fn rejects_missing_user() {
        let token = token_with_payload(&json!({"sub": 42}));
        assert_eq!(derive_identity(&token).unwrap_err(), MalformedTokenError::MissingUser);
    }

    #[test]
    fn rejects_null_user() {
        let token = token_with_payload(&json!({"user": null}));
        assert_eq!(derive_identity(&token).unwrap_err(), MalformedTokenError::MissingUser);
    }

    #[test]
    fn numeric_and_string_ids_match() {
        let identity = Identity::new(42);
        assert!(identity.matches(&json!(42)));
        assert!(identity.matches(&json!("42")));
        assert!(!identity.matches(&json!(7)));
        assert!(!identity.matches(&json!(null)));
        assert!(!identity.matches(&json!([42])));
    }

    #[test]
    fn integral_float_ids_match_integers() {
        let identity = Identity::new(42);
        assert!(identity.matches(&json!(42.0)));
        assert!(Identity::new(json!(42.0)).matches(&json!(42)));
        assert!(Identity::new(json!(42.0)).matches(&json!("42")));
        assert!(!identity.matches(&json!(42.5)));
        assert!(Identity::new(json!(42.5)).matches(&json!(42.5)));
        assert_eq!(normalized_id(&json!(-3.0)).as_deref(), Some("-3"));
    }

    #[test]
    fn structured_identity_never_matches() {
        let identity = Identity::new(json!({"id": 42}));
        assert!(!identity.matches(&json!({"id": 42})));
    }
}
