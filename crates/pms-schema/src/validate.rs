//! # Response Validation
//!
//! Runtime validation of PMS API responses against the Swagger document
//! (Swagger 2.0 or OpenAPI 3.0).
//!
//! ## Response Lookup
//!
//! For `(method, path template, status)` the documented response is the
//! exact status code, then the `4XX`-style range, then `default`. A
//! response given as a local `$ref` (`#/responses/...`,
//! `#/components/responses/...`) is followed once.
//!
//! The body schema is `schema` (Swagger 2.0) or the first JSON media type
//! under `content` (OpenAPI 3). A documented response without a schema
//! accepts any body.
//!
//! ## Schema Resolution
//!
//! The response schema is compiled inside a root that also carries the
//! document's `definitions` and `components`, so internal `$ref`s of the
//! form `#/definitions/<name>` and `#/components/schemas/<name>` are
//! resolved by the jsonschema crate natively. Swagger schema objects are a
//! Draft 4 dialect; unknown keywords (`readOnly`, `x-*`, `nullable`) are
//! ignored.

use std::fmt;
use std::path::Path;

use jsonschema::{Retrieve, Uri, ValidationOptions, Validator};
use serde_json::{json, Map, Value};
use thiserror::Error;

/// Retriever that never touches the network.
///
/// Every external `$ref` resolves to a permissive schema that accepts
/// anything. The PMS document is self-contained; anything else is out of
/// the harness's control.
struct OfflineRetriever;

impl Retrieve for OfflineRetriever {
    fn retrieve(
        &self,
        uri: &Uri<&str>,
    ) -> Result<Value, Box<dyn std::error::Error + Send + Sync>> {
        tracing::debug!(uri = uri.as_str(), "unresolved external $ref, accepting anything");
        Ok(json!({}))
    }
}

/// Error during contract loading or response validation.
#[derive(Error, Debug)]
pub enum SchemaValidationError {
    /// The response body did not conform to the documented schema.
    #[error("response of {operation} failed validation:\n{violations}")]
    ValidationFailed {
        /// Operation and status, e.g. `GET /people -> 200`.
        operation: String,
        /// Structured list of individual violations.
        violations: ValidationViolations,
    },

    /// The document does not describe the requested operation.
    #[error("operation {method} {path} is not documented")]
    UndocumentedOperation {
        /// Upper-case HTTP method.
        method: String,
        /// Path template as written in the document.
        path: String,
    },

    /// The operation does not document the received status code.
    #[error("response code {status} is not documented for {operation}")]
    UndocumentedResponse {
        /// Operation, e.g. `GET /people`.
        operation: String,
        /// Received HTTP status code.
        status: u16,
    },

    #[error("cannot load API contract '{path}': {reason}")]
    DocumentLoadError { path: String, reason: String },

    /// The documented response schema is not a valid schema.
    #[error("cannot compile response schema of {operation}: {reason}")]
    ValidatorBuildError { operation: String, reason: String },
}

/// One way in which a response body breaks its documented schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// JSON Pointer into the response body; empty for the body itself.
    pub instance_path: String,
    /// JSON Pointer into the schema keyword that failed.
    pub schema_path: String,
    pub message: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let at = if self.instance_path.is_empty() {
            "(body)"
        } else {
            self.instance_path.as_str()
        };
        write!(f, "  at {at}: {}", self.message)
    }
}

/// Every violation found in one response, one per line when displayed.
#[derive(Debug, Clone, Default)]
pub struct ValidationViolations(Vec<Violation>);

impl ValidationViolations {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Violation> {
        self.0.iter()
    }
}

impl FromIterator<Violation> for ValidationViolations {
    fn from_iter<I: IntoIterator<Item = Violation>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl fmt::Display for ValidationViolations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let lines: Vec<String> = self.0.iter().map(Violation::to_string).collect();
        f.write_str(&lines.join("\n"))
    }
}

/// A loaded Swagger/OpenAPI document.
///
/// `ApiContract` is `Send + Sync` and immutable after loading; share it
/// across sessions by reference.
#[derive(Debug, Clone)]
pub struct ApiContract {
    /// Where the document came from, for diagnostics.
    source: String,
    document: Value,
}

impl ApiContract {
    /// Load a contract from a `.yaml`/`.yml` or `.json` file.
    ///
    /// # Errors
    ///
    /// Returns `SchemaValidationError::DocumentLoadError` if the file cannot
    /// be read or parsed, or has no `paths` object.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SchemaValidationError> {
        let path = path.as_ref();
        let source = path.display().to_string();
        let load_error = |reason: String| SchemaValidationError::DocumentLoadError {
            path: source.clone(),
            reason,
        };

        let content = std::fs::read_to_string(path).map_err(|e| load_error(e.to_string()))?;
        let is_json = path.extension().is_some_and(|ext| ext == "json");
        let document = if is_json {
            serde_json::from_str(&content).map_err(|e| load_error(format!("not JSON: {e}")))?
        } else {
            serde_yaml::from_str(&content)
                .map_err(|e| e.to_string())
                .and_then(yaml_to_json_value)
                .map_err(|e| load_error(format!("not YAML: {e}")))?
        };

        Self::from_value(source, document)
    }

    /// Wrap an already-parsed document.
    ///
    /// # Errors
    ///
    /// Returns `SchemaValidationError::DocumentLoadError` if the document
    /// has no `paths` object.
    pub fn from_value(
        source: impl Into<String>,
        document: Value,
    ) -> Result<Self, SchemaValidationError> {
        let source = source.into();
        if !document.get("paths").is_some_and(Value::is_object) {
            return Err(SchemaValidationError::DocumentLoadError {
                path: source,
                reason: "document has no `paths` object".to_string(),
            });
        }
        tracing::debug!(%source, "loaded API contract");
        Ok(Self { source, document })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Swagger 2.0 `basePath`, or the empty string.
    pub fn base_path(&self) -> &str {
        self.document
            .get("basePath")
            .and_then(Value::as_str)
            .map(|p| p.trim_end_matches('/'))
            .unwrap_or("")
    }

    /// Path templates documented in the contract, sorted.
    pub fn path_templates(&self) -> Vec<&str> {
        let mut paths: Vec<&str> = self
            .document
            .get("paths")
            .and_then(Value::as_object)
            .map(|p| p.keys().map(String::as_str).collect())
            .unwrap_or_default();
        paths.sort();
        paths
    }

    /// Look up the operation object for `method` on `path`.
    pub fn operation(&self, method: &str, path: &str) -> Option<&Value> {
        self.document
            .get("paths")?
            .get(path)?
            .get(method.to_ascii_lowercase())
    }

    /// The body schema documented for a response, if any.
    ///
    /// # Errors
    ///
    /// Returns `UndocumentedOperation` or `UndocumentedResponse` when the
    /// document does not describe the response at all.
    pub fn response_schema(
        &self,
        method: &str,
        path: &str,
        status: u16,
    ) -> Result<Option<&Value>, SchemaValidationError> {
        let method = method.to_ascii_uppercase();
        let operation = self.operation(&method, path).ok_or_else(|| {
            SchemaValidationError::UndocumentedOperation {
                method: method.clone(),
                path: path.to_string(),
            }
        })?;

        let responses = operation.get("responses");
        let response = [
            status.to_string(),
            format!("{}XX", status / 100),
            "default".to_string(),
        ]
        .iter()
        .find_map(|key| responses.and_then(|r| r.get(key)))
        .ok_or_else(|| SchemaValidationError::UndocumentedResponse {
            operation: format!("{method} {path}"),
            status,
        })?;
        let response = self.follow_ref(response);

        if let Some(schema) = response.get("schema") {
            return Ok(Some(schema));
        }

        let json_content = response
            .get("content")
            .and_then(Value::as_object)
            .and_then(|content| {
                content
                    .iter()
                    .find(|(media_type, _)| media_type.contains("json"))
                    .map(|(_, media)| media)
            });
        Ok(json_content.and_then(|media| media.get("schema")))
    }

    /// Validate a response body against the documented schema.
    ///
    /// # Arguments
    ///
    /// * `method`: HTTP method, any case.
    /// * `path`: Path template as written in the document, without
    ///   `basePath` (e.g. `/people/{people_id}`).
    /// * `status`: Received status code.
    /// * `body`: Parsed response body.
    ///
    /// # Errors
    ///
    /// Returns `SchemaValidationError::ValidationFailed` with structured
    /// violation details if the body is invalid, and the lookup errors of
    /// [`response_schema`](Self::response_schema).
    pub fn validate_response(
        &self,
        method: &str,
        path: &str,
        status: u16,
        body: &Value,
    ) -> Result<(), SchemaValidationError> {
        let operation = format!("{} {path} -> {status}", method.to_ascii_uppercase());
        let Some(schema) = self.response_schema(method, path, status)? else {
            return Ok(());
        };

        let validator = self.build_validator(schema, &operation)?;
        let violations: ValidationViolations = validator
            .iter_errors(body)
            .map(|e| Violation {
                instance_path: e.instance_path.to_string(),
                schema_path: e.schema_path.to_string(),
                message: e.to_string(),
            })
            .collect();
        if violations.is_empty() {
            return Ok(());
        }

        tracing::debug!(%operation, count = violations.len(), "response violates contract");
        Err(SchemaValidationError::ValidationFailed {
            operation,
            violations,
        })
    }

    /// Compile `schema` with the document's shared definitions in scope.
    fn build_validator(
        &self,
        schema: &Value,
        operation: &str,
    ) -> Result<Validator, SchemaValidationError> {
        let mut root = Map::new();
        for key in ["definitions", "components"] {
            if let Some(shared) = self.document.get(key) {
                root.insert(key.to_string(), shared.clone());
            }
        }
        root.insert("allOf".to_string(), Value::Array(vec![schema.clone()]));

        self.build_options()
            .build(&Value::Object(root))
            .map_err(|e| SchemaValidationError::ValidatorBuildError {
                operation: operation.to_string(),
                reason: e.to_string(),
            })
    }

    fn build_options(&self) -> ValidationOptions {
        let mut opts = jsonschema::options();
        opts.with_draft(jsonschema::Draft::Draft4);
        opts.with_retriever(OfflineRetriever);
        opts
    }

    /// Follow a local `$ref` one level, leaving anything else untouched.
    fn follow_ref<'a>(&'a self, value: &'a Value) -> &'a Value {
        value
            .get("$ref")
            .and_then(Value::as_str)
            .and_then(|r| r.strip_prefix('#'))
            .and_then(|pointer| self.document.pointer(pointer))
            .unwrap_or(value)
    }
}

/// Swagger documents written in YAML key responses by bare integers
/// (`200:`); JSON objects need string keys.
fn yaml_to_json_value(yaml: serde_yaml::Value) -> Result<Value, String> {
    serde_json::to_value(stringify_keys(yaml)).map_err(|e| e.to_string())
}

fn stringify_keys(yaml: serde_yaml::Value) -> serde_yaml::Value {
    use serde_yaml::Value as Yaml;

    match yaml {
        Yaml::Mapping(map) => Yaml::Mapping(
            map.into_iter()
                .map(|(key, value)| {
                    let key = match key {
                        Yaml::Number(n) => Yaml::String(n.to_string()),
                        Yaml::Bool(b) => Yaml::String(b.to_string()),
                        other => other,
                    };
                    (key, stringify_keys(value))
                })
                .collect(),
        ),
        Yaml::Sequence(seq) => Yaml::Sequence(seq.into_iter().map(stringify_keys).collect()),
        Yaml::Tagged(tagged) => stringify_keys(tagged.value),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    const SWAGGER_YAML: &str = r##"
swagger: "2.0"
basePath: /api/
paths:
  /people:
    get:
      responses:
        200:
          description: people by id
          schema:
            type: object
            required: [people]
            properties:
              people:
                type: object
                additionalProperties:
                  $ref: "#/definitions/Person"
        400:
          $ref: "#/responses/Error"
  /people/{people_id}:
    get:
      responses:
        200:
          description: one person
          schema:
            $ref: "#/definitions/Person"
        default:
          description: anything else
  /login:
    post:
      responses:
        200:
          description: token
responses:
  Error:
    description: rejected
    schema:
      type: object
      required: [error]
      properties:
        error:
          type: string
definitions:
  Person:
    type: object
    properties:
      id:
        type: integer
      name:
        type: string
"##;

    fn contract() -> ApiContract {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        file.write_all(SWAGGER_YAML.as_bytes()).unwrap();
        ApiContract::load(file.path()).unwrap()
    }

    #[test]
    fn loads_yaml_with_integer_response_keys() {
        let c = contract();
        assert_eq!(c.base_path(), "/api");
        assert_eq!(c.path_templates(), vec!["/login", "/people", "/people/{people_id}"]);
        assert!(c.response_schema("get", "/people", 200).unwrap().is_some());
    }

    #[test]
    fn valid_collection_passes() {
        let body = json!({"people": {"1": {"id": 1, "name": "Sammy"}}});
        contract().validate_response("GET", "/people", 200, &body).unwrap();
    }

    #[test]
    fn definitions_ref_is_enforced() {
        let body = json!({"people": {"1": {"id": "one"}}});
        let err = contract()
            .validate_response("GET", "/people", 200, &body)
            .unwrap_err();
        match err {
            SchemaValidationError::ValidationFailed { violations, .. } => {
                assert!(!violations.is_empty());
                assert!(violations.iter().next().unwrap().instance_path.contains("/people/1/id"));
            }
            other => panic!("expected ValidationFailed, got {other}"),
        }
    }

    #[test]
    fn response_ref_is_followed() {
        let c = contract();
        c.validate_response("get", "/people", 400, &json!({"error": "No Authorization header found"}))
            .unwrap();
        let err = c.validate_response("get", "/people", 400, &json!({})).unwrap_err();
        assert!(matches!(err, SchemaValidationError::ValidationFailed { .. }));
    }

    #[test]
    fn default_response_without_schema_accepts_anything() {
        contract()
            .validate_response("GET", "/people/{people_id}", 404, &json!("gone"))
            .unwrap();
    }

    #[test]
    fn undocumented_status_is_rejected() {
        let err = contract()
            .validate_response("POST", "/login", 400, &json!({}))
            .unwrap_err();
        assert!(
            matches!(err, SchemaValidationError::UndocumentedResponse { status: 400, .. }),
            "got {err}"
        );
    }

    #[test]
    fn undocumented_operation_is_rejected() {
        let err = contract()
            .validate_response("DELETE", "/people", 200, &json!({}))
            .unwrap_err();
        assert!(matches!(err, SchemaValidationError::UndocumentedOperation { .. }));
    }

    #[test]
    fn openapi3_json_content_and_components() {
        let doc = json!({
            "openapi": "3.0.0",
            "paths": {
                "/roles": {
                    "get": {
                        "responses": {
                            "2XX": {
                                "description": "roles",
                                "content": {
                                    "application/json": {
                                        "schema": {"$ref": "#/components/schemas/Roles"}
                                    }
                                }
                            }
                        }
                    }
                }
            },
            "components": {
                "schemas": {
                    "Roles": {"type": "object", "required": ["roles"]}
                }
            }
        });
        let c = ApiContract::from_value("inline", doc).unwrap();
        assert_eq!(c.base_path(), "");
        c.validate_response("GET", "/roles", 200, &json!({"roles": {}})).unwrap();
        assert!(c.validate_response("GET", "/roles", 201, &json!({})).is_err());
    }

    #[test]
    fn document_without_paths_is_rejected() {
        let err = ApiContract::from_value("inline", json!({"swagger": "2.0"})).unwrap_err();
        assert!(matches!(err, SchemaValidationError::DocumentLoadError { .. }));
    }

    #[test]
    fn invalid_json_file_is_rejected() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        file.write_all(b"{ not json").unwrap();
        let err = ApiContract::load(file.path()).unwrap_err();
        assert!(matches!(err, SchemaValidationError::DocumentLoadError { .. }));
    }

    #[test]
    fn violation_display_root() {
        let v = Violation {
            instance_path: String::new(),
            schema_path: "/allOf/0/required".to_string(),
            message: r#""people" is a required property"#.to_string(),
        };
        assert!(v.to_string().contains("at (body)"));
    }
}
