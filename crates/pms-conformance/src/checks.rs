//! Shared plumbing for checks: the run context and response assertions.

use std::collections::BTreeMap;

use pms_client::{ApiResponse, PmsClient};
use pms_schema::ApiContract;

/// What every check needs besides its own inputs.
#[derive(Debug, Clone, Copy)]
pub struct CheckContext<'a> {
    /// Unauthorized client; checks derive authorized clients from it.
    pub client: &'a PmsClient,
    pub contract: Option<&'a ApiContract>,
    pub id_fields: &'a BTreeMap<String, String>,
}

impl<'a> CheckContext<'a> {
    /// Assert the response status.
    pub fn expect_status(&self, resp: &ApiResponse, expected: u16) -> Result<(), String> {
        if resp.status == expected {
            Ok(())
        } else {
            Err(format!(
                "{}: expected status {expected}, got {} with body {}",
                resp.endpoint, resp.status, resp.body
            ))
        }
    }

    /// Validate the response against the Swagger contract, if one is loaded.
    ///
    /// `template` is the path template relative to the API root, e.g.
    /// `/people/{people_id}`. Documents that spell out the API root in
    /// their paths instead of using `basePath` are matched too.
    pub fn conform(&self, resp: &ApiResponse, method: &str, template: &str) -> Result<(), String> {
        let Some(contract) = self.contract else {
            return Ok(());
        };

        let rooted = format!("{}{template}", self.client.config().root_prefix());
        let path = if contract.operation(method, template).is_none()
            && contract.operation(method, &rooted).is_some()
        {
            rooted.as_str()
        } else {
            template
        };

        contract
            .validate_response(method, path, resp.status, &resp.body)
            .map_err(|e| e.to_string())
    }

    /// Status assertion followed by contract validation.
    pub fn expect(
        &self,
        resp: &ApiResponse,
        expected: u16,
        method: &str,
        template: &str,
    ) -> Result<(), String> {
        self.expect_status(resp, expected)?;
        self.conform(resp, method, template)
    }
}

/// Assert that a rejected response carries `message`.
pub fn expect_error(resp: &ApiResponse, message: &str) -> Result<(), String> {
    match resp.error_message() {
        Some(actual) if actual == message => Ok(()),
        Some(actual) => Err(format!(
            "{}: expected error \"{message}\", got \"{actual}\"",
            resp.endpoint
        )),
        None => Err(format!(
            "{}: expected error \"{message}\", body has none: {}",
            resp.endpoint, resp.body
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pms_client::PmsApiConfig;
    use serde_json::json;

    fn response(status: u16, body: serde_json::Value) -> ApiResponse {
        ApiResponse {
            endpoint: "GET /people".into(),
            status,
            body,
        }
    }

    #[test]
    fn status_mismatch_names_endpoint_and_body() {
        let client = PmsClient::new(PmsApiConfig::local_mock(9000).unwrap()).unwrap();
        let id_fields = BTreeMap::new();
        let ctx = CheckContext {
            client: &client,
            contract: None,
            id_fields: &id_fields,
        };
        let err = ctx
            .expect(&response(500, json!({"error": "boom"})), 200, "GET", "/people")
            .unwrap_err();
        assert!(err.contains("GET /people"));
        assert!(err.contains("got 500"));
        assert!(err.contains("boom"));
    }

    #[test]
    fn contract_paths_with_root_are_matched() {
        let client = PmsClient::new(PmsApiConfig::local_mock(9000).unwrap()).unwrap();
        let contract = ApiContract::from_value(
            "inline",
            json!({
                "swagger": "2.0",
                "paths": {
                    "/api/people": {
                        "get": {"responses": {"200": {
                            "description": "ok",
                            "schema": {"type": "object", "required": ["people"]}
                        }}}
                    }
                }
            }),
        )
        .unwrap();
        let id_fields = BTreeMap::new();
        let ctx = CheckContext {
            client: &client,
            contract: Some(&contract),
            id_fields: &id_fields,
        };
        ctx.conform(&response(200, json!({"people": {}})), "GET", "/people")
            .unwrap();
        assert!(ctx.conform(&response(200, json!({})), "GET", "/people").is_err());
    }

    #[test]
    fn error_message_mismatch() {
        let resp = response(400, json!({"error": "Nope"}));
        assert!(expect_error(&resp, "Nope").is_ok());
        let err = expect_error(&resp, "No Authorization header found").unwrap_err();
        assert!(err.contains("got \"Nope\""));
        assert!(expect_error(&response(400, json!(null)), "x").is_err());
    }
}
