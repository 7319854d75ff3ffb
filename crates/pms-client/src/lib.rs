//! # pms-client: HTTP Client for the PMS API
//!
//! The transport half of the conformance harness. Every call returns the
//! status and parsed body of the response, whatever the status: the
//! harness asserts on rejected requests as much as on accepted ones.
//!
//! ## API Path Convention
//!
//! The API is mounted under a root path (default `/api`). The full URL
//! pattern is `{base_url}{api_root}/{resource}[/{id}]`, plus `/login`.
//!
//! ## Authorization
//!
//! The session token is sent verbatim in the `Authorization` header, with
//! no scheme prefix. An unauthorized client sends no header at all.

pub mod config;
pub mod error;
pub(crate) mod retry;

pub use config::{ConfigError, PmsApiConfig};
pub use error::PmsApiError;

use std::fmt;
use std::time::Duration;

use pms_core::contract;
use pms_core::Session;
use reqwest::header::{HeaderValue, AUTHORIZATION};
use reqwest::Method;
use serde_json::{json, Value};

/// Status and body of one API call.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    /// `METHOD /path`, for diagnostics.
    pub endpoint: String,
    pub status: u16,
    /// Parsed JSON body. Non-JSON bodies are kept as a string, empty
    /// bodies as `null`.
    pub body: Value,
}

impl ApiResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// The API error message carried by the body, if any.
    pub fn error_message(&self) -> Option<String> {
        contract::error_message(&self.body)
    }

    /// Build a session from a login response.
    ///
    /// # Errors
    ///
    /// Returns [`PmsApiError::ApiError`] unless the login answered 200, and
    /// [`PmsApiError::Session`] when the body carries no usable token.
    pub fn into_session(self) -> Result<Session, PmsApiError> {
        let resp = self.expect_status(200)?;
        Ok(Session::from_login_body(&resp.body)?)
    }

    /// Fail with [`PmsApiError::ApiError`] unless the status is `expected`.
    pub fn expect_status(self, expected: u16) -> Result<Self, PmsApiError> {
        if self.status == expected {
            Ok(self)
        } else {
            Err(PmsApiError::ApiError {
                endpoint: self.endpoint,
                status: self.status,
                body: self.body.to_string(),
            })
        }
    }
}

/// PMS API client, optionally bound to a session token.
///
/// Cloning is cheap; the underlying connection pool is shared.
#[derive(Clone)]
pub struct PmsClient {
    http: reqwest::Client,
    config: PmsApiConfig,
    token: Option<HeaderValue>,
}

impl fmt::Debug for PmsClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PmsClient")
            .field("config", &self.config)
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

impl PmsClient {
    /// Create an unauthorized client from configuration.
    pub fn new(config: PmsApiConfig) -> Result<Self, PmsApiError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| PmsApiError::Http {
                endpoint: "client_init".into(),
                source: e,
            })?;

        Ok(Self {
            http,
            config,
            token: None,
        })
    }

    pub fn config(&self) -> &PmsApiConfig {
        &self.config
    }

    pub fn is_authorized(&self) -> bool {
        self.token.is_some()
    }

    /// A client sending `token` with every request.
    pub fn with_token(&self, token: &str) -> Result<Self, PmsApiError> {
        let mut value = HeaderValue::from_str(token).map_err(|_| PmsApiError::InvalidToken)?;
        value.set_sensitive(true);
        Ok(Self {
            http: self.http.clone(),
            config: self.config.clone(),
            token: Some(value),
        })
    }

    /// A client acting on behalf of `session`.
    pub fn authorized(&self, session: &Session) -> Result<Self, PmsApiError> {
        self.with_token(session.token())
    }

    /// `POST /login`. A `None` password is sent as JSON `null`.
    pub async fn login(
        &self,
        user: &str,
        password: Option<&str>,
    ) -> Result<ApiResponse, PmsApiError> {
        let body = json!({ "user": user, "password": password });
        self.send(Method::POST, &["login"], Some(&body)).await
    }

    /// Log in and build a session from the response.
    ///
    /// # Errors
    ///
    /// Returns [`PmsApiError::ApiError`] unless the login answers 200, and
    /// [`PmsApiError::Session`] when the response carries no usable token.
    pub async fn open_session(&self, user: &str, password: &str) -> Result<Session, PmsApiError> {
        self.login(user, Some(password)).await?.into_session()
    }

    /// `GET /{resource}`: the whole collection.
    pub async fn list(&self, resource: &str) -> Result<ApiResponse, PmsApiError> {
        self.send(Method::GET, &[resource], None).await
    }

    /// `GET /{resource}/{id}`: a single item. `id` is sent as one path
    /// segment whatever characters it holds.
    pub async fn get(&self, resource: &str, id: &str) -> Result<ApiResponse, PmsApiError> {
        self.send(Method::GET, &[resource, id], None).await
    }

    /// `POST /{resource}` with `body`.
    pub async fn create(&self, resource: &str, body: &Value) -> Result<ApiResponse, PmsApiError> {
        self.send(Method::POST, &[resource], Some(body)).await
    }

    async fn send(
        &self,
        method: Method,
        segments: &[&str],
        body: Option<&Value>,
    ) -> Result<ApiResponse, PmsApiError> {
        let endpoint = format!("{method} /{}", segments.join("/"));
        let url = self.config.endpoint_url(segments)?;

        let resp = retry::with_backoff(&endpoint, || {
            let mut req = self.http.request(method.clone(), url.clone());
            if let Some(token) = &self.token {
                req = req.header(AUTHORIZATION, token.clone());
            }
            if let Some(body) = body {
                req = req.json(body);
            }
            req.send()
        })
        .await
        .map_err(|e| PmsApiError::Http {
            endpoint: endpoint.clone(),
            source: e,
        })?;

        let status = resp.status().as_u16();
        let text = resp.text().await.map_err(|e| PmsApiError::Http {
            endpoint: endpoint.clone(),
            source: e,
        })?;
        let body = parse_body(text);

        tracing::debug!(%endpoint, status, authorized = self.is_authorized(), "PMS API call");
        Ok(ApiResponse {
            endpoint,
            status,
            body,
        })
    }
}

fn parse_body(text: String) -> Value {
    if text.trim().is_empty() {
        return Value::Null;
    }
    serde_json::from_str(&text).unwrap_or(Value::String(text))
}
