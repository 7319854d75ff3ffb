//! PMS API client error types.

/// Errors from PMS API calls.
#[derive(Debug, thiserror::Error)]
pub enum PmsApiError {
    /// HTTP transport error.
    #[error("HTTP error calling {endpoint}: {source}")]
    Http {
        endpoint: String,
        source: reqwest::Error,
    },
    /// The API returned a status the operation cannot continue from.
    #[error("PMS API {endpoint} returned {status}: {body}")]
    ApiError {
        endpoint: String,
        status: u16,
        body: String,
    },
    /// The token cannot be sent as a header value.
    #[error("token is not a valid Authorization header value")]
    InvalidToken,
    /// The login response did not yield a usable session.
    #[error("login failed: {0}")]
    Session(#[from] pms_core::PmsError),
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(#[from] super::config::ConfigError),
}
