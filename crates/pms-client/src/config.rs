//! PMS API client configuration.
//!
//! Defaults point at the shared test deployment. Override via environment
//! variables or explicit construction for local servers and tests.

use url::Url;

/// Configuration for connecting to the PMS API.
#[derive(Debug, Clone)]
pub struct PmsApiConfig {
    /// Origin of the API, e.g. <http://pms.zaphod>.
    pub base_url: Url,
    /// Path prefix under which the API is mounted, e.g. `/api`.
    pub api_root: String,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl PmsApiConfig {
    /// Default origin of the API.
    pub const DEFAULT_BASE_URL: &'static str = "http://pms.zaphod";
    /// Default mount point of the API.
    pub const DEFAULT_API_ROOT: &'static str = "/api";
    /// Default request timeout.
    pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

    /// Configuration for `base_url` with default root and timeout.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidUrl` if `base_url` does not parse.
    pub fn new(base_url: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            base_url: Url::parse(base_url)
                .map_err(|e| ConfigError::InvalidUrl(base_url.to_string(), e.to_string()))?,
            api_root: Self::DEFAULT_API_ROOT.to_string(),
            timeout_secs: Self::DEFAULT_TIMEOUT_SECS,
        })
    }

    /// Load configuration from environment variables.
    ///
    /// Variables:
    /// - `PMS_BASE_URL` (default: `http://pms.zaphod`)
    /// - `PMS_API_ROOT` (default: `/api`)
    /// - `PMS_TIMEOUT_SECS` (default: 30)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Like [`from_env`](Self::from_env), reading variables through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidUrl` for an unparsable `PMS_BASE_URL`
    /// and `ConfigError::InvalidTimeout` for a non-numeric
    /// `PMS_TIMEOUT_SECS`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let base_url = lookup("PMS_BASE_URL").unwrap_or_else(|| Self::DEFAULT_BASE_URL.to_string());
        let mut config = Self::new(&base_url)?;
        if let Some(api_root) = lookup("PMS_API_ROOT") {
            config.api_root = api_root;
        }
        if let Some(raw) = lookup("PMS_TIMEOUT_SECS") {
            config.timeout_secs = raw
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidTimeout(raw.clone()))?;
        }
        Ok(config)
    }

    /// A local mock server on `port`, with a short timeout.
    pub fn local_mock(port: u16) -> Result<Self, ConfigError> {
        let mut config = Self::new(&format!("http://127.0.0.1:{port}"))?;
        config.timeout_secs = 5;
        Ok(config)
    }

    /// The API root as a path prefix: leading slash, no trailing slash,
    /// empty when the API is mounted at the origin.
    pub fn root_prefix(&self) -> String {
        let trimmed = self.api_root.trim_matches('/');
        if trimmed.is_empty() {
            String::new()
        } else {
            format!("/{trimmed}")
        }
    }

    /// URL of the API endpoint made of `segments` under the API root.
    ///
    /// Each segment is percent-encoded as a whole, so `/`, `?` and `#`
    /// inside an item key stay part of that key.
    pub fn endpoint_url(&self, segments: &[&str]) -> Result<Url, ConfigError> {
        let mut url = self.base_url.clone();
        url.set_query(None);
        url.set_fragment(None);
        {
            let mut path = url
                .path_segments_mut()
                .map_err(|()| ConfigError::NotABase(self.base_url.to_string()))?;
            path.pop_if_empty();
            path.extend(self.api_root.split('/').filter(|s| !s.is_empty()));
            path.extend(segments);
        }
        Ok(url)
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid URL for {0}: {1}")]
    InvalidUrl(String, String),

    #[error("base URL {0} cannot carry a path")]
    NotABase(String),

    #[error("PMS_TIMEOUT_SECS is not a number of seconds: {0:?}")]
    InvalidTimeout(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(cfg: &PmsApiConfig, segments: &[&str]) -> String {
        cfg.endpoint_url(segments).unwrap().to_string()
    }

    #[test]
    fn local_mock_builds_valid_config() {
        let cfg = PmsApiConfig::local_mock(9000).unwrap();
        assert_eq!(cfg.timeout_secs, 5);
        assert_eq!(cfg.base_url.as_str(), "http://127.0.0.1:9000/");
        assert_eq!(url(&cfg, &["people"]), "http://127.0.0.1:9000/api/people");
    }

    #[test]
    fn url_handles_root_variants() {
        let mut cfg = PmsApiConfig::new("http://localhost:4242").unwrap();
        for root in ["api", "/api", "/api/", "api/"] {
            cfg.api_root = root.to_string();
            assert_eq!(url(&cfg, &["login"]), "http://localhost:4242/api/login");
        }
        cfg.api_root = "/".to_string();
        assert_eq!(url(&cfg, &["login"]), "http://localhost:4242/login");

        let cfg = PmsApiConfig::new("http://localhost:4242/pms/").unwrap();
        assert_eq!(url(&cfg, &["people"]), "http://localhost:4242/pms/api/people");
    }

    #[test]
    fn item_keys_are_escaped_as_one_segment() {
        let cfg = PmsApiConfig::new("http://localhost:4242").unwrap();
        assert_eq!(
            url(&cfg, &["people", "a/b?c#d"]),
            "http://localhost:4242/api/people/a%2Fb%3Fc%23d"
        );
    }

    #[test]
    fn lookup_defaults_when_vars_absent() {
        let cfg = PmsApiConfig::from_lookup(|_| None).unwrap();
        assert_eq!(cfg.base_url.as_str(), "http://pms.zaphod/");
        assert_eq!(cfg.api_root, PmsApiConfig::DEFAULT_API_ROOT);
        assert_eq!(cfg.timeout_secs, PmsApiConfig::DEFAULT_TIMEOUT_SECS);
    }

    #[test]
    fn lookup_reads_all_vars() {
        let vars = [
            ("PMS_BASE_URL", "http://localhost:4242"),
            ("PMS_API_ROOT", "/v2"),
            ("PMS_TIMEOUT_SECS", "7"),
        ];
        let cfg = PmsApiConfig::from_lookup(|name| {
            vars.iter().find(|(k, _)| *k == name).map(|(_, v)| v.to_string())
        })
        .unwrap();
        assert_eq!(url(&cfg, &["people"]), "http://localhost:4242/v2/people");
        assert_eq!(cfg.timeout_secs, 7);
    }

    #[test]
    fn lookup_rejects_bad_values() {
        let bad_url = PmsApiConfig::from_lookup(|name| {
            (name == "PMS_BASE_URL").then(|| "not a url".to_string())
        });
        assert!(matches!(bad_url, Err(ConfigError::InvalidUrl(_, _))));

        let bad_timeout = PmsApiConfig::from_lookup(|name| {
            (name == "PMS_TIMEOUT_SECS").then(|| "soon".to_string())
        });
        assert!(matches!(bad_timeout, Err(ConfigError::InvalidTimeout(_))));
    }

    #[test]
    fn new_rejects_invalid_url() {
        assert!(matches!(
            PmsApiConfig::new("::nope"),
            Err(ConfigError::InvalidUrl(_, _))
        ));
    }
}
