//! Client configuration from the environment.

use std::path::PathBuf;
use std::time::Duration;

use reqwest::Url;

pub const INSTALLATION_URL_VAR: &str = "SHEETSYNC_INSTALLATION_URL";
pub const SERVICE_URL_VAR: &str = "SHEETSYNC_SERVICE_URL";
pub const AUTH_TOKEN_VAR: &str = "SHEETSYNC_AUTH_TOKEN";
pub const CACHE_PATH_VAR: &str = "SHEETSYNC_CACHE_PATH";
pub const HTTP_TIMEOUT_VAR: &str = "SHEETSYNC_HTTP_TIMEOUT_SECS";

pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} is not set")]
    Missing(&'static str),

    #[error("{var} is not a valid URL: {reason}")]
    InvalidUrl { var: &'static str, reason: String },

    #[error("{var} must be a positive whole number of seconds, got {value:?}")]
    InvalidTimeout { var: &'static str, value: String },

    #[error("could not resolve a default cache path: {0}")]
    CachePath(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub installation_url: Option<Url>,
    pub service_url: Option<Url>,
    pub auth_token: Option<String>,
    pub cache_path: PathBuf,
    pub http_timeout: Duration,
}

impl ClientConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build from an arbitrary variable source. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |var: &str| {
            lookup(var)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let url = |var: &'static str| -> Result<Option<Url>, ConfigError> {
            get(var)
                .map(|raw| {
                    Url::parse(&raw).map_err(|e| ConfigError::InvalidUrl {
                        var,
                        reason: e.to_string(),
                    })
                })
                .transpose()
        };

        let http_timeout = match get(HTTP_TIMEOUT_VAR) {
            None => DEFAULT_HTTP_TIMEOUT,
            Some(raw) => match raw.parse::<u64>() {
                Ok(secs) if secs > 0 => Duration::from_secs(secs),
                _ => {
                    return Err(ConfigError::InvalidTimeout {
                        var: HTTP_TIMEOUT_VAR,
                        value: raw,
                    });
                }
            },
        };

        let cache_path = match get(CACHE_PATH_VAR) {
            Some(path) => PathBuf::from(path),
            None => crate::cache::default_cache_path()
                .map_err(|e| ConfigError::CachePath(format!("{e:#}")))?,
        };

        Ok(Self {
            installation_url: url(INSTALLATION_URL_VAR)?,
            service_url: url(SERVICE_URL_VAR)?,
            auth_token: get(AUTH_TOKEN_VAR),
            cache_path,
            http_timeout,
        })
    }

    pub fn installation_url(&self) -> Result<&Url, ConfigError> {
        self.installation_url
            .as_ref()
            .ok_or(ConfigError::Missing(INSTALLATION_URL_VAR))
    }

    pub fn service_url(&self) -> Result<&Url, ConfigError> {
        self.service_url
            .as_ref()
            .ok_or(ConfigError::Missing(SERVICE_URL_VAR))
    }
}
