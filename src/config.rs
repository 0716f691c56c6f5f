//! Runtime configuration, read from the environment (and `.env`).

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::api::transport::REQUEST_TIMEOUT;

pub const DEFAULT_API_URL: &str = "http://localhost:3000/api";

const APP_DIR: &str = "pharma-inventory";
const CREDENTIALS_FILE: &str = "credentials.json";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Unknown credential store '{0}' (expected 'file' or 'keychain')")]
    UnknownBackend(String),
    #[error("Invalid API URL '{0}': must start with http:// or https://")]
    InvalidApiUrl(String),
    #[error("Could not determine a config directory; set PHARMA_CREDENTIALS_PATH")]
    NoConfigDir,
}

/// Where the token pair is persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CredentialBackend {
    #[default]
    File,
    Keychain,
}

impl FromStr for CredentialBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "file" => Ok(CredentialBackend::File),
            "keychain" => Ok(CredentialBackend::Keychain),
            other => Err(ConfigError::UnknownBackend(other.to_string())),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub api_base_url: String,
    pub request_timeout: Duration,
    pub credential_backend: CredentialBackend,
    pub credentials_path: PathBuf,
}

impl Config {
    /// Build the config from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from an arbitrary variable lookup.
    ///
    /// API URL: PHARMA_API_URL > VITE_API_URL > localhost default.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let api_base_url = var("PHARMA_API_URL")
            .or_else(|| var("VITE_API_URL"))
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());

        let credential_backend = match var("PHARMA_CREDENTIAL_STORE") {
            Some(raw) => raw.parse()?,
            None => CredentialBackend::default(),
        };

        let credentials_path = match var("PHARMA_CREDENTIALS_PATH") {
            Some(path) => PathBuf::from(path),
            None => default_credentials_path()?,
        };

        let config = Self {
            api_base_url: String::new(),
            request_timeout: REQUEST_TIMEOUT,
            credential_backend,
            credentials_path,
        };
        config.with_api_url(&api_base_url)
    }

    /// Replace the API base URL (trailing slashes dropped).
    pub fn with_api_url(mut self, url: &str) -> Result<Self, ConfigError> {
        let url = url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ConfigError::InvalidApiUrl(url.to_string()));
        }
        self.api_base_url = url.trim_end_matches('/').to_string();
        Ok(self)
    }
}

fn default_credentials_path() -> Result<PathBuf, ConfigError> {
    dirs::config_dir()
        .map(|dir| dir.join(APP_DIR).join(CREDENTIALS_FILE))
        .ok_or(ConfigError::NoConfigDir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_api_url_precedence() {
        let config = Config::from_lookup(lookup(&[
            ("PHARMA_CREDENTIALS_PATH", "/tmp/creds.json"),
        ]))
        .unwrap();
        assert_eq!(config.api_base_url, DEFAULT_API_URL);
        assert_eq!(config.request_timeout, Duration::from_millis(10_000));

        let config = Config::from_lookup(lookup(&[
            ("VITE_API_URL", "https://inventario.example.com/api/"),
            ("PHARMA_CREDENTIALS_PATH", "/tmp/creds.json"),
        ]))
        .unwrap();
        assert_eq!(config.api_base_url, "https://inventario.example.com/api");

        let config = Config::from_lookup(lookup(&[
            ("PHARMA_API_URL", "http://10.0.0.5:3000/api"),
            ("VITE_API_URL", "https://inventario.example.com/api"),
            ("PHARMA_CREDENTIALS_PATH", "/tmp/creds.json"),
        ]))
        .unwrap();
        assert_eq!(config.api_base_url, "http://10.0.0.5:3000/api");
    }

    #[test]
    fn test_credential_backend() {
        let config = Config::from_lookup(lookup(&[
            ("PHARMA_CREDENTIAL_STORE", "Keychain"),
            ("PHARMA_CREDENTIALS_PATH", "/tmp/creds.json"),
        ]))
        .unwrap();
        assert_eq!(config.credential_backend, CredentialBackend::Keychain);
        assert_eq!(config.credentials_path, PathBuf::from("/tmp/creds.json"));

        let err = Config::from_lookup(lookup(&[("PHARMA_CREDENTIAL_STORE", "vault")])).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownBackend(ref s) if s == "vault"));
    }

    #[test]
    fn test_rejects_url_without_scheme() {
        let err = Config::from_lookup(lookup(&[
            ("PHARMA_API_URL", "localhost:3000"),
            ("PHARMA_CREDENTIALS_PATH", "/tmp/creds.json"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidApiUrl(_)));
    }
}
