use std::time::Duration;

use thiserror::Error;

/// Number of chunks retrieved per question unless the caller asks otherwise.
pub const DEFAULT_K: u8 = 4;
pub const MAX_K: u8 = 10;
/// Recent messages sent along with a question.
pub const HISTORY_WINDOW: usize = 4;
pub const CHUNK_SIZE: u32 = 1000;
pub const CHUNK_OVERLAP: u32 = 200;

pub const DEFAULT_API_URL: &str = "http://localhost:8000";
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

pub const API_URL_VAR: &str = "RAGBOT_API_URL";
pub const CONNECT_TIMEOUT_VAR: &str = "RAGBOT_CONNECT_TIMEOUT_SECS";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var} must be an http(s) URL, got `{value}`")]
    InvalidUrl { var: &'static str, value: String },
    #[error("{var} must be a positive number of seconds, got `{value}`")]
    InvalidTimeout { var: &'static str, value: String },
}

/// Clamps a requested retrieval depth into the range the backend accepts.
pub fn clamp_k(k: u8) -> u8 {
    k.clamp(1, MAX_K)
}

/// Where the FastAPI backend lives and how patiently to connect to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendConfig {
    pub api_url: String,
    pub connect_timeout: Duration,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
        }
    }
}

impl BackendConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let api_url = match lookup(API_URL_VAR).filter(|v| !v.trim().is_empty()) {
            Some(value) => {
                let trimmed = value.trim().trim_end_matches('/');
                if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
                    return Err(ConfigError::InvalidUrl {
                        var: API_URL_VAR,
                        value,
                    });
                }
                trimmed.to_string()
            }
            None => DEFAULT_API_URL.to_string(),
        };

        let connect_timeout = match lookup(CONNECT_TIMEOUT_VAR) {
            Some(value) => match value.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => Duration::from_secs(secs),
                _ => {
                    return Err(ConfigError::InvalidTimeout {
                        var: CONNECT_TIMEOUT_VAR,
                        value,
                    })
                }
            },
            None => Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
        };

        Ok(Self {
            api_url,
            connect_timeout,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_unset() {
        let config = BackendConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, BackendConfig::default());
    }

    #[test]
    fn reads_and_normalizes_values() {
        let config = BackendConfig::from_lookup(lookup(&[
            (API_URL_VAR, " https://rag.example.com/ "),
            (CONNECT_TIMEOUT_VAR, "3"),
        ]))
        .unwrap();
        assert_eq!(config.api_url, "https://rag.example.com");
        assert_eq!(config.connect_timeout, Duration::from_secs(3));
    }

    #[test]
    fn rejects_bad_values() {
        assert!(matches!(
            BackendConfig::from_lookup(lookup(&[(API_URL_VAR, "localhost:8000")])),
            Err(ConfigError::InvalidUrl { .. })
        ));
        assert!(matches!(
            BackendConfig::from_lookup(lookup(&[(CONNECT_TIMEOUT_VAR, "0")])),
            Err(ConfigError::InvalidTimeout { .. })
        ));
        assert!(matches!(
            BackendConfig::from_lookup(lookup(&[(CONNECT_TIMEOUT_VAR, "soon")])),
            Err(ConfigError::InvalidTimeout { .. })
        ));
    }

    #[test]
    fn k_is_clamped() {
        assert_eq!(clamp_k(0), 1);
        assert_eq!(clamp_k(DEFAULT_K), 4);
        assert_eq!(clamp_k(50), MAX_K);
    }
}
