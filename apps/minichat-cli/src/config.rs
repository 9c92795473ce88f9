//! Environment-backed runtime configuration for the `minichat` terminal client.

use std::{env, path::PathBuf, time::Duration};

use minichat_core::SyncConfig;
use thiserror::Error;
use url::Url;

const DEFAULT_API_BASE_URL: &str = "http://localhost:4001";
const DEFAULT_DATA_DIR: &str = "./.minichat";
const DEFAULT_VIEWPORT_LINES: usize = 20;
const MAX_PAGE_SIZE: u16 = 100;

/// Runtime configuration used by the terminal client.
#[derive(Debug, Clone, PartialEq)]
pub struct CliConfig {
    /// Backend origin; requests go to `{api_base_url}/api/...`.
    pub api_base_url: Url,
    /// Polling, paging and typing tuning forwarded to the session.
    pub sync: SyncConfig,
    /// Optional per-request HTTP timeout.
    pub request_timeout: Option<Duration>,
    /// Directory holding the persisted acting-user identity.
    pub data_dir: PathBuf,
    /// Transcript lines shown at once.
    pub viewport_lines: usize,
}

impl CliConfig {
    /// Parse configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup<F>(mut lookup: F) -> Result<Self, ConfigError>
    where
        F: FnMut(&str) -> Option<String>,
    {
        let raw_base_url = optional_trimmed_env("MINICHAT_API_BASE_URL", &mut lookup)
            .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_owned());
        let api_base_url = Url::parse(&raw_base_url).map_err(|err| ConfigError::InvalidValue {
            key: "MINICHAT_API_BASE_URL",
            value: raw_base_url.clone(),
            reason: err.to_string(),
        })?;

        let defaults = SyncConfig::default();
        let polling_interval_ms = parse_with_default(
            "MINICHAT_POLLING_INTERVAL_MS",
            defaults.polling_interval_ms,
            &mut lookup,
        )?;
        let conversation_page_size = parse_with_default(
            "MINICHAT_CONVERSATION_PAGE_SIZE",
            defaults.conversation_page_size,
            &mut lookup,
        )?;
        let message_page_size = parse_with_default(
            "MINICHAT_MESSAGE_PAGE_SIZE",
            defaults.message_page_size,
            &mut lookup,
        )?;
        let typing_idle_timeout_ms = parse_with_default(
            "MINICHAT_TYPING_IDLE_MS",
            defaults.typing_idle_timeout_ms,
            &mut lookup,
        )?;
        let request_timeout_ms =
            parse_optional::<u64, _>("MINICHAT_REQUEST_TIMEOUT_MS", &mut lookup)?;
        let data_dir = optional_trimmed_env("MINICHAT_DATA_DIR", &mut lookup)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR));
        let viewport_lines = parse_with_default(
            "MINICHAT_VIEWPORT_LINES",
            DEFAULT_VIEWPORT_LINES,
            &mut lookup,
        )?;

        if polling_interval_ms == 0 {
            return Err(ConfigError::at_least_one("MINICHAT_POLLING_INTERVAL_MS"));
        }
        for (key, size) in [
            ("MINICHAT_CONVERSATION_PAGE_SIZE", conversation_page_size),
            ("MINICHAT_MESSAGE_PAGE_SIZE", message_page_size),
        ] {
            if size == 0 || size > MAX_PAGE_SIZE {
                return Err(ConfigError::InvalidValue {
                    key,
                    value: size.to_string(),
                    reason: format!("must be between 1 and {MAX_PAGE_SIZE}"),
                });
            }
        }
        if request_timeout_ms == Some(0) {
            return Err(ConfigError::at_least_one("MINICHAT_REQUEST_TIMEOUT_MS"));
        }
        if viewport_lines == 0 {
            return Err(ConfigError::at_least_one("MINICHAT_VIEWPORT_LINES"));
        }

        Ok(Self {
            api_base_url,
            sync: SyncConfig {
                polling_interval_ms,
                conversation_page_size,
                message_page_size,
                typing_idle_timeout_ms,
            },
            request_timeout: request_timeout_ms.map(Duration::from_millis),
            data_dir,
            viewport_lines,
        })
    }
}

/// Errors produced while parsing runtime configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// An environment variable could not be parsed or is out of range.
    #[error("invalid {key}='{value}': {reason}")]
    InvalidValue {
        key: &'static str,
        value: String,
        reason: String,
    },
}

impl ConfigError {
    fn at_least_one(key: &'static str) -> Self {
        Self::InvalidValue {
            key,
            value: "0".to_owned(),
            reason: "must be at least 1".to_owned(),
        }
    }
}

fn optional_trimmed_env<F>(key: &'static str, lookup: &mut F) -> Option<String>
where
    F: FnMut(&str) -> Option<String>,
{
    lookup(key)
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
}

fn parse_optional<T, F>(key: &'static str, lookup: &mut F) -> Result<Option<T>, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
    F: FnMut(&str) -> Option<String>,
{
    let Some(value) = optional_trimmed_env(key, lookup) else {
        return Ok(None);
    };
    value
        .parse::<T>()
        .map(Some)
        .map_err(|err| ConfigError::InvalidValue {
            key,
            value,
            reason: err.to_string(),
        })
}

fn parse_with_default<T, F>(key: &'static str, default: T, lookup: &mut F) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
    F: FnMut(&str) -> Option<String>,
{
    Ok(parse_optional(key, lookup)?.unwrap_or(default))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from_pairs(pairs: &[(&str, &str)]) -> Result<CliConfig, ConfigError> {
        let map = pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect::<HashMap<_, _>>();
        CliConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn defaults_match_backend_and_ui_conventions() {
        let cfg = config_from_pairs(&[]).expect("config should parse");

        assert_eq!(cfg.api_base_url.as_str(), "http://localhost:4001/");
        assert_eq!(cfg.sync, SyncConfig::default());
        assert_eq!(cfg.request_timeout, None);
        assert_eq!(cfg.data_dir, PathBuf::from(DEFAULT_DATA_DIR));
        assert_eq!(cfg.viewport_lines, DEFAULT_VIEWPORT_LINES);
    }

    #[test]
    fn parses_overrides() {
        let cfg = config_from_pairs(&[
            ("MINICHAT_API_BASE_URL", " https://chat.example.org "),
            ("MINICHAT_POLLING_INTERVAL_MS", "5000"),
            ("MINICHAT_CONVERSATION_PAGE_SIZE", "50"),
            ("MINICHAT_MESSAGE_PAGE_SIZE", "100"),
            ("MINICHAT_TYPING_IDLE_MS", "1500"),
            ("MINICHAT_REQUEST_TIMEOUT_MS", "8000"),
            ("MINICHAT_DATA_DIR", "/tmp/minichat"),
            ("MINICHAT_VIEWPORT_LINES", "12"),
        ])
        .expect("config should parse");

        assert_eq!(cfg.api_base_url.host_str(), Some("chat.example.org"));
        assert_eq!(cfg.sync.polling_interval_ms, 5_000);
        assert_eq!(cfg.sync.conversation_page_size, 50);
        assert_eq!(cfg.sync.message_page_size, 100);
        assert_eq!(cfg.sync.typing_idle_timeout_ms, 1_500);
        assert_eq!(cfg.request_timeout, Some(Duration::from_secs(8)));
        assert_eq!(cfg.data_dir, PathBuf::from("/tmp/minichat"));
        assert_eq!(cfg.viewport_lines, 12);
    }

    #[test]
    fn rejects_invalid_numeric_values() {
        let err = config_from_pairs(&[("MINICHAT_POLLING_INTERVAL_MS", "soon")])
            .expect_err("invalid polling value should fail");

        assert!(matches!(
            err,
            ConfigError::InvalidValue {
                key: "MINICHAT_POLLING_INTERVAL_MS",
                ..
            }
        ));
    }

    #[test]
    fn rejects_out_of_range_values() {
        for (key, value) in [
            ("MINICHAT_POLLING_INTERVAL_MS", "0"),
            ("MINICHAT_MESSAGE_PAGE_SIZE", "0"),
            ("MINICHAT_CONVERSATION_PAGE_SIZE", "101"),
            ("MINICHAT_REQUEST_TIMEOUT_MS", "0"),
            ("MINICHAT_VIEWPORT_LINES", "0"),
        ] {
            let err = config_from_pairs(&[(key, value)]).expect_err("value should be rejected");
            let ConfigError::InvalidValue { key: got, .. } = err;
            assert_eq!(got, key);
        }
    }

    #[test]
    fn rejects_unparseable_base_url() {
        let err = config_from_pairs(&[("MINICHAT_API_BASE_URL", "not a url")])
            .expect_err("bad url should fail");
        assert_eq!(
            err.to_string().split(':').next(),
            Some("invalid MINICHAT_API_BASE_URL='not a url'")
        );
    }
}
