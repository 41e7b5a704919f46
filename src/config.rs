use crate::error::ConfigError;
use crate::logger;
use chrono::{DateTime, Utc};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "http://localhost:8080/api";
pub const DEFAULT_TIMEOUT_SECS: u64 = 15;

#[derive(Debug, Clone)]
pub struct Config {
    pub api_url: String,
    pub token: Option<String>,
    pub user_id: Option<String>,
    pub username: Option<String>,
    pub token_expires_at: Option<DateTime<Utc>>,
    pub request_timeout: Duration,
    pub data_dir: PathBuf,
    /// Quiz to open directly instead of showing the menu.
    pub initial_quiz_id: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok(), std::env::args().nth(1))
    }

    /// Builds the config from any key lookup, so tests don't touch the process env.
    pub fn from_lookup<F>(lookup: F, initial_quiz_id: Option<String>) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let api_url = var("HACKQUIZ_API_URL")
            .unwrap_or_else(|| {
                logger::log(&format!(
                    "HACKQUIZ_API_URL not set, using default: {}",
                    DEFAULT_API_URL
                ));
                DEFAULT_API_URL.to_string()
            })
            .trim_end_matches('/')
            .to_string();

        let token_expires_at = match var("HACKQUIZ_TOKEN_EXPIRES_AT") {
            Some(raw) => Some(
                DateTime::parse_from_rfc3339(&raw)
                    .map_err(|e| ConfigError::InvalidValue {
                        key: "HACKQUIZ_TOKEN_EXPIRES_AT",
                        message: e.to_string(),
                    })?
                    .with_timezone(&Utc),
            ),
            None => None,
        };

        let timeout_secs = match var("HACKQUIZ_TIMEOUT_SECS") {
            Some(raw) => raw.parse::<u64>().map_err(|e| ConfigError::InvalidValue {
                key: "HACKQUIZ_TIMEOUT_SECS",
                message: e.to_string(),
            })?,
            None => DEFAULT_TIMEOUT_SECS,
        };

        let data_dir = var("HACKQUIZ_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| default_data_dir(&lookup));

        Ok(Self {
            api_url,
            token: var("HACKQUIZ_TOKEN"),
            user_id: var("HACKQUIZ_USER_ID"),
            username: var("HACKQUIZ_USERNAME"),
            token_expires_at,
            request_timeout: Duration::from_secs(timeout_secs),
            data_dir,
            initial_quiz_id: initial_quiz_id.filter(|id| !id.trim().is_empty()),
        })
    }
}

fn default_data_dir<F>(lookup: &F) -> PathBuf
where
    F: Fn(&str) -> Option<String>,
{
    if cfg!(target_os = "windows") {
        let home = lookup("USERPROFILE").unwrap_or_else(|| "C:\\Users\\User".to_string());
        PathBuf::from(home).join(".local\\share\\hackquiz")
    } else {
        let home = lookup("HOME").unwrap_or_else(|| "/home/user".to_string());
        PathBuf::from(home).join(".local/share/hackquiz")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup_from(&[("HOME", "/tmp/home")]), None).unwrap();
        assert_eq!(config.api_url, DEFAULT_API_URL);
        assert_eq!(config.request_timeout, Duration::from_secs(15));
        assert!(config.token.is_none());
        assert!(config.initial_quiz_id.is_none());
        if !cfg!(target_os = "windows") {
            assert_eq!(
                config.data_dir,
                PathBuf::from("/tmp/home/.local/share/hackquiz")
            );
        }
    }

    #[test]
    fn test_reads_identity_and_trims_url() {
        let config = Config::from_lookup(
            lookup_from(&[
                ("HACKQUIZ_API_URL", "https://quiz.example.org/api/"),
                ("HACKQUIZ_TOKEN", "tok"),
                ("HACKQUIZ_USER_ID", "u-1"),
                ("HACKQUIZ_TOKEN_EXPIRES_AT", "2030-01-01T00:00:00Z"),
                ("HACKQUIZ_TIMEOUT_SECS", "3"),
            ]),
            Some("quiz-7".to_string()),
        )
        .unwrap();
        assert_eq!(config.api_url, "https://quiz.example.org/api");
        assert_eq!(config.token.as_deref(), Some("tok"));
        assert_eq!(config.user_id.as_deref(), Some("u-1"));
        assert!(config.token_expires_at.is_some());
        assert_eq!(config.request_timeout, Duration::from_secs(3));
        assert_eq!(config.initial_quiz_id.as_deref(), Some("quiz-7"));
    }

    #[test]
    fn test_blank_values_are_unset() {
        let config =
            Config::from_lookup(lookup_from(&[("HACKQUIZ_TOKEN", "   ")]), Some(" ".to_string()))
                .unwrap();
        assert!(config.token.is_none());
        assert!(config.initial_quiz_id.is_none());
    }

    #[test]
    fn test_invalid_timeout_is_rejected() {
        let err = Config::from_lookup(lookup_from(&[("HACKQUIZ_TIMEOUT_SECS", "soon")]), None)
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue {
                key: "HACKQUIZ_TIMEOUT_SECS",
                ..
            }
        ));
    }

    #[test]
    fn test_invalid_expiry_is_rejected() {
        let err =
            Config::from_lookup(lookup_from(&[("HACKQUIZ_TOKEN_EXPIRES_AT", "tomorrow")]), None)
                .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }
}
