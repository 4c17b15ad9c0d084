// src/config.rs
use crate::errors::StudioError;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash-image-preview";

/// Process-wide settings. Built once in `main` and handed to the services;
/// nothing re-reads the environment afterwards.
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub upload_dir: PathBuf,
    pub public_base_url: String,
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    pub apply_delay: Duration,
    pub max_body_bytes: usize,
    pub strict_results: bool,
    pub result_capacity: usize,
}

impl Config {
    /// Loads `.env` if one exists, then reads the process environment.
    pub fn from_env() -> Result<Self, StudioError> {
        if let Err(e) = dotenvy::dotenv() {
            if !e.not_found() {
                log::warn!("Ignoring unreadable .env file: {}", e);
            }
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, StudioError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let port: u16 = parse_or(get("PORT"), "PORT", 8080)?;
        let public_base_url = get("PUBLIC_BASE_URL")
            .unwrap_or_else(|| format!("http://localhost:{}", port))
            .trim_end_matches('/')
            .to_string();

        Ok(Self {
            host: get("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port,
            upload_dir: PathBuf::from(get("UPLOAD_DIR").unwrap_or_else(|| "uploads".to_string())),
            public_base_url,
            gemini_api_key: get("GEMINI_API_KEY"),
            gemini_model: get("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string()),
            apply_delay: Duration::from_millis(parse_or(get("APPLY_DELAY_MS"), "APPLY_DELAY_MS", 3000)?),
            max_body_bytes: parse_or(get("MAX_BODY_BYTES"), "MAX_BODY_BYTES", 10 * 1024 * 1024)?,
            strict_results: parse_bool(get("STRICT_RESULTS"), "STRICT_RESULTS")?,
            result_capacity: parse_or(get("RESULT_CAPACITY"), "RESULT_CAPACITY", 1000)?,
        })
    }

    pub fn bind_address(&self) -> (String, u16) {
        (self.host.clone(), self.port)
    }
}

fn parse_or<T: FromStr>(raw: Option<String>, key: &str, default: T) -> Result<T, StudioError> {
    match raw {
        None => Ok(default),
        Some(v) => v
            .parse()
            .map_err(|_| StudioError::Config(format!("{} has an invalid value: {:?}", key, v))),
    }
}

fn parse_bool(raw: Option<String>, key: &str) -> Result<bool, StudioError> {
    match raw.as_deref().map(str::to_ascii_lowercase).as_deref() {
        None | Some("0") | Some("false") | Some("no") => Ok(false),
        Some("1") | Some("true") | Some("yes") => Ok(true),
        Some(other) => Err(StudioError::Config(format!(
            "{} must be a boolean, got {:?}",
            key, other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<Config, StudioError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_select_mock_mode() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.upload_dir, PathBuf::from("uploads"));
        assert_eq!(config.public_base_url, "http://localhost:8080");
        assert_eq!(config.apply_delay, Duration::from_millis(3000));
        assert_eq!(config.gemini_model, DEFAULT_GEMINI_MODEL);
        assert!(config.gemini_api_key.is_none());
        assert!(!config.strict_results);
        assert_eq!(config.result_capacity, 1000);
    }

    #[test]
    fn blank_credential_counts_as_absent() {
        let config = config_from(&[("GEMINI_API_KEY", "   ")]).unwrap();
        assert!(config.gemini_api_key.is_none());
    }

    #[test]
    fn overrides_are_applied() {
        let config = config_from(&[
            ("PORT", "9000"),
            ("PUBLIC_BASE_URL", "https://studio.example.com/"),
            ("APPLY_DELAY_MS", "0"),
            ("STRICT_RESULTS", "true"),
            ("RESULT_CAPACITY", "5"),
            ("GEMINI_API_KEY", "secret"),
        ])
        .unwrap();
        assert_eq!(config.port, 9000);
        assert_eq!(config.public_base_url, "https://studio.example.com");
        assert_eq!(config.apply_delay, Duration::ZERO);
        assert!(config.strict_results);
        assert_eq!(config.result_capacity, 5);
        assert_eq!(config.gemini_api_key.as_deref(), Some("secret"));
    }

    #[test]
    fn invalid_numbers_are_rejected() {
        let err = config_from(&[("PORT", "eighty")]).unwrap_err();
        assert!(matches!(err, StudioError::Config(_)));
        let err = config_from(&[("STRICT_RESULTS", "maybe")]).unwrap_err();
        assert!(matches!(err, StudioError::Config(_)));
    }
}
