use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

pub const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1";
pub const DEFAULT_MODEL: &str = "anthropic/claude-3.5-sonnet";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {key}")]
    InvalidValue { key: &'static str, value: String },
}

/// Upstream credential. Never printed in cleartext.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(**********)")
    }
}

impl fmt::Display for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("**********")
    }
}

/// Process-wide settings, loaded once at startup and shared read-only.
#[derive(Debug, Clone)]
pub struct Settings {
    pub openrouter_api_key: Option<ApiKey>,
    pub openrouter_base_url: String,
    pub default_model: String,

    pub host: String,
    pub port: u16,
    pub environment: String,
    pub debug: bool,
    pub upstream_timeout: Duration,

    // Reserved for multi-agent routing; nothing reads these yet.
    pub router_model: String,
    pub logic_model: String,
    pub human_interface_model: String,
    pub postgres_url: Option<String>,
    pub openai_api_key: Option<ApiKey>,
    pub ollama_base_url: Option<String>,
    pub searxng_url: Option<String>,
    pub secret_key: Option<ApiKey>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            openrouter_api_key: None,
            openrouter_base_url: DEFAULT_BASE_URL.to_string(),
            default_model: DEFAULT_MODEL.to_string(),
            host: "0.0.0.0".to_string(),
            port: 8000,
            environment: "development".to_string(),
            debug: true,
            upstream_timeout: Duration::from_secs(120),
            router_model: "deepseek/deepseek-chat".to_string(),
            logic_model: DEFAULT_MODEL.to_string(),
            human_interface_model: DEFAULT_MODEL.to_string(),
            postgres_url: None,
            openai_api_key: None,
            ollama_base_url: None,
            searxng_url: None,
            secret_key: None,
        }
    }
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds settings from an arbitrary key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        Ok(Self {
            openrouter_api_key: get("OPENROUTER_API_KEY").map(ApiKey::new),
            openrouter_base_url: get("OPENROUTER_BASE_URL").unwrap_or(defaults.openrouter_base_url),
            default_model: get("DEFAULT_MODEL").unwrap_or(defaults.default_model),
            host: get("HOST").unwrap_or(defaults.host),
            port: parse_or("PORT", get("PORT"), defaults.port)?,
            environment: get("ENVIRONMENT").unwrap_or(defaults.environment),
            debug: parse_bool("DEBUG", get("DEBUG"), defaults.debug)?,
            upstream_timeout: parse_or("UPSTREAM_TIMEOUT_SECS", get("UPSTREAM_TIMEOUT_SECS"), 120u64)
                .map(Duration::from_secs)?,
            router_model: get("ROUTER_MODEL").unwrap_or(defaults.router_model),
            logic_model: get("LOGIC_MODEL").unwrap_or(defaults.logic_model),
            human_interface_model: get("HUMAN_INTERFACE_MODEL")
                .unwrap_or(defaults.human_interface_model),
            postgres_url: get("POSTGRES_URL"),
            openai_api_key: get("OPENAI_API_KEY").map(ApiKey::new),
            ollama_base_url: get("OLLAMA_BASE_URL"),
            searxng_url: get("SEARXNG_URL"),
            secret_key: get("SECRET_KEY").map(ApiKey::new),
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Fallback log filter when `RUST_LOG` is unset. A failed load still gets one,
/// so the error itself can be logged.
pub fn default_log_filter(settings: Result<&Settings, &ConfigError>) -> &'static str {
    match settings {
        Ok(settings) if settings.debug => "debug",
        _ => "info",
    }
}

fn parse_or<T: FromStr>(key: &'static str, raw: Option<String>, default: T) -> Result<T, ConfigError> {
    match raw {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue { key, value }),
        None => Ok(default),
    }
}

fn parse_bool(key: &'static str, raw: Option<String>, default: bool) -> Result<bool, ConfigError> {
    let Some(value) = raw else {
        return Ok(default);
    };
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "t" | "yes" | "y" | "on" => Ok(true),
        "0" | "false" | "f" | "no" | "n" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue { key, value }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn settings_from(pairs: &[(&str, &str)]) -> Result<Settings, ConfigError> {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Settings::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_environment_is_empty() {
        let settings = settings_from(&[]).unwrap();
        assert!(settings.openrouter_api_key.is_none());
        assert_eq!(settings.openrouter_base_url, DEFAULT_BASE_URL);
        assert_eq!(settings.default_model, DEFAULT_MODEL);
        assert_eq!(settings.bind_addr(), "0.0.0.0:8000");
        assert!(settings.debug);
        assert_eq!(settings.upstream_timeout, Duration::from_secs(120));
    }

    #[test]
    fn overrides_are_read() {
        let settings = settings_from(&[
            ("OPENROUTER_API_KEY", "test-key-123"),
            ("DEFAULT_MODEL", "deepseek/deepseek-v3.1-terminus"),
            ("PORT", "9001"),
            ("DEBUG", "false"),
            ("UPSTREAM_TIMEOUT_SECS", "5"),
        ])
        .unwrap();
        assert_eq!(
            settings.openrouter_api_key.as_ref().map(ApiKey::expose),
            Some("test-key-123")
        );
        assert_eq!(settings.default_model, "deepseek/deepseek-v3.1-terminus");
        assert_eq!(settings.port, 9001);
        assert!(!settings.debug);
        assert_eq!(settings.upstream_timeout, Duration::from_secs(5));
    }

    #[test]
    fn blank_credential_counts_as_missing() {
        let settings = settings_from(&[("OPENROUTER_API_KEY", "  ")]).unwrap();
        assert!(settings.openrouter_api_key.is_none());
    }

    #[test]
    fn bad_port_is_reported_with_its_key() {
        let err = settings_from(&[("PORT", "eighty")]).unwrap_err();
        assert_eq!(err.to_string(), "invalid value \"eighty\" for PORT");
    }

    #[test]
    fn boolean_spellings() {
        for raw in ["1", "true", "T", "yes", "Y", "on"] {
            assert!(settings_from(&[("DEBUG", raw)]).unwrap().debug, "{raw}");
        }
        for raw in ["0", "FALSE", "f", "no", "n", "off"] {
            assert!(!settings_from(&[("DEBUG", raw)]).unwrap().debug, "{raw}");
        }
    }

    #[test]
    fn bad_boolean_is_reported_with_its_key() {
        let err = settings_from(&[("DEBUG", "maybe")]).unwrap_err();
        assert_eq!(err.to_string(), "invalid value \"maybe\" for DEBUG");
    }

    #[test]
    fn log_filter_survives_a_failed_load() {
        let failed = settings_from(&[("PORT", "eighty")]);
        assert_eq!(default_log_filter(failed.as_ref()), "info");

        let quiet = settings_from(&[("DEBUG", "no")]);
        assert_eq!(default_log_filter(quiet.as_ref()), "info");

        let verbose = settings_from(&[]);
        assert_eq!(default_log_filter(verbose.as_ref()), "debug");
    }

    #[test]
    fn credential_is_redacted_in_debug_output() {
        let settings = settings_from(&[("OPENROUTER_API_KEY", "sk-or-secret")]).unwrap();
        let printed = format!("{settings:?}");
        assert!(!printed.contains("sk-or-secret"));
        assert!(printed.contains("**********"));
    }
}
