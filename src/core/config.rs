//! Configuration management for the gateway.
//!
//! All settings are sourced from environment variables at startup, with a
//! `.env` file loaded first when present.

use anyhow::{Context, Result};

/// Application settings loaded from the environment.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Postgres connection string
    pub database_url: String,

    /// Upstream provider credentials. Optional: an unconfigured provider
    /// fails its attempts instead of preventing startup.
    pub openai_api_key: Option<String>,
    pub deepseek_api_key: Option<String>,
    pub huggingface_api_key: Option<String>,

    /// Application secret (never logged)
    pub secret_key: String,

    /// Log level filter (default: INFO)
    pub log_level: String,

    /// Deployment environment name (default: dev)
    pub environment: String,

    /// Per-attempt provider deadline in seconds (default: 30)
    pub provider_timeout_secs: u64,

    /// HTTP bind port (default: 8000)
    pub port: u16,
}

fn default_log_level() -> String {
    "INFO".to_string()
}

fn default_environment() -> String {
    "dev".to_string()
}

fn default_provider_timeout_secs() -> u64 {
    30
}

fn default_port() -> u16 {
    8000
}

impl Settings {
    /// Load settings from the environment.
    ///
    /// `DATABASE_URL` is required; everything else has a default or is
    /// optional.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let database_url = std::env::var("DATABASE_URL")
            .context("DATABASE_URL environment variable is required")?;

        let provider_timeout_secs = match std::env::var("PROVIDER_TIMEOUT") {
            Ok(raw) => raw
                .trim()
                .parse::<u64>()
                .with_context(|| format!("invalid PROVIDER_TIMEOUT: {raw:?}"))?,
            Err(_) => default_provider_timeout_secs(),
        };

        let port = match std::env::var("PORT") {
            Ok(raw) => raw
                .trim()
                .parse::<u16>()
                .with_context(|| format!("invalid PORT: {raw:?}"))?,
            Err(_) => default_port(),
        };

        Ok(Self {
            database_url,
            openai_api_key: non_empty_var("OPENAI_API_KEY"),
            deepseek_api_key: non_empty_var("DEEPSEEK_API_KEY"),
            huggingface_api_key: non_empty_var("HUGGINGFACE_API_KEY"),
            secret_key: std::env::var("SECRET_KEY")
                .unwrap_or_else(|_| "change-me-in-production".to_string()),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| default_log_level()),
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| default_environment()),
            provider_timeout_secs,
            port,
        })
    }

    /// Per-attempt provider deadline as a `Duration`.
    pub fn provider_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.provider_timeout_secs)
    }
}

/// Read an environment variable, treating empty/whitespace values as unset.
fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings_with_timeout(secs: u64) -> Settings {
        Settings {
            database_url: "postgresql://localhost/llm_gateway".to_string(),
            openai_api_key: None,
            deepseek_api_key: None,
            huggingface_api_key: None,
            secret_key: "test-secret".to_string(),
            log_level: default_log_level(),
            environment: default_environment(),
            provider_timeout_secs: secs,
            port: default_port(),
        }
    }

    #[test]
    fn test_defaults() {
        assert_eq!(default_log_level(), "INFO");
        assert_eq!(default_environment(), "dev");
        assert_eq!(default_provider_timeout_secs(), 30);
        assert_eq!(default_port(), 8000);
    }

    #[test]
    fn test_provider_timeout_duration() {
        let settings = settings_with_timeout(12);
        assert_eq!(
            settings.provider_timeout(),
            std::time::Duration::from_secs(12)
        );
    }
}
