//! # Configuration Management
//!
//! This module handles loading and managing application configuration from multiple sources:
//! - TOML configuration files (config.toml)
//! - Environment variables (with APP_ prefix)
//! - Default values (built into the code)
//!
//! ## Key Rust Concepts Used:
//! - **Serde**: Converts between Rust structs and TOML/environment data
//! - **derive macros**: Generate Debug, Clone, Serialize, Deserialize implementations
//! - **Option<T>**: Models settings that may legitimately be absent (API key, public URL)
//!
//! ## Configuration Priority (highest to lowest):
//! 1. Platform variables (HOST, PORT, PUBLIC_URL, DEEPGRAM_API_KEY)
//! 2. Environment variables (APP_SERVER__PORT, APP_JOBS__RETENTION_SECS, etc.)
//! 3. Configuration file (config.toml)
//! 4. Default values (defined in the Default impl)

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

/// Main application configuration that contains all settings.
///
/// ## Why separate config structs:
/// Each group maps to one concern of the service: where it listens, how it
/// talks to the transcription provider, how long finished jobs are kept,
/// and how large uploads may be.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub provider: ProviderConfig,
    pub jobs: JobsConfig,
    pub upload: UploadConfig,
}

/// Server-specific configuration settings.
///
/// ## Fields:
/// - `host`: IP address or hostname to bind the server to
/// - `port`: TCP port number to listen on
/// - `public_url`: Externally reachable base URL the provider calls back to.
///   Falls back to `http://localhost:{port}`, which only works when the
///   provider can reach this machine directly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub public_url: Option<String>,
}

/// Transcription provider (Deepgram) settings.
///
/// ## Fields:
/// - `api_key`: Deepgram API key; without it uploads are refused
/// - `base_url`: API root, overridable for proxies and tests
/// - `model`, `smart_format`, `detect_language`, `diarize`, `utterances`:
///   forwarded as `listen` query parameters
/// - `request_timeout_secs`: Upper bound on the dispatch call (large uploads take a while)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub smart_format: bool,
    pub detect_language: bool,
    pub diarize: bool,
    pub utterances: bool,
    pub request_timeout_secs: u64,
}

/// Job retention settings.
///
/// ## Fields:
/// - `retention_secs`: How long a completed or failed job stays queryable
/// - `sweep_interval_secs`: How often the reclamation sweep runs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobsConfig {
    pub retention_secs: u64,
    pub sweep_interval_secs: u64,
}

/// Upload limits. Also used as the webhook body limit, since the provider
/// posts the full transcript (with word timings) back to us.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    pub max_file_size_bytes: usize,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://api.deepgram.com".to_string(),
            model: "nova-3".to_string(),
            smart_format: true,
            detect_language: true,
            diarize: true,
            utterances: true,
            request_timeout_secs: 300,
        }
    }
}

/// Provides default configuration values.
///
/// ## Why defaults matter:
/// The service starts without any configuration file. Retention and sweep
/// interval both default to one hour.
impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 3000,
                public_url: None,
            },
            provider: ProviderConfig::default(),
            jobs: JobsConfig {
                retention_secs: 60 * 60,
                sweep_interval_secs: 60 * 60,
            },
            upload: UploadConfig {
                max_file_size_bytes: 50 * 1024 * 1024, // 50MB
            },
        }
    }
}

impl AppConfig {
    /// Load configuration from multiple sources in priority order.
    ///
    /// ## Environment Variable Examples:
    /// - `APP_SERVER__PORT=8080`: Override server port
    /// - `APP_JOBS__RETENTION_SECS=600`: Keep finished jobs for ten minutes
    /// - `APP_PROVIDER__MODEL=nova-2`: Use a different Deepgram model
    /// - `PORT=3000`, `HOST=0.0.0.0`: Special cases for deployment platforms
    /// - `PUBLIC_URL=https://relay.example.com`: Callback base URL
    /// - `DEEPGRAM_API_KEY=...`: Provider credentials
    pub fn load() -> Result<Self> {
        let mut settings = config::Config::builder()
            .add_source(config::Config::try_from(&AppConfig::default())?)
            .add_source(config::File::with_name("config").required(false))
            // Double underscore keeps field names like `retention_secs` intact:
            // APP_JOBS__RETENTION_SECS -> jobs.retention_secs
            .add_source(
                config::Environment::with_prefix("APP")
                    .prefix_separator("_")
                    .separator("__"),
            );

        if let Ok(host) = env::var("HOST") {
            settings = settings.set_override("server.host", host)?;
        }

        if let Ok(port) = env::var("PORT") {
            settings = settings.set_override("server.port", port)?;
        }

        if let Ok(public_url) = env::var("PUBLIC_URL") {
            settings = settings.set_override("server.public_url", public_url)?;
        }

        if let Ok(api_key) = env::var("DEEPGRAM_API_KEY") {
            if !api_key.trim().is_empty() {
                settings = settings.set_override("provider.api_key", api_key)?;
            }
        }

        let config = settings.build()?.try_deserialize()?;
        Ok(config)
    }

    /// Validate that the configuration values make sense.
    ///
    /// ## What this checks:
    /// - Server port is not 0
    /// - Provider base URL is set
    /// - Sweep interval is greater than 0 (a zero-period timer would spin)
    /// - Upload limit is greater than 0
    ///
    /// A missing API key is deliberately not an error: the server still
    /// answers status polls and webhooks, and uploads report the problem.
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(anyhow::anyhow!("Server port cannot be 0"));
        }

        if self.provider.base_url.trim().is_empty() {
            return Err(anyhow::anyhow!("Provider base URL cannot be empty"));
        }

        if self.jobs.sweep_interval_secs == 0 {
            return Err(anyhow::anyhow!("Job sweep interval must be greater than 0"));
        }

        if self.upload.max_file_size_bytes == 0 {
            return Err(anyhow::anyhow!("Upload size limit must be greater than 0"));
        }

        Ok(())
    }

    /// URL the provider posts results to.
    pub fn callback_url(&self) -> String {
        let base = self
            .server
            .public_url
            .clone()
            .unwrap_or_else(|| format!("http://localhost:{}", self.server.port));
        format!("{}/webhook", base.trim_end_matches('/'))
    }

    pub fn retention(&self) -> Duration {
        Duration::from_secs(self.jobs.retention_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.jobs.sweep_interval_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Test that the default configuration is valid and has expected values.
    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.retention(), Duration::from_secs(3600));
        assert_eq!(config.sweep_interval(), Duration::from_secs(3600));
        assert!(config.provider.api_key.is_none());
        assert!(config.validate().is_ok());
    }

    /// Test that validation catches invalid configurations.
    #[test]
    fn test_config_validation() {
        let mut config = AppConfig::default();
        config.server.port = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.jobs.sweep_interval_secs = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.provider.base_url = " ".to_string();
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.upload.max_file_size_bytes = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_callback_url() {
        let mut config = AppConfig::default();
        assert_eq!(config.callback_url(), "http://localhost:3000/webhook");

        config.server.public_url = Some("https://relay.example.com/".to_string());
        assert_eq!(config.callback_url(), "https://relay.example.com/webhook");
    }
}
