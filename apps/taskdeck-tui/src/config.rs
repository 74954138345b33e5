//! Configuration for the taskdeck front end
//!
//! Values are layered, later sources winning:
//! - built-in defaults
//! - `taskdeck.toml` (path from `TASKDECK_CONFIG_FILE`, else the user config dir)
//! - environment variables with the `TASKDECK` prefix, e.g. `TASKDECK__API__BASE_URL`
//! - the plain `API_BASE_URL` and `RUST_LOG` variables

use anyhow::{Context, Result};
use config::{Config as ConfigBuilder, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use taskdeck_client::DEFAULT_BASE_URL;
use taskdeck_session::FileSessionBackend;
use tracing::{debug, info};

const APP_DIR: &str = "taskdeck";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api: ApiConfig,
    pub session: SessionConfig,
    pub logging: LoggingConfig,

    /// Layers applied on top of the defaults, in order
    #[serde(skip)]
    sources: Vec<String>,
}

/// Backend connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL every endpoint path is appended to
    pub base_url: String,

    /// Per-request timeout in seconds. Unset means the transport default.
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Where the session token is persisted (default: `<config dir>/taskdeck/session.json`)
    pub file: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error) or a full filter directive
    pub level: String,

    /// Log file used while the terminal UI owns the screen
    pub file: Option<PathBuf>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: None,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}

fn app_dir() -> Result<PathBuf> {
    let dir = dirs::config_dir().context("Failed to get config directory")?;
    Ok(dir.join(APP_DIR))
}

impl Config {
    /// Load configuration from the config file, the environment and the
    /// direct overrides, then validate it.
    pub fn load() -> Result<Self> {
        let config_path = match std::env::var("TASKDECK_CONFIG_FILE") {
            Ok(path) => Some(PathBuf::from(path)),
            Err(_) => app_dir().ok().map(|dir| dir.join("taskdeck.toml")),
        };

        let mut settings = Self::from_sources(config_path.as_deref())?;
        settings.apply_env_overrides();
        settings.validate()?;

        Ok(settings)
    }

    /// Config file (when present) plus `TASKDECK__*` variables, without the
    /// direct overrides or validation.
    pub fn from_sources(config_path: Option<&Path>) -> Result<Self> {
        let mut builder = ConfigBuilder::builder();

        match config_path {
            Some(path) if path.exists() => builder = builder.add_source(File::from(path)),
            _ => {}
        }

        builder = builder.add_source(
            Environment::with_prefix("TASKDECK")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build().context("Failed to build configuration")?;

        let mut settings: Self = config
            .try_deserialize()
            .context("Failed to deserialize configuration")?;
        if let Some(path) = config_path.filter(|path| path.exists()) {
            settings.sources.push(format!("file {}", path.display()));
        }
        Ok(settings)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(base_url) = std::env::var("API_BASE_URL") {
            self.sources.push("API_BASE_URL environment variable".to_string());
            self.api.base_url = base_url;
        }

        if let Ok(log_level) = std::env::var("RUST_LOG") {
            self.sources.push("RUST_LOG environment variable".to_string());
            self.logging.level = log_level;
        }
    }

    /// Point at a different backend, as the `--api-url` flag does.
    pub fn override_base_url(&mut self, base_url: impl Into<String>) -> Result<()> {
        self.api.base_url = base_url.into();
        self.sources.push("--api-url flag".to_string());
        self.validate()
    }

    pub fn sources(&self) -> &[String] {
        &self.sources
    }

    /// Report where the configuration came from. Call once logging is set up.
    pub fn log_sources(&self) {
        if self.sources.is_empty() {
            debug!("No configuration file or overrides, using defaults");
        }
        for source in &self.sources {
            info!("Configuration from {}", source);
        }
    }

    pub fn validate(&self) -> Result<()> {
        let base_url = self.api.base_url.trim();
        if base_url.is_empty() {
            anyhow::bail!("API base URL cannot be empty");
        }
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            anyhow::bail!("API base URL must start with http:// or https://, got '{}'", base_url);
        }

        if self.api.timeout_secs == Some(0) {
            anyhow::bail!("Request timeout must be greater than 0");
        }

        // Full filter directives are passed through to the subscriber as-is
        if !self.is_filter_directive() {
            let valid_levels = ["trace", "debug", "info", "warn", "error"];
            let level_lower = self.logging.level.to_lowercase();
            if !valid_levels.contains(&level_lower.as_str()) {
                anyhow::bail!(
                    "Invalid log level '{}'. Must be one of: {:?}",
                    self.logging.level,
                    valid_levels
                );
            }
        }

        Ok(())
    }

    fn is_filter_directive(&self) -> bool {
        self.logging.level.contains('=') || self.logging.level.contains(',')
    }

    pub fn log_filter(&self) -> String {
        if self.is_filter_directive() {
            self.logging.level.clone()
        } else {
            let level = self.logging.level.to_lowercase();
            format!("taskdeck={level},taskdeck_client={level},taskdeck_session={level},{level}")
        }
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.api.timeout_secs.map(Duration::from_secs)
    }

    pub fn session_file(&self) -> Result<PathBuf> {
        match &self.session.file {
            Some(path) => Ok(path.clone()),
            None => FileSessionBackend::default_path().context("Failed to locate session file"),
        }
    }

    pub fn log_file(&self) -> Result<PathBuf> {
        match &self.logging.file {
            Some(path) => Ok(path.clone()),
            None => Ok(app_dir()?.join("taskdeck.log")),
        }
    }
}
