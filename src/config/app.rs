//! Application configuration loading from config.toml
//!
//! Every section has defaults, so an empty (or missing) file yields a working
//! development setup that logs emails instead of sending them. Secrets are never read
//! from the file: SMTP credentials come from `SMTP_USERNAME` and `SMTP_PASSWORD`.

use crate::errors::{Error, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

/// Environment variable naming an alternative configuration file
pub const CONFIG_PATH_ENV: &str = "DEBT_TRACKER_CONFIG";

/// Configuration structure representing the entire config.toml file
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Database connection string, overridden by `DATABASE_URL`
    pub database_url: String,
    /// Outbound mail settings
    pub mail: MailConfig,
    /// Sweep intervals
    pub schedule: ScheduleConfig,
    /// File download URL settings
    pub storage: StorageConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: super::database::DEFAULT_DATABASE_URL.to_string(),
            mail: MailConfig::default(),
            schedule: ScheduleConfig::default(),
            storage: StorageConfig::default(),
        }
    }
}

/// Outbound mail settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MailConfig {
    /// `From` header of every reminder
    pub from: String,
    /// SMTP relay host; when absent emails are only logged
    pub smtp_host: Option<String>,
    /// SMTP port used with STARTTLS
    pub smtp_port: u16,
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            from: "Debt Collection <noreply@debtcollection.example.com>".to_string(),
            smtp_host: None,
            smtp_port: 587,
        }
    }
}

/// Intervals of the two periodic sweeps
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    /// Seconds between overdue reminder sweeps
    pub overdue_sweep_interval_secs: u64,
    /// Seconds between scheduled batch sweeps
    pub batch_sweep_interval_secs: u64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            overdue_sweep_interval_secs: 24 * 60 * 60,
            batch_sweep_interval_secs: 5 * 60,
        }
    }
}

impl ScheduleConfig {
    /// Interval of the overdue sweep.
    #[must_use]
    pub const fn overdue_sweep_interval(&self) -> Duration {
        Duration::from_secs(self.overdue_sweep_interval_secs)
    }

    /// Interval of the batch sweep.
    #[must_use]
    pub const fn batch_sweep_interval(&self) -> Duration {
        Duration::from_secs(self.batch_sweep_interval_secs)
    }
}

/// Settings for the blob-storage URLs handed out to clients
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Base URL of the file service
    pub public_base_url: String,
    /// Lifetime of generated URLs in seconds
    pub url_ttl_secs: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            public_base_url: "http://localhost:8080/files".to_string(),
            url_ttl_secs: 60 * 60,
        }
    }
}

impl AppConfig {
    /// Checks values serde cannot express.
    ///
    /// # Errors
    /// Returns [`Error::Config`] for zero sweep intervals or an empty sender address.
    pub fn validate(&self) -> Result<()> {
        if self.schedule.overdue_sweep_interval_secs == 0
            || self.schedule.batch_sweep_interval_secs == 0
        {
            return Err(Error::Config {
                message: "Sweep intervals must be greater than zero".to_string(),
            });
        }
        if self.mail.from.trim().is_empty() {
            return Err(Error::Config {
                message: "mail.from cannot be empty".to_string(),
            });
        }
        Ok(())
    }
}

/// Loads configuration from a TOML file
///
/// # Errors
/// Returns an error if:
/// - The file cannot be read
/// - The TOML syntax is invalid
/// - A value fails [`AppConfig::validate`]
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<AppConfig> {
    let path_ref = path.as_ref();
    debug!("Attempting to load configuration from: {:?}", path_ref);
    let contents = std::fs::read_to_string(path_ref).map_err(|e| Error::Config {
        message: format!("Failed to read config file {}: {e}", path_ref.display()),
    })?;

    let config: AppConfig = toml::from_str(&contents).map_err(|e| Error::Config {
        message: format!("Failed to parse config file {}: {e}", path_ref.display()),
    })?;
    config.validate()?;
    Ok(config)
}

/// Loads configuration from `DEBT_TRACKER_CONFIG` or `./config.toml`, falling back to
/// defaults when the default file does not exist.
///
/// # Errors
/// Returns an error if an existing file cannot be read or parsed.
pub fn load_app_configuration() -> Result<AppConfig> {
    if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
        return load_config(path);
    }

    let default_path = Path::new("config.toml");
    if default_path.exists() {
        load_config(default_path)
    } else {
        info!("No config.toml found, using default configuration");
        Ok(AppConfig::default())
    }
}
