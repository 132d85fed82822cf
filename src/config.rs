//! Configuration management for hydro-usage
//!
//! This module handles loading, validation, and management of the application
//! configuration from YAML files with support for environment variable overrides.
//! Everything that used to be process-global (provider URLs, trust bundle
//! path, tariff region and holiday calendar) lives here and is handed to the
//! login flow and the classifier at construction time.

use crate::error::{HydroError, Result};
use crate::tariff::AmbiguityPolicy;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::Path;

mod defaults;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Provider portal endpoints and transport settings
    pub provider: ProviderConfig,

    /// Time-of-use tariff rules
    pub tariff: TariffConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Provider portal endpoints, form selectors and transport settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Static login page carrying the credentials form
    pub login_url: String,

    /// Usage overview page that serves the secondary, script-generated form
    pub usage_url: String,

    /// CSV data export endpoint
    pub export_url: String,

    /// CSS selector for the login form
    pub login_form_selector: String,

    /// CSS selector for the secondary authorization form
    pub secondary_form_selector: String,

    /// PEM bundle with the root and intermediate certificates of the provider
    pub ca_bundle: String,

    /// Per-request deadline in seconds
    pub request_timeout_secs: u64,

    /// User agent presented to the portal
    pub user_agent: String,
}

/// Tariff classification configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TariffConfig {
    /// IANA timezone of the tariff region
    pub timezone: String,

    /// How to resolve wall-clock readings repeated by the fall-back transition
    pub ambiguous_time: AmbiguityPolicy,

    /// Months (1-12) billed with the winter schedule
    pub winter_months: Vec<u32>,

    /// Use the Ontario statutory holiday calendar
    pub ontario_holidays: bool,

    /// Additional off-peak dates (YYYY-MM-DD)
    pub extra_holidays: Vec<NaiveDate>,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    pub level: String,

    /// Optional console-specific level
    pub console_level: Option<String>,

    /// Optional file-specific level
    pub file_level: Option<String>,

    /// Path to log file (its directory is used for the rolling appender)
    pub file: String,

    /// Number of rotated files to keep
    pub backup_count: u32,

    /// Whether to log to console
    pub console_output: bool,

    /// Whether to use JSON format
    pub json_format: bool,
}

impl Config {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration from the default locations
    ///
    /// Falls back to the built-in defaults when no file exists. Environment
    /// overrides are not applied here; see [`Config::apply_env_overrides`].
    pub fn load() -> Result<Self> {
        let default_paths = ["hydro_usage.yaml", "/etc/hydro-usage/config.yaml"];

        default_paths
            .iter()
            .find(|p| Path::new(p).exists())
            .map(Self::from_file)
            .transpose()
            .map(Option::unwrap_or_default)
    }

    /// Apply `HYDRO_*` environment overrides on top of the file values
    pub fn apply_env_overrides(&mut self) {
        if let Ok(path) = std::env::var("HYDRO_CA_BUNDLE")
            && !path.trim().is_empty()
        {
            self.provider.ca_bundle = path;
        }
        if let Ok(level) = std::env::var("HYDRO_LOG_LEVEL")
            && !level.trim().is_empty()
        {
            self.logging.level = level;
        }
        if let Ok(tz) = std::env::var("HYDRO_TIMEZONE")
            && !tz.trim().is_empty()
        {
            self.tariff.timezone = tz;
        }
    }

    /// Save configuration to a YAML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        let provider = &self.provider;
        for (field, url) in [
            ("provider.login_url", &provider.login_url),
            ("provider.usage_url", &provider.usage_url),
            ("provider.export_url", &provider.export_url),
        ] {
            if reqwest::Url::parse(url).is_err() {
                return Err(HydroError::validation(
                    field,
                    &format!("Not an absolute URL: '{}'", url),
                ));
            }
        }

        for (field, selector) in [
            ("provider.login_form_selector", &provider.login_form_selector),
            (
                "provider.secondary_form_selector",
                &provider.secondary_form_selector,
            ),
        ] {
            if scraper::Selector::parse(selector).is_err() {
                return Err(HydroError::validation(
                    field,
                    &format!("Invalid CSS selector: '{}'", selector),
                ));
            }
        }

        if provider.ca_bundle.trim().is_empty() {
            return Err(HydroError::validation(
                "provider.ca_bundle",
                "Certificate bundle path cannot be empty",
            ));
        }

        if provider.request_timeout_secs == 0 {
            return Err(HydroError::validation(
                "provider.request_timeout_secs",
                "Must be greater than 0",
            ));
        }

        if self.tariff.timezone.parse::<chrono_tz::Tz>().is_err() {
            return Err(HydroError::validation(
                "tariff.timezone",
                &format!("Unknown timezone: '{}'", self.tariff.timezone),
            ));
        }

        if let Some(m) = self
            .tariff
            .winter_months
            .iter()
            .find(|m| !(1..=12).contains(*m))
        {
            return Err(HydroError::validation(
                "tariff.winter_months",
                &format!("Month out of range: {}", m),
            ));
        }

        if crate::logging::parse_log_level(&self.logging.level).is_err() {
            return Err(HydroError::validation(
                "logging.level",
                &format!("Invalid log level: '{}'", self.logging.level),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.provider.request_timeout_secs, 30);
        assert_eq!(config.tariff.timezone, "America/Toronto");
        assert_eq!(config.tariff.winter_months, vec![11, 12, 1, 2, 3, 4]);
        assert!(config.tariff.ontario_holidays);
        assert_eq!(config.tariff.ambiguous_time, AmbiguityPolicy::Standard);
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();
        assert!(config.validate().is_ok());

        config.provider.login_url = "/relative/login".to_string();
        assert!(config.validate().is_err());

        config = Config::default();
        config.provider.request_timeout_secs = 0;
        assert!(config.validate().is_err());

        config = Config::default();
        config.tariff.timezone = "Mars/Olympus".to_string();
        assert!(config.validate().is_err());

        config = Config::default();
        config.tariff.winter_months = vec![0];
        assert!(config.validate().is_err());

        config = Config::default();
        config.provider.secondary_form_selector = "form[".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let yaml = "tariff:\n  ambiguous_time: daylight\n  extra_holidays: [2024-12-24]\n";
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.tariff.ambiguous_time, AmbiguityPolicy::Daylight);
        assert_eq!(
            config.tariff.extra_holidays,
            vec![NaiveDate::from_ymd_opt(2024, 12, 24).unwrap()]
        );
        assert_eq!(config.provider.login_form_selector, "form[name='aspnetForm']");
    }

    #[test]
    fn test_load_reads_files_only() {
        // No hydro_usage.yaml in the crate root, so this is the built-in default
        let loaded = Config::load().unwrap();
        let default = Config::default();
        assert_eq!(
            serde_yaml::to_string(&loaded).unwrap(),
            serde_yaml::to_string(&default).unwrap()
        );
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let yaml = serde_yaml::to_string(&config).unwrap();
        let deserialized: Config = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(config.provider.export_url, deserialized.provider.export_url);
    }
}
