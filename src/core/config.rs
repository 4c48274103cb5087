use crate::core::validation_session::ValidationConfig;
use crate::models::pose::OracleConfig;
use crate::platform::data_directory;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Environment variable overriding the settings file location
pub const CONFIG_ENV: &str = "CIVIC_CONFIG";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to access config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed config file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Could not determine config location: {0}")]
    Location(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// HTTP/WebSocket listen port
    pub port: u16,
    /// sqlx connection string for the civic store
    pub database_url: String,
    pub pose_model_path: String,
    pub gesture_model_path: String,
    /// Passed through to the landmark models (0.0-1.0)
    pub min_detection_confidence: f32,
    pub min_presence_confidence: f32,
    /// Batch voting rules
    pub validation: ValidationConfig,
}

impl Default for Config {
    fn default() -> Self {
        let mut db_path = data_directory().unwrap_or_else(|_| PathBuf::from("."));
        db_path.push("database");
        db_path.push("civic.db");

        let oracle = OracleConfig::default();

        Self {
            port: 8000,
            database_url: format!("sqlite://{}", db_path.display()),
            pose_model_path: oracle.pose_model_path,
            gesture_model_path: oracle.gesture_model_path,
            min_detection_confidence: oracle.min_detection_confidence,
            min_presence_confidence: oracle.min_presence_confidence,
            validation: ValidationConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from file, creating with defaults if it doesn't exist
    pub fn load() -> ConfigResult<Self> {
        Self::load_from(&Self::get_config_path()?)
    }

    pub fn load_from(path: &Path) -> ConfigResult<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            let config: Config = serde_json::from_str(&contents)?;
            config.validate()?;
            Ok(config)
        } else {
            let config = Self::default();
            config.save_to(path)?;
            Ok(config)
        }
    }

    /// Save configuration to file
    pub fn save(&self) -> ConfigResult<()> {
        self.save_to(&Self::get_config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> ConfigResult<()> {
        self.validate()?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;

        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> ConfigResult<()> {
        if self.port == 0 {
            return Err(ConfigError::Invalid("Port must be non-zero".to_string()));
        }

        if self.database_url.trim().is_empty() {
            return Err(ConfigError::Invalid("Database URL cannot be empty".to_string()));
        }

        if self.pose_model_path.trim().is_empty() || self.gesture_model_path.trim().is_empty() {
            return Err(ConfigError::Invalid("Model paths cannot be empty".to_string()));
        }

        let confidences = [
            ("min detection confidence", self.min_detection_confidence),
            ("min presence confidence", self.min_presence_confidence),
            ("landmark confidence", self.validation.landmark_confidence),
        ];
        for (name, value) in confidences {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::Invalid(format!(
                    "Invalid {}: {}. Must be between 0.0 and 1.0",
                    name, value
                )));
            }
        }

        if self.validation.pass_threshold == 0 || self.validation.fail_threshold == 0 {
            return Err(ConfigError::Invalid(format!(
                "Thresholds must be at least 1 (pass {}, fail {})",
                self.validation.pass_threshold, self.validation.fail_threshold
            )));
        }

        Ok(())
    }

    /// Reset to default configuration
    pub fn reset() -> ConfigResult<Self> {
        let config = Self::default();
        config.save()?;
        Ok(config)
    }

    pub fn oracle_config(&self) -> OracleConfig {
        OracleConfig {
            pose_model_path: self.pose_model_path.clone(),
            gesture_model_path: self.gesture_model_path.clone(),
            min_detection_confidence: self.min_detection_confidence,
            min_presence_confidence: self.min_presence_confidence,
        }
    }

    /// Get the configuration file path
    pub fn get_config_path() -> ConfigResult<PathBuf> {
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            if !path.is_empty() {
                return Ok(PathBuf::from(path));
            }
        }

        let mut path = data_directory().map_err(|e| ConfigError::Location(e.to_string()))?;
        path.push("config");
        path.push("settings.json");

        Ok(path)
    }
}
