use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{population::ModelSettings, systems::RuleSettings};

fn default_reserves_path() -> PathBuf {
    PathBuf::from("reserves/reserves.yaml")
}

fn default_grid_dir() -> PathBuf {
    PathBuf::from("grids")
}

fn default_default_reserve() -> String {
    "Nagarhole".to_string()
}

fn default_tick_period_ms() -> u64 {
    1_000
}

fn default_noise_scale() -> f64 {
    1.0
}

fn default_horizon_months() -> u32 {
    100
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_reserves_path")]
    pub reserves_path: PathBuf,
    #[serde(default = "default_grid_dir")]
    pub grid_dir: PathBuf,
    /// Reserve used when a command names none.
    #[serde(default = "default_default_reserve")]
    pub default_reserve: String,
    #[serde(default = "default_tick_period_ms")]
    pub tick_period_ms: u64,
    /// Fixed seed for every random stream; entropy when unset.
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default = "default_noise_scale")]
    pub noise_scale: f64,
    #[serde(default = "default_horizon_months")]
    pub horizon_months: u32,
    #[serde(default)]
    pub rules: RuleSettings,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            reserves_path: default_reserves_path(),
            grid_dir: default_grid_dir(),
            default_reserve: default_default_reserve(),
            tick_period_ms: default_tick_period_ms(),
            seed: None,
            noise_scale: default_noise_scale(),
            horizon_months: default_horizon_months(),
            rules: RuleSettings::default(),
            logging: LoggingConfig::default(),
            server: ServerConfig::default(),
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("tick_period_ms must be greater than zero")]
    ZeroTickPeriod,
    #[error("noise_scale must be a non-negative number, got {0}")]
    InvalidNoiseScale(f64),
    #[error("horizon_months must be greater than zero")]
    ZeroHorizon,
    #[error("{name} must be a probability in [0, 1], got {value}")]
    InvalidChance { name: &'static str, value: f64 },
}

impl AppConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: AppConfig = serde_yaml::from_str(&data)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Loads the file when it exists, defaults otherwise.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tick_period_ms == 0 {
            return Err(ConfigError::ZeroTickPeriod);
        }
        if !self.noise_scale.is_finite() || self.noise_scale < 0.0 {
            return Err(ConfigError::InvalidNoiseScale(self.noise_scale));
        }
        if self.horizon_months == 0 {
            return Err(ConfigError::ZeroHorizon);
        }
        for (name, value) in [
            ("prey_birth_chance", self.rules.prey_birth_chance),
            ("predator_birth_chance", self.rules.predator_birth_chance),
            ("starvation_chance", self.rules.starvation_chance),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::InvalidChance { name, value });
            }
        }
        Ok(())
    }

    /// Applies a tick period override, rejecting zero.
    pub fn set_tick_period_ms(&mut self, tick_period_ms: u64) -> Result<(), ConfigError> {
        if tick_period_ms == 0 {
            return Err(ConfigError::ZeroTickPeriod);
        }
        self.tick_period_ms = tick_period_ms;
        Ok(())
    }

    pub fn tick_period(&self) -> Duration {
        Duration::from_millis(self.tick_period_ms)
    }

    pub fn model_settings(&self) -> ModelSettings {
        ModelSettings {
            horizon: self.horizon_months,
            noise_scale: self.noise_scale,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_yaml_yields_defaults() {
        let config: AppConfig = serde_yaml::from_str("{}").expect("parses");
        assert_eq!(config.tick_period_ms, 1_000);
        assert_eq!(config.default_reserve, "Nagarhole");
        assert_eq!(config.rules, RuleSettings::default());
        assert!(config.seed.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_rules_keep_other_defaults() {
        let config: AppConfig = serde_yaml::from_str(
            "seed: 9\nrules:\n  capture_radius: 30\nlogging:\n  level: debug\n",
        )
        .unwrap();
        assert_eq!(config.seed, Some(9));
        assert_eq!(config.rules.capture_radius, 30.0);
        assert_eq!(config.rules.predator_step, 25.0);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn validation_rejects_bad_values() {
        let config = AppConfig {
            tick_period_ms: 0,
            ..AppConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::ZeroTickPeriod));

        let mut config = AppConfig::default();
        config.rules.starvation_chance = 1.5;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidChance {
                name: "starvation_chance",
                ..
            })
        ));
    }

    #[test]
    fn zero_period_override_is_rejected() {
        let mut config = AppConfig::default();
        assert_eq!(
            config.set_tick_period_ms(0),
            Err(ConfigError::ZeroTickPeriod)
        );
        assert_eq!(config.tick_period(), Duration::from_secs(1));

        config.set_tick_period_ms(250).unwrap();
        assert_eq!(config.tick_period(), Duration::from_millis(250));
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::load_or_default(dir.path().join("absent.yaml")).unwrap();
        assert_eq!(config.server.port, 8080);
    }
}
