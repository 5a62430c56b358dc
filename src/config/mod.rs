//! Configuration loading and validation.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Game-balance constants.
///
/// These encode facts about the source game's progression curves and can
/// change with balance patches, so they live in config rather than inline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameConstants {
    /// Level at which the exp curve switches to a flat per-level cost
    #[serde(default = "default_exp_curve_threshold")]
    pub exp_curve_threshold: u32,

    /// Exp required per level at/above the threshold
    #[serde(default = "default_exp_per_level_capped")]
    pub exp_per_level_capped: f64,

    /// Maximum gem mine level
    #[serde(default = "default_mine_cap")]
    pub mine_cap: f64,

    /// Maximum treasury level
    #[serde(default = "default_treasury_cap")]
    pub treasury_cap: f64,
}

fn default_exp_curve_threshold() -> u32 {
    393
}

fn default_exp_per_level_capped() -> f64 {
    1_500_000_000.0
}

fn default_mine_cap() -> f64 {
    100.0
}

fn default_treasury_cap() -> f64 {
    45.0
}

impl Default for GameConstants {
    fn default() -> Self {
        Self {
            exp_curve_threshold: default_exp_curve_threshold(),
            exp_per_level_capped: default_exp_per_level_capped(),
            mine_cap: default_mine_cap(),
            treasury_cap: default_treasury_cap(),
        }
    }
}

/// Tunable engine parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineParams {
    /// Cohort size for the server-average baseline (top N by base stats)
    #[serde(default = "default_server_baseline_cohort")]
    pub server_baseline_cohort: usize,

    /// Cohort size for the top-player display baseline
    #[serde(default = "default_top_cohort")]
    pub top_cohort: usize,

    /// Minimum members with positive pace for a valid group baseline
    #[serde(default = "default_min_group_size")]
    pub min_group_size: usize,

    /// Roster slots recommended as Main
    #[serde(default = "default_main_slots")]
    pub main_slots: usize,

    /// Roster slots recommended as Wing
    #[serde(default = "default_wing_slots")]
    pub wing_slots: usize,

    /// Entries kept per top-mover list
    #[serde(default = "default_top_mover_limit")]
    pub top_mover_limit: usize,
}

fn default_server_baseline_cohort() -> usize {
    150
}

fn default_top_cohort() -> usize {
    100
}

fn default_min_group_size() -> usize {
    2
}

fn default_main_slots() -> usize {
    50
}

fn default_wing_slots() -> usize {
    50
}

fn default_top_mover_limit() -> usize {
    10
}

impl Default for EngineParams {
    fn default() -> Self {
        Self {
            server_baseline_cohort: default_server_baseline_cohort(),
            top_cohort: default_top_cohort(),
            min_group_size: default_min_group_size(),
            main_slots: default_main_slots(),
            wing_slots: default_wing_slots(),
            top_mover_limit: default_top_mover_limit(),
        }
    }
}

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub game: GameConstants,

    #[serde(default)]
    pub engine: EngineParams,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            game: GameConstants::default(),
            engine: EngineParams::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &PathBuf) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.game.exp_per_level_capped <= 0.0 {
            return Err(ConfigError::ValidationError(
                "exp_per_level_capped must be positive".to_string(),
            ));
        }

        if self.engine.min_group_size < 2 {
            return Err(ConfigError::ValidationError(
                "min_group_size must be at least 2".to_string(),
            ));
        }

        if self.engine.server_baseline_cohort == 0 || self.engine.top_cohort == 0 {
            return Err(ConfigError::ValidationError(
                "baseline cohort sizes must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}
