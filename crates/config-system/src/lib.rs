//! Configuration system for Mathboard
//! Bridge timeouts, interaction tuning, initial viewport and the intent service endpoint

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod parser;
pub mod validation;

pub use parser::{ConfigFormat, ConfigParser, ConfigSerializer, TemplateExpander};
pub use validation::ConfigValidator;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Validation error: {0}")]
    Validation(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Complete Mathboard configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MathboardConfig {
    pub version: String,
    pub bridge: BridgeSettings,
    pub interaction: InteractionSettings,
    pub viewport: ViewportSettings,
    pub intent: IntentSettings,
}

impl Default for MathboardConfig {
    fn default() -> Self {
        Self {
            version: "1.0.0".to_string(),
            bridge: BridgeSettings::default(),
            interaction: InteractionSettings::default(),
            viewport: ViewportSettings::default(),
            intent: IntentSettings::default(),
        }
    }
}

/// Computation host bridge settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeSettings {
    /// Per-request deadline
    pub request_timeout_ms: u64,
    /// Reject outstanding requests when the host is restarted
    pub reject_on_restart: bool,
}

impl Default for BridgeSettings {
    fn default() -> Self {
        Self {
            request_timeout_ms: 30_000,
            reject_on_restart: true,
        }
    }
}

/// Pointer and wheel handling
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InteractionSettings {
    /// Multiplicative zoom per wheel notch
    pub zoom_factor: f64,
    pub min_scale: f64,
    pub max_scale: f64,
    /// Hit threshold is the visible span divided by this value
    pub hit_threshold_divisor: f64,
}

impl Default for InteractionSettings {
    fn default() -> Self {
        Self {
            zoom_factor: 1.25,
            min_scale: 0.05,
            max_scale: 50.0,
            hit_threshold_divisor: 40.0,
        }
    }
}

/// Initial view of the canvas
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewportSettings {
    /// `[left, top, right, bottom]` in user coordinates
    pub bounding_box: [f64; 4],
    pub width: u32,
    pub height: u32,
}

impl Default for ViewportSettings {
    fn default() -> Self {
        Self {
            bounding_box: [-10.0, 10.0, 10.0, -10.0],
            width: 800,
            height: 600,
        }
    }
}

/// Intent-parsing service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IntentSettings {
    pub endpoint: String,
    pub timeout_ms: u64,
}

impl Default for IntentSettings {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:8000".to_string(),
            timeout_ms: 60_000,
        }
    }
}

impl MathboardConfig {
    /// Load, expand `${VAR}` references, parse and validate a config file.
    pub fn load(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let config = ConfigParser::parse_file(path)?;
        ConfigValidator::validate(&config)?;
        Ok(config)
    }
}
