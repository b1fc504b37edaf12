//! Configuration validation utilities

use crate::{ConfigError, MathboardConfig, Result};

/// Configuration validator with range checks per section
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate a complete configuration
    pub fn validate(config: &MathboardConfig) -> Result<()> {
        Self::validate_bridge(&config.bridge)?;
        Self::validate_interaction(&config.interaction)?;
        Self::validate_viewport(&config.viewport)?;
        Self::validate_intent(&config.intent)?;
        Ok(())
    }

    fn validate_bridge(bridge: &crate::BridgeSettings) -> Result<()> {
        if bridge.request_timeout_ms == 0 || bridge.request_timeout_ms > 600_000 {
            return Err(ConfigError::Validation(format!(
                "Invalid request_timeout_ms: {}. Must be between 1 and 600000",
                bridge.request_timeout_ms
            )));
        }

        if !bridge.reject_on_restart {
            log::warn!("Outstanding requests will linger until their timeout after a host restart");
        }

        Ok(())
    }

    fn validate_interaction(interaction: &crate::InteractionSettings) -> Result<()> {
        if !(interaction.zoom_factor > 1.0 && interaction.zoom_factor <= 10.0) {
            return Err(ConfigError::Validation(format!(
                "Invalid zoom_factor: {}. Must be greater than 1.0 and at most 10.0",
                interaction.zoom_factor
            )));
        }

        if !(interaction.min_scale > 0.0 && interaction.min_scale < interaction.max_scale) {
            return Err(ConfigError::Validation(format!(
                "Invalid scale range [{}, {}]. Need 0 < min_scale < max_scale",
                interaction.min_scale, interaction.max_scale
            )));
        }

        if !interaction.max_scale.is_finite() {
            return Err(ConfigError::Validation(
                "max_scale must be finite".to_string(),
            ));
        }

        if interaction.hit_threshold_divisor <= 0.0 {
            return Err(ConfigError::Validation(format!(
                "Invalid hit_threshold_divisor: {}. Must be positive",
                interaction.hit_threshold_divisor
            )));
        }

        Ok(())
    }

    fn validate_viewport(viewport: &crate::ViewportSettings) -> Result<()> {
        let [left, top, right, bottom] = viewport.bounding_box;

        if viewport.bounding_box.iter().any(|v| !v.is_finite()) {
            return Err(ConfigError::Validation(
                "Bounding box values must be finite".to_string(),
            ));
        }

        if left >= right || bottom >= top {
            return Err(ConfigError::Validation(format!(
                "Degenerate bounding box {:?}. Expected [left, top, right, bottom] with left < right and bottom < top",
                viewport.bounding_box
            )));
        }

        if viewport.width == 0 || viewport.height == 0 {
            return Err(ConfigError::Validation(format!(
                "Invalid canvas size {}x{}",
                viewport.width, viewport.height
            )));
        }

        Ok(())
    }

    fn validate_intent(intent: &crate::IntentSettings) -> Result<()> {
        if !(intent.endpoint.starts_with("http://") || intent.endpoint.starts_with("https://")) {
            return Err(ConfigError::Validation(format!(
                "Intent endpoint must be an http(s) URL, got '{}'",
                intent.endpoint
            )));
        }

        if intent.timeout_ms == 0 {
            return Err(ConfigError::Validation(
                "Intent timeout must be positive".to_string(),
            ));
        }

        Ok(())
    }
}
