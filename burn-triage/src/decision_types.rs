//! Configuration records for the decision engine.

use crate::color_gate::DEFAULT_ANALYSIS_SIZE;
use crate::error::{EngineError, EngineResult};
use crate::preprocessing::DEFAULT_INPUT_SIZE;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Numeric cutoffs for the open-set rejection gates
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DecisionThresholds {
    /// Top probability that accepts on its own (default: 0.82)
    pub accept_hard: f32,

    /// Minimum top probability for rule-based acceptance (default: 0.55)
    pub min_confidence: f32,

    /// Minimum top-1 minus top-2 gap for rule-based acceptance (default: 0.10)
    pub min_margin: f32,

    /// Minimum top minus 1/num_classes for rule-based acceptance (default: 0.34)
    pub uniform_gap: f32,

    /// Maximum entropy in nats (default: 0.58)
    pub max_entropy: f32,

    /// Minimum fraction of skin pixels (default: 0.14)
    pub min_skin_fraction: f32,

    /// Minimum fraction of skin pixels that are red (default: 0.12)
    pub min_red_on_skin: f32,

    /// Minimum largest red-on-skin region, as a fraction of the image (default: 0.04)
    pub min_largest_blob_frac: f32,

    /// Maximum Jensen-Shannon divergence between original and mirrored views (default: 0.06)
    pub max_jsd: f32,
}

impl Default for DecisionThresholds {
    fn default() -> Self {
        Self {
            accept_hard: 0.82,
            min_confidence: 0.55,
            min_margin: 0.10,
            uniform_gap: 0.34,
            max_entropy: 0.58,
            min_skin_fraction: 0.14,
            min_red_on_skin: 0.12,
            min_largest_blob_frac: 0.04,
            max_jsd: 0.06,
        }
    }
}

impl DecisionThresholds {
    pub fn validate(&self) -> EngineResult<()> {
        let probability_valued = [
            ("accept_hard", self.accept_hard),
            ("min_confidence", self.min_confidence),
            ("min_margin", self.min_margin),
            ("uniform_gap", self.uniform_gap),
            ("min_skin_fraction", self.min_skin_fraction),
            ("min_red_on_skin", self.min_red_on_skin),
            ("min_largest_blob_frac", self.min_largest_blob_frac),
        ];
        for (name, value) in probability_valued {
            if !value.is_finite() || !(0.0..=1.0).contains(&value) {
                return Err(EngineError::configuration(format!(
                    "{name} must be between 0.0 and 1.0, got {value}"
                )));
            }
        }

        if !self.max_entropy.is_finite() || self.max_entropy < 0.0 {
            return Err(EngineError::configuration(format!(
                "max_entropy must be a non-negative number, got {}",
                self.max_entropy
            )));
        }

        if !self.max_jsd.is_finite() || !(0.0..=std::f32::consts::LN_2).contains(&self.max_jsd) {
            return Err(EngineError::configuration(format!(
                "max_jsd must be between 0.0 and ln 2, got {}",
                self.max_jsd
            )));
        }

        Ok(())
    }
}

/// Everything the engine is constructed with besides the label list.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Side of the colour-analysis grid (default: 128)
    pub analysis_size: u32,
    /// Side of the square model input (default: 224)
    pub input_size: u32,
    /// Report a skin fraction of 1.0 so only the red and blob gates apply
    pub bypass_skin_check: bool,
    pub thresholds: DecisionThresholds,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            analysis_size: DEFAULT_ANALYSIS_SIZE,
            input_size: DEFAULT_INPUT_SIZE,
            bypass_skin_check: false,
            thresholds: DecisionThresholds::default(),
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> EngineResult<()> {
        if self.analysis_size == 0 {
            return Err(EngineError::configuration("analysis_size must be positive"));
        }
        if self.input_size == 0 {
            return Err(EngineError::configuration("input_size must be positive"));
        }
        self.thresholds.validate()
    }

    /// Parse and validate a TOML document; missing keys keep their defaults.
    pub fn from_toml_str(text: &str) -> EngineResult<Self> {
        let config: Self = toml::from_str(text)
            .map_err(|e| EngineError::configuration(format!("invalid thresholds file: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_file(path: impl AsRef<Path>) -> EngineResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            EngineError::configuration(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&text)
    }

    pub fn to_toml_string(&self) -> EngineResult<String> {
        toml::to_string_pretty(self)
            .map_err(|e| EngineError::configuration(format!("cannot serialize config: {e}")))
    }
}
