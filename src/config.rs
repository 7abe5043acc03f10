//! Engine configuration.
//!
//! A plain value handed to the orchestrator; every field has a default so a
//! partial JSON document is enough.

use serde::{Deserialize, Serialize};

use crate::error::FxError;
use crate::tempo::Tempo;

/// Upper bounds that keep pathological parameter combinations finite.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderLimits {
    /// Most grains a single granular render may schedule.
    pub max_grains: usize,
    /// Longest impulse response a reverb preset may synthesize.
    pub max_ir_seconds: f64,
    /// Longest granular freeze tail, in seconds.
    pub max_tail_seconds: f64,
}

impl Default for RenderLimits {
    fn default() -> Self {
        RenderLimits {
            max_grains: 20_000,
            max_ir_seconds: 8.0,
            max_tail_seconds: 30.0,
        }
    }
}

/// Top-level configuration for an orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Seed used when an apply request does not carry its own.
    pub default_seed: u64,
    pub tempo: Tempo,
    pub limits: RenderLimits,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            default_seed: 0x5eed,
            tempo: Tempo::default(),
            limits: RenderLimits::default(),
        }
    }
}

impl EngineConfig {
    pub fn from_json(json: &str) -> Result<Self, FxError> {
        serde_json::from_str(json).map_err(|e| FxError::validation(format!("engine config: {e}")))
    }
}
