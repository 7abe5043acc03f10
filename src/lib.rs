pub mod assets;
pub mod buffer;
pub mod config;
pub mod context;
pub mod dsp;
pub mod effects;
pub mod error;
pub mod history;
pub mod orchestrator;
pub mod params;
pub mod splice;
pub mod tempo;
pub mod wav;

pub use crate::assets::{AssetRef, AssetStore, MemoryAssetStore};
pub use crate::buffer::{Placement, Region, RenderedRegion, SampleBuffer};
pub use crate::config::{EngineConfig, RenderLimits};
pub use crate::effects::{catalog, render_effect, Effect, EffectKind};
pub use crate::error::{ApplyError, FxError};
pub use crate::history::{EditHistory, EditHistoryEntry};
pub use crate::orchestrator::{
    ApplyOutcome, ApplyRequest, CancelToken, EffectApplyOrchestrator, SharedOrchestrator,
};
pub use crate::params::{EffectSchema, ParameterSet};

use wasm_bindgen::prelude::*;

/// The crate version, read from Cargo.toml at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// WASM-exposed: return the regionfx-core version string.
#[wasm_bindgen]
pub fn core_version() -> String {
    VERSION.to_string()
}

/// WASM-exposed: every effect's parameter schema, in catalog order.
#[wasm_bindgen]
pub fn effect_catalog() -> Result<JsValue, JsValue> {
    serde_wasm_bindgen::to_value(&catalog()).map_err(|e| JsValue::from_str(&format!("{e}")))
}

/// Decode a WAV, apply one effect over `[start, end)` and return the
/// re-encoded WAV.
pub fn apply_effect_to_wav(
    effect_id: &str,
    wav_bytes: &[u8],
    region: Region,
    params: &ParameterSet,
    seed: u64,
) -> Result<Vec<u8>, ApplyError> {
    let kind = EffectKind::from_id(effect_id).map_err(|e| ApplyError::new(effect_id, e))?;
    let fail = |e: FxError| ApplyError::new(kind.name(), e);
    let buffer = wav::decode(wav_bytes).map_err(fail)?;
    let mut ctx = context::RenderContext::new(buffer.sample_rate(), buffer.num_channels(), seed);
    let rendered = render_effect(kind, &buffer, region, params, &mut ctx).map_err(fail)?;
    let output = splice::splice_rendered(&buffer, &rendered, region);
    wav::encode(&output).map_err(fail)
}

/// WASM-exposed: apply one effect to a WAV byte array.
/// `params` is a plain object of parameter id to number, bool or string.
#[wasm_bindgen]
pub fn apply_effect_wav(
    effect_id: &str,
    wav: &[u8],
    start: u32,
    end: u32,
    params: JsValue,
    seed: u64,
) -> Result<Vec<u8>, JsValue> {
    let params: ParameterSet = if params.is_undefined() || params.is_null() {
        ParameterSet::new()
    } else {
        serde_wasm_bindgen::from_value(params).map_err(|e| JsValue::from_str(&format!("{e}")))?
    };
    let region = Region {
        start: start as usize,
        end: end as usize,
    };
    apply_effect_to_wav(effect_id, wav, region, &params, seed)
        .map_err(|e| JsValue::from_str(&e.to_string()))
}
