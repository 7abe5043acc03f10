//! Offline effects.
//!
//! Each effect is a stateless unit type implementing [`Effect`]: it declares
//! a static parameter schema and renders a region into a [`RenderedRegion`].
//! All kernels are built inside `render`, so a render is a pure function of
//! buffer, region, parameters and the context's seed.

use log::debug;

use crate::buffer::{Region, RenderedRegion, SampleBuffer};
use crate::context::RenderContext;
use crate::error::FxError;
use crate::params::{EffectSchema, ParameterSet, ResolvedParams};
use crate::tempo::NoteDivision;

pub mod chorus;
pub mod compressor;
pub mod distortion;
pub mod echo;
pub mod filter;
pub mod flanger;
pub mod gate;
pub mod glitch;
pub mod granular;
pub mod limiter;
pub mod phaser;
pub mod reverb;
pub mod reverse_reverb;
pub mod ring_mod;
pub mod tremolo;

pub trait Effect: Send + Sync {
    fn schema(&self) -> &'static EffectSchema;

    /// Render `region` of `buffer`. The region has already been validated
    /// against the buffer and `params` resolved against `schema()`.
    fn render(
        &self,
        buffer: &SampleBuffer,
        region: Region,
        params: &ResolvedParams,
        ctx: &mut RenderContext,
    ) -> Result<RenderedRegion, FxError>;
}

/// The closed set of effects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EffectKind {
    Compressor,
    Limiter,
    Gate,
    Filter,
    Distortion,
    Echo,
    Reverb,
    ReverseReverb,
    RingModulator,
    Glitch,
    GranularFreeze,
    Chorus,
    Flanger,
    Phaser,
    Tremolo,
}

impl EffectKind {
    pub const ALL: [EffectKind; 15] = [
        EffectKind::Compressor,
        EffectKind::Limiter,
        EffectKind::Gate,
        EffectKind::Filter,
        EffectKind::Distortion,
        EffectKind::Echo,
        EffectKind::Reverb,
        EffectKind::ReverseReverb,
        EffectKind::RingModulator,
        EffectKind::Glitch,
        EffectKind::GranularFreeze,
        EffectKind::Chorus,
        EffectKind::Flanger,
        EffectKind::Phaser,
        EffectKind::Tremolo,
    ];

    pub fn from_id(id: &str) -> Result<Self, FxError> {
        Self::ALL
            .iter()
            .copied()
            .find(|k| k.id() == id)
            .ok_or_else(|| FxError::UnknownEffect(id.to_string()))
    }

    pub fn effect(self) -> &'static dyn Effect {
        match self {
            EffectKind::Compressor => &compressor::Compressor,
            EffectKind::Limiter => &limiter::Limiter,
            EffectKind::Gate => &gate::Gate,
            EffectKind::Filter => &filter::Filter,
            EffectKind::Distortion => &distortion::Distortion,
            EffectKind::Echo => &echo::Echo,
            EffectKind::Reverb => &reverb::Reverb,
            EffectKind::ReverseReverb => &reverse_reverb::ReverseReverb,
            EffectKind::RingModulator => &ring_mod::RingModulator,
            EffectKind::Glitch => &glitch::Glitch,
            EffectKind::GranularFreeze => &granular::GranularFreeze,
            EffectKind::Chorus => &chorus::Chorus,
            EffectKind::Flanger => &flanger::Flanger,
            EffectKind::Phaser => &phaser::Phaser,
            EffectKind::Tremolo => &tremolo::Tremolo,
        }
    }

    pub fn schema(self) -> &'static EffectSchema {
        self.effect().schema()
    }

    pub fn id(self) -> &'static str {
        self.schema().id
    }

    /// Display name used in history labels and error messages.
    pub fn name(self) -> &'static str {
        self.schema().name
    }

    /// Resolve a raw parameter set against this effect's schema.
    pub fn validate(self, params: &ParameterSet) -> Result<ResolvedParams, FxError> {
        self.schema().resolve(params)
    }
}

/// Every schema, in catalog order.
pub fn catalog() -> Vec<&'static EffectSchema> {
    EffectKind::ALL.iter().map(|k| k.schema()).collect()
}

/// Validate, render and finalize one effect over one region.
pub fn render_effect(
    kind: EffectKind,
    buffer: &SampleBuffer,
    region: Region,
    params: &ParameterSet,
    ctx: &mut RenderContext,
) -> Result<RenderedRegion, FxError> {
    region.validate(buffer.len())?;
    let resolved = kind.validate(params)?;
    debug!(
        "rendering {} over [{}, {}) at {} Hz",
        kind.id(),
        region.start,
        region.end,
        buffer.sample_rate()
    );
    kind.effect()
        .render(buffer, region, &resolved, ctx)?
        .finalize()
}

/// Note divisions offered by tempo-synced parameters.
pub(crate) const DIVISIONS: &[&str] = &[
    "1/1", "1/2", "1/4", "1/8", "1/16", "1/32", "1/2t", "1/4t", "1/8t", "1/16t", "1/2d", "1/4d",
    "1/8d", "1/16d",
];

/// Length in seconds of the division named by a choice parameter.
pub(crate) fn division_seconds(
    params: &ResolvedParams,
    id: &str,
    ctx: &RenderContext,
) -> Result<f64, FxError> {
    Ok(NoteDivision::parse(params.choice(id))?.seconds(ctx.tempo))
}

/// Map a choice parameter onto a typed selector.
pub(crate) fn choice<T>(
    params: &ResolvedParams,
    id: &str,
    parse: impl Fn(&str) -> Option<T>,
) -> Result<T, FxError> {
    let value = params.choice(id);
    parse(value).ok_or_else(|| FxError::validation(format!("unsupported {id} '{value}'")))
}

/// Linear dry/wet blend.
#[inline]
pub(crate) fn blend(dry: f32, wet: f32, mix: f32) -> f32 {
    dry * (1.0 - mix) + wet * mix
}

/// dB parameter to linear gain, as f32.
#[inline]
pub(crate) fn gain(db: f64) -> f32 {
    crate::dsp::curves::db_to_linear(db) as f32
}

#[cfg(test)]
pub(crate) mod test_util {
    use crate::buffer::SampleBuffer;
    use std::f64::consts::PI;

    pub fn sine(freq: f64, amp: f32, len: usize, sample_rate: u32) -> Vec<f32> {
        (0..len)
            .map(|i| (2.0 * PI * freq * i as f64 / sample_rate as f64).sin() as f32 * amp)
            .collect()
    }

    pub fn stereo_sine(freq: f64, amp: f32, len: usize, sample_rate: u32) -> SampleBuffer {
        let s = sine(freq, amp, len, sample_rate);
        SampleBuffer::new(vec![s.clone(), s], sample_rate).unwrap()
    }

    pub fn peak(samples: &[f32]) -> f32 {
        samples.iter().fold(0.0f32, |m, v| m.max(v.abs()))
    }

    pub fn rms(samples: &[f32]) -> f32 {
        (samples.iter().map(|v| v * v).sum::<f32>() / samples.len().max(1) as f32).sqrt()
    }
}
