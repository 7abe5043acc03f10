//! Reverse reverb: a reversed reverb tail swelling into the region.
//!
//! The region is reversed, convolved and reversed back, which yields a wet
//! signal that starts before the region and builds toward it. The part that
//! falls before `region.start` is faded in linearly and mixed over the
//! preceding audio; the part inside the region is blended with the dry
//! signal. The swell never reaches before sample 0.

use super::reverb::impulse_responses;
use super::{blend, choice, Effect};
use crate::buffer::{Placement, Region, RenderedRegion, SampleBuffer};
use crate::context::RenderContext;
use crate::dsp::convolver::Convolver;
use crate::dsp::impulse::ReverbPreset;
use crate::error::FxError;
use crate::params::{EffectSchema, ParamSpec, ParamUnit, ResolvedParams};

pub struct ReverseReverb;

static SCHEMA: EffectSchema = EffectSchema {
    id: "reverse_reverb",
    name: "Reverse Reverb",
    params: &[
        ParamSpec::choice("preset", "Preset", ReverbPreset::IDS, "hall"),
        ParamSpec::float("decay", "Decay", ParamUnit::Ratio, 0.1, 3.0, 1.0),
        ParamSpec::float("buildup", "Buildup", ParamUnit::Seconds, 0.05, 4.0, 1.0),
        ParamSpec::float("mix", "Mix", ParamUnit::Ratio, 0.0, 1.0, 0.7),
    ],
};

impl Effect for ReverseReverb {
    fn schema(&self) -> &'static EffectSchema {
        &SCHEMA
    }

    fn render(
        &self,
        buffer: &SampleBuffer,
        region: Region,
        params: &ResolvedParams,
        ctx: &mut RenderContext,
    ) -> Result<RenderedRegion, FxError> {
        let preset = choice(params, "preset", ReverbPreset::from_id)?;
        let irs = impulse_responses(preset, params.float("decay"), 0, ctx);
        let ir_len = irs.first().map_or(1, |ir| ir.len());
        let mix = params.float("mix") as f32;

        // Samples of swell ahead of the region: bounded by the reverb
        // length, the buildup time, and sample 0.
        let lead = ctx
            .samples(params.float("buildup"))
            .min(ir_len.saturating_sub(1))
            .min(region.start);
        let start = region.start - lead;

        let original = buffer.copy_range(start, region.end);
        let mut out = Vec::with_capacity(original.len());
        for (ch, source) in original.iter().enumerate() {
            let mut reversed: Vec<f32> = source[lead..].to_vec();
            reversed.reverse();
            let mut swell = Convolver::new(&irs[ch % irs.len()]).process(&reversed);
            swell.reverse();
            // swell[j] sits at region.start - (ir_len - 1) + j.
            let offset = ir_len - 1 - lead;
            let swell = &swell[offset..];

            let mut samples = source.clone();
            for (i, s) in samples.iter_mut().enumerate() {
                let wet = swell.get(i).copied().unwrap_or(0.0);
                *s = if i < lead {
                    let fade = i as f32 / lead as f32;
                    *s + wet * fade * mix
                } else {
                    blend(*s, wet, mix)
                };
            }
            out.push(samples);
        }
        Ok(RenderedRegion::new(out, Placement::Overwrite { start }))
    }
}
