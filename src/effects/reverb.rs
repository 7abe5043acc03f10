//! Convolution reverb against a procedurally generated impulse response.

use log::debug;

use super::{blend, choice, gain, Effect};
use crate::buffer::{Region, RenderedRegion, SampleBuffer};
use crate::context::RenderContext;
use crate::dsp::convolver::Convolver;
use crate::dsp::impulse::{self, ReverbPreset};
use crate::error::FxError;
use crate::params::{EffectSchema, ParamSpec, ParamUnit, ResolvedParams};

pub struct Reverb;

static SCHEMA: EffectSchema = EffectSchema {
    id: "reverb",
    name: "Reverb",
    params: &[
        ParamSpec::choice("preset", "Preset", ReverbPreset::IDS, "hall"),
        ParamSpec::float("decay", "Decay", ParamUnit::Ratio, 0.1, 3.0, 1.0),
        ParamSpec::float("pre_delay", "Pre-delay", ParamUnit::Seconds, 0.0, 0.2, 0.02),
        ParamSpec::float("mix", "Mix", ParamUnit::Ratio, 0.0, 1.0, 0.3),
        ParamSpec::float("output", "Output", ParamUnit::Decibels, -24.0, 12.0, 0.0),
    ],
};

/// Build one impulse response per channel, with pre-delay prepended.
pub(crate) fn impulse_responses(
    preset: ReverbPreset,
    decay_scale: f64,
    pre_delay: usize,
    ctx: &mut RenderContext,
) -> Vec<Vec<f32>> {
    let sr = ctx.sample_rate_f64();
    let channels = ctx.channels;
    let max_seconds = ctx.limits.max_ir_seconds;
    let irs = impulse::generate(preset.shape(), decay_scale, sr, channels, max_seconds, ctx.rng());
    irs.into_iter()
        .map(|ir| {
            if pre_delay == 0 {
                return ir;
            }
            let mut delayed = vec![0.0f32; pre_delay];
            delayed.extend(ir);
            delayed
        })
        .collect()
}

impl Effect for Reverb {
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
        let pre_delay = ctx.samples(params.float("pre_delay"));
        let irs = impulse_responses(preset, params.float("decay"), pre_delay, ctx);
        let mix = params.float("mix") as f32;
        let output = gain(params.float("output"));

        let mut channels = buffer.copy_region(region);
        for (ch, samples) in channels.iter_mut().enumerate() {
            let ir = &irs[ch % irs.len()];
            let wet = Convolver::new(ir).process(samples);
            for (s, w) in samples.iter_mut().zip(&wet) {
                *s = blend(*s, *w * output, mix);
            }
        }
        debug!(
            "reverb: {} sample impulse, tail past region end discarded",
            irs.first().map_or(0, |ir| ir.len())
        );
        Ok(RenderedRegion::region(channels))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effects::test_util::{rms, stereo_sine};
    use crate::effects::{render_effect, EffectKind};
    use crate::params::ParameterSet;

    fn run(buffer: &SampleBuffer, params: ParameterSet, seed: u64) -> Vec<Vec<f32>> {
        let mut ctx = RenderContext::new(buffer.sample_rate(), buffer.num_channels(), seed);
        render_effect(EffectKind::Reverb, buffer, Region::full(buffer).unwrap(), &params, &mut ctx)
            .unwrap()
            .channels
    }

    #[test]
    fn impulse_rings_after_the_hit() {
        let mut samples = vec![0.0f32; 8000];
        samples[0] = 0.5;
        let buffer = SampleBuffer::from_mono(samples, 8000).unwrap();
        let out = run(
            &buffer,
            ParameterSet::new().with("preset", "room").with("mix", 1.0).with("pre_delay", 0.0),
            3,
        );
        assert!(rms(&out[0][100..2000]) > 1e-4);
        assert!(rms(&out[0][100..2000]) > rms(&out[0][6000..]));
    }

    #[test]
    fn pre_delay_keeps_the_start_dry() {
        let mut samples = vec![0.0f32; 4000];
        samples[0] = 0.5;
        let buffer = SampleBuffer::from_mono(samples, 8000).unwrap();
        let out = run(
            &buffer,
            ParameterSet::new().with("mix", 1.0).with("pre_delay", 0.1),
            3,
        );
        // 100 ms at 8 kHz
        assert!(out[0][..790].iter().all(|s| s.abs() < 1e-6));
        assert!(out[0][800..1200].iter().any(|s| s.abs() > 1e-4));
    }

    #[test]
    fn seed_changes_the_room() {
        let buffer = stereo_sine(300.0, 0.5, 4000, 8000);
        let a = run(&buffer, ParameterSet::new(), 1);
        let b = run(&buffer, ParameterSet::new(), 2);
        assert_ne!(a, b);
    }

    #[test]
    fn channels_are_decorrelated() {
        let buffer = stereo_sine(300.0, 0.5, 4000, 8000);
        let out = run(&buffer, ParameterSet::new().with("mix", 1.0), 5);
        assert_ne!(out[0], out[1]);
    }

    #[test]
    fn long_decay_respects_limit() {
        let mut ctx = RenderContext::new(8000, 1, 0);
        ctx.limits.max_ir_seconds = 0.5;
        let irs = impulse_responses(ReverbPreset::Cave, 3.0, 0, &mut ctx);
        assert!(irs[0].len() <= 4000);
    }
}
