//! Phaser: a cascade of swept allpass stages with feedback.

use super::{blend, Effect};
use crate::buffer::{Region, RenderedRegion, SampleBuffer};
use crate::context::RenderContext;
use crate::dsp::filter::{BiquadFilter, FilterType};
use crate::dsp::oscillator::{Lfo, Waveform};
use crate::error::FxError;
use crate::params::{EffectSchema, ParamSpec, ParamUnit, ResolvedParams};

pub struct Phaser;

pub const MAX_FEEDBACK: f64 = 0.9;
const STAGE_Q: f64 = 0.5;
const CONTROL_BLOCK: usize = 16;

static SCHEMA: EffectSchema = EffectSchema {
    id: "phaser",
    name: "Phaser",
    params: &[
        ParamSpec::float("stages", "Stages", ParamUnit::Count, 2.0, 12.0, 4.0),
        ParamSpec::float("rate", "Rate", ParamUnit::Hertz, 0.05, 5.0, 0.5),
        ParamSpec::float("min_frequency", "Min Frequency", ParamUnit::Hertz, 50.0, 2000.0, 300.0),
        ParamSpec::float("max_frequency", "Max Frequency", ParamUnit::Hertz, 500.0, 10000.0, 3000.0),
        ParamSpec::float("feedback", "Feedback", ParamUnit::Ratio, 0.0, 0.95, 0.5),
        ParamSpec::float("stereo", "Stereo Width", ParamUnit::Ratio, 0.0, 1.0, 0.5),
        ParamSpec::float("mix", "Mix", ParamUnit::Ratio, 0.0, 1.0, 0.5),
    ],
};

impl Effect for Phaser {
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
        let sr = ctx.sample_rate_f64();
        let stages = params.count("stages").clamp(2, 12);
        let rate = params.float("rate");
        let nyquist_guard = sr * 0.45;
        let (a, b) = (params.float("min_frequency"), params.float("max_frequency"));
        let low = a.min(b).min(nyquist_guard);
        let high = a.max(b).min(nyquist_guard);
        let feedback = params.float("feedback").min(MAX_FEEDBACK);
        let stereo = params.float("stereo");
        let mix = params.float("mix") as f32;

        let mut channels = buffer.copy_region(region);
        for (ch, samples) in channels.iter_mut().enumerate() {
            let mut chain: Vec<BiquadFilter> = (0..stages)
                .map(|_| BiquadFilter::with_params(FilterType::Allpass, sr, low, STAGE_Q, 0.0))
                .collect();
            let mut lfo = Lfo::new(Waveform::Sine, rate, sr).with_phase(0.5 * stereo * ch as f64);
            let mut last = 0.0f64;
            for (i, s) in samples.iter_mut().enumerate() {
                if i % CONTROL_BLOCK == 0 {
                    // Exponential sweep between the two corners.
                    let t = (1.0 + lfo.next_sample()) * 0.5;
                    let freq = low * (high / low).powf(t);
                    for stage in chain.iter_mut() {
                        stage.set_frequency(freq);
                    }
                    lfo.advance(CONTROL_BLOCK - 1);
                }
                let input = *s as f64 + last * feedback;
                let wet = chain.iter_mut().fold(input, |v, f| f.process(v));
                last = wet;
                *s = blend(*s, wet as f32, mix);
            }
        }
        Ok(RenderedRegion::region(channels))
    }
}
