//! Flanger: short swept delay with feedback.

use super::{blend, Effect};
use crate::buffer::{Region, RenderedRegion, SampleBuffer};
use crate::context::RenderContext;
use crate::dsp::delay::DelayLine;
use crate::dsp::oscillator::{Lfo, Waveform};
use crate::error::FxError;
use crate::params::{EffectSchema, ParamSpec, ParamUnit, ResolvedParams};

pub struct Flanger;

const MIN_DELAY_SECONDS: f64 = 0.001;
const MAX_DELAY_SECONDS: f64 = 0.010;
pub const MAX_FEEDBACK: f64 = 0.9;

static SCHEMA: EffectSchema = EffectSchema {
    id: "flanger",
    name: "Flanger",
    params: &[
        ParamSpec::float("rate", "Rate", ParamUnit::Hertz, 0.05, 5.0, 0.25),
        ParamSpec::float("depth", "Depth", ParamUnit::Ratio, 0.0, 1.0, 0.7),
        ParamSpec::float("feedback", "Feedback", ParamUnit::Ratio, 0.0, 0.95, 0.5),
        ParamSpec::float("stereo", "Stereo Width", ParamUnit::Ratio, 0.0, 1.0, 0.5),
        ParamSpec::float("mix", "Mix", ParamUnit::Ratio, 0.0, 1.0, 0.5),
    ],
};

impl Effect for Flanger {
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
        let rate = params.float("rate");
        let depth = params.float("depth");
        let feedback = params.float("feedback").min(MAX_FEEDBACK) as f32;
        let stereo = params.float("stereo");
        let mix = params.float("mix") as f32;
        let sweep = (MAX_DELAY_SECONDS - MIN_DELAY_SECONDS) * sr;
        let min_delay = (MIN_DELAY_SECONDS * sr).max(1.0);

        let mut channels = buffer.copy_region(region);
        for (ch, samples) in channels.iter_mut().enumerate() {
            let mut line = DelayLine::with_seconds(MAX_DELAY_SECONDS, sr);
            let mut lfo = Lfo::new(Waveform::Triangle, rate, sr).with_phase(0.5 * stereo * ch as f64);
            for s in samples.iter_mut() {
                let delay = min_delay + sweep * depth * (1.0 + lfo.next_sample()) * 0.5;
                // Read before the write: `delay - 1` back from the newest sample.
                let wet = line.read_fractional(delay - 1.0);
                line.write(*s + wet * feedback);
                *s = blend(*s, wet, mix);
            }
        }
        Ok(RenderedRegion::region(channels))
    }
}
