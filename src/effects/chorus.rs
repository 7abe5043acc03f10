//! Chorus: LFO-modulated delay for thickening sound.

use super::{blend, Effect};
use crate::buffer::{Region, RenderedRegion, SampleBuffer};
use crate::context::RenderContext;
use crate::dsp::delay::DelayLine;
use crate::dsp::oscillator::{Lfo, Waveform};
use crate::error::FxError;
use crate::params::{EffectSchema, ParamSpec, ParamUnit, ResolvedParams};

pub struct Chorus;

const MAX_DELAY_SECONDS: f64 = 0.05;
/// Per-channel LFO offset at full stereo width (90 degrees).
const STEREO_PHASE: f64 = 0.25;

static SCHEMA: EffectSchema = EffectSchema {
    id: "chorus",
    name: "Chorus",
    params: &[
        ParamSpec::float("rate", "Rate", ParamUnit::Hertz, 0.1, 10.0, 1.5),
        ParamSpec::float("depth", "Depth", ParamUnit::Milliseconds, 0.0, 10.0, 2.0),
        ParamSpec::float("delay", "Delay", ParamUnit::Milliseconds, 5.0, 30.0, 15.0),
        ParamSpec::float("stereo", "Stereo Width", ParamUnit::Ratio, 0.0, 1.0, 1.0),
        ParamSpec::float("mix", "Mix", ParamUnit::Ratio, 0.0, 1.0, 0.5),
    ],
};

impl Effect for Chorus {
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
        let depth = params.float("depth") / 1000.0;
        let base = params.float("delay") / 1000.0;
        let stereo = params.float("stereo");
        let mix = params.float("mix") as f32;

        let mut channels = buffer.copy_region(region);
        for (ch, samples) in channels.iter_mut().enumerate() {
            let mut line = DelayLine::with_seconds(MAX_DELAY_SECONDS, sr);
            let mut lfo = Lfo::new(Waveform::Sine, rate, sr).with_phase(STEREO_PHASE * stereo * ch as f64);
            let max_delay = line.max_delay() as f64;
            for s in samples.iter_mut() {
                line.write(*s);
                let delay = ((base + depth * lfo.next_sample()) * sr).clamp(1.0, max_delay);
                let wet = line.read_fractional(delay);
                *s = blend(*s, wet, mix);
            }
        }
        Ok(RenderedRegion::region(channels))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effects::test_util::stereo_sine;
    use crate::effects::{render_effect, EffectKind};
    use crate::params::ParameterSet;

    fn run(buffer: &SampleBuffer, params: ParameterSet) -> Vec<Vec<f32>> {
        let mut ctx = RenderContext::new(buffer.sample_rate(), buffer.num_channels(), 0);
        render_effect(EffectKind::Chorus, buffer, Region::full(buffer).unwrap(), &params, &mut ctx)
            .unwrap()
            .channels
    }

    #[test]
    fn still_lfo_is_a_plain_delay() {
        let buffer = stereo_sine(50.0, 0.5, 2000, 8000);
        let out = run(&buffer, ParameterSet::new().with("depth", 0.0).with("mix", 1.0));
        // 15 ms at 8 kHz
        let input = buffer.channel(0);
        for i in 120..2000 {
            assert_eq!(out[0][i], input[i - 120], "index {i}");
        }
        assert!(out[0][..120].iter().all(|s| *s == 0.0));
    }

    #[test]
    fn stereo_width_separates_channels() {
        let buffer = stereo_sine(200.0, 0.5, 4000, 8000);
        let mono = run(&buffer, ParameterSet::new().with("stereo", 0.0));
        assert_eq!(mono[0], mono[1]);
        let wide = run(&buffer, ParameterSet::new().with("depth", 5.0));
        assert_ne!(wide[0], wide[1]);
    }

    #[test]
    fn dry_mix_is_identity() {
        let buffer = stereo_sine(200.0, 0.5, 1000, 8000);
        let out = run(&buffer, ParameterSet::new().with("mix", 0.0));
        assert_eq!(out[1], buffer.channel(1));
    }
}
