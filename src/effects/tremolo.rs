//! Tremolo: LFO amplitude modulation, optionally tempo-synced.

use super::{choice, division_seconds, Effect, DIVISIONS};
use crate::buffer::{Region, RenderedRegion, SampleBuffer};
use crate::context::RenderContext;
use crate::dsp::oscillator::{Lfo, Waveform};
use crate::error::FxError;
use crate::params::{EffectSchema, ParamSpec, ParamUnit, ResolvedParams};

pub struct Tremolo;

static SCHEMA: EffectSchema = EffectSchema {
    id: "tremolo",
    name: "Tremolo",
    params: &[
        ParamSpec::choice("waveform", "Waveform", Waveform::IDS, "sine"),
        ParamSpec::float("rate", "Rate", ParamUnit::Hertz, 0.1, 20.0, 5.0),
        ParamSpec::float("depth", "Depth", ParamUnit::Ratio, 0.0, 1.0, 0.5),
        ParamSpec::toggle("tempo_sync", "Tempo Sync", false),
        ParamSpec::choice("division", "Division", DIVISIONS, "1/8"),
        ParamSpec::float("stereo_phase", "Stereo Phase", ParamUnit::Ratio, 0.0, 1.0, 0.0),
    ],
};

impl Effect for Tremolo {
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
        let waveform = choice(params, "waveform", Waveform::from_id)?;
        let rate = if params.toggle("tempo_sync") {
            1.0 / division_seconds(params, "division", ctx)?
        } else {
            params.float("rate")
        };
        let depth = params.float("depth");
        // 1.0 puts the second channel half a cycle behind.
        let offset = params.float("stereo_phase") * 0.5;

        let mut channels = buffer.copy_region(region);
        for (ch, samples) in channels.iter_mut().enumerate() {
            let mut lfo = Lfo::new(waveform, rate, sr).with_phase(offset * ch as f64);
            for s in samples.iter_mut() {
                let gain = 1.0 - depth * (1.0 - lfo.next_sample()) * 0.5;
                *s *= gain as f32;
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
    use crate::tempo::Tempo;

    fn run(buffer: &SampleBuffer, params: ParameterSet, ctx: &mut RenderContext) -> Vec<Vec<f32>> {
        render_effect(EffectKind::Tremolo, buffer, Region::full(buffer).unwrap(), &params, ctx)
            .unwrap()
            .channels
    }

    #[test]
    fn full_depth_square_chops() {
        let buffer = SampleBuffer::from_mono(vec![0.5; 200], 1000).unwrap();
        let mut ctx = RenderContext::new(1000, 1, 0);
        let out = run(
            &buffer,
            ParameterSet::new()
                .with("waveform", "square")
                .with("rate", 10.0)
                .with("depth", 1.0),
            &mut ctx,
        );
        // 10 Hz at 1 kHz: 50 samples on, 50 off.
        assert!(out[0][..49].iter().all(|s| *s == 0.5));
        assert!(out[0][51..99].iter().all(|s| *s == 0.0));
    }

    #[test]
    fn zero_depth_is_identity() {
        let buffer = stereo_sine(200.0, 0.5, 2000, 8000);
        let mut ctx = RenderContext::new(8000, 2, 0);
        let out = run(&buffer, ParameterSet::new().with("depth", 0.0), &mut ctx);
        assert_eq!(out[0], buffer.channel(0));
    }

    #[test]
    fn synced_rate_follows_tempo() {
        // 1/4 at 60 BPM = 1 Hz: the gain never dips in the first quarter cycle.
        let buffer = SampleBuffer::from_mono(vec![0.5; 1000], 1000).unwrap();
        let mut ctx = RenderContext::new(1000, 1, 0).with_tempo(Tempo::new(60.0));
        let out = run(
            &buffer,
            ParameterSet::new()
                .with("waveform", "square")
                .with("depth", 1.0)
                .with("tempo_sync", true)
                .with("division", "1/4"),
            &mut ctx,
        );
        assert!(out[0][..490].iter().all(|s| *s == 0.5));
        assert!(out[0][510..990].iter().all(|s| *s == 0.0));
    }

    #[test]
    fn stereo_phase_offsets_the_right_channel() {
        let buffer = stereo_sine(200.0, 0.5, 2000, 8000);
        let mut ctx = RenderContext::new(8000, 2, 0);
        let out = run(&buffer, ParameterSet::new().with("stereo_phase", 1.0), &mut ctx);
        assert_ne!(out[0], out[1]);
    }
}
