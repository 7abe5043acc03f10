//! Biquad filter with an LFO sweeping the cutoff.

use super::{blend, choice, division_seconds, Effect, DIVISIONS};
use crate::buffer::{Region, RenderedRegion, SampleBuffer};
use crate::context::RenderContext;
use crate::dsp::filter::{BiquadFilter, FilterType};
use crate::dsp::oscillator::{Lfo, Waveform};
use crate::error::FxError;
use crate::params::{EffectSchema, ParamSpec, ParamUnit, ResolvedParams};

pub struct Filter;

/// Samples between cutoff updates while modulating.
const CONTROL_BLOCK: usize = 16;
const MIN_CUTOFF: f64 = 20.0;

static SCHEMA: EffectSchema = EffectSchema {
    id: "filter",
    name: "Filter",
    params: &[
        ParamSpec::choice("type", "Type", FilterType::IDS, "lowpass"),
        ParamSpec::float("frequency", "Frequency", ParamUnit::Hertz, 20.0, 20000.0, 1000.0),
        ParamSpec::float("resonance", "Resonance", ParamUnit::Ratio, 0.1, 30.0, 1.0),
        ParamSpec::float("gain", "Gain", ParamUnit::Decibels, -24.0, 24.0, 0.0),
        ParamSpec::choice("lfo_waveform", "LFO Waveform", Waveform::IDS, "sine"),
        ParamSpec::float("lfo_rate", "LFO Rate", ParamUnit::Hertz, 0.01, 20.0, 1.0),
        ParamSpec::float("lfo_depth", "LFO Depth", ParamUnit::Ratio, 0.0, 1.0, 0.0),
        ParamSpec::toggle("tempo_sync", "Tempo Sync", false),
        ParamSpec::choice("division", "Division", DIVISIONS, "1/4"),
        ParamSpec::float("mix", "Mix", ParamUnit::Ratio, 0.0, 1.0, 1.0),
    ],
};

impl Effect for Filter {
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
        let filter_type = choice(params, "type", FilterType::from_id)?;
        let waveform = choice(params, "lfo_waveform", Waveform::from_id)?;
        let base = params.float("frequency");
        let q = params.float("resonance");
        let gain_db = params.float("gain");
        let depth = params.float("lfo_depth");
        let rate = if params.toggle("tempo_sync") {
            1.0 / division_seconds(params, "division", ctx)?
        } else {
            params.float("lfo_rate")
        };
        let mix = params.float("mix") as f32;

        let mut channels = buffer.copy_region(region);
        for ch in channels.iter_mut() {
            let mut filter = BiquadFilter::with_params(filter_type, sr, base, q, gain_db);
            let mut lfo = Lfo::new(waveform, rate, sr);
            for (i, s) in ch.iter_mut().enumerate() {
                if depth > 0.0 && i % CONTROL_BLOCK == 0 {
                    let cutoff = base * (1.0 + depth * lfo.next_sample());
                    filter.set_frequency(cutoff.max(MIN_CUTOFF));
                    lfo.advance(CONTROL_BLOCK - 1);
                }
                let wet = filter.process(*s as f64) as f32;
                *s = blend(*s, wet, mix);
            }
        }
        Ok(RenderedRegion::region(channels))
    }
}
