//! Waveshaping distortion with a tone stack and 4x oversampling.

use super::{blend, choice, gain, Effect};
use crate::buffer::{Region, RenderedRegion, SampleBuffer};
use crate::context::RenderContext;
use crate::dsp::curves::{distortion_curve, lookup, DistortionKind, CURVE_SIZE};
use crate::dsp::filter::{BiquadFilter, FilterType};
use crate::dsp::oversample::Oversampler;
use crate::error::FxError;
use crate::params::{EffectSchema, ParamSpec, ParamUnit, ResolvedParams};

pub struct Distortion;

const OVERSAMPLE_FACTOR: usize = 4;

static SCHEMA: EffectSchema = EffectSchema {
    id: "distortion",
    name: "Distortion",
    params: &[
        ParamSpec::choice("type", "Type", DistortionKind::IDS, "tube"),
        ParamSpec::float("drive", "Drive", ParamUnit::Percent, 0.0, 100.0, 20.0),
        ParamSpec::float("asymmetry", "Asymmetry", ParamUnit::Ratio, -1.0, 1.0, 0.0),
        ParamSpec::float("harmonics", "Harmonics", ParamUnit::Ratio, 0.0, 1.0, 0.0),
        ParamSpec::float("bass", "Bass", ParamUnit::Decibels, -12.0, 12.0, 0.0),
        ParamSpec::float("mid", "Mid", ParamUnit::Decibels, -12.0, 12.0, 0.0),
        ParamSpec::float("treble", "Treble", ParamUnit::Decibels, -12.0, 12.0, 0.0),
        ParamSpec::float("presence", "Presence", ParamUnit::Decibels, -12.0, 12.0, 0.0),
        ParamSpec::choice("tone_position", "Tone Position", &["pre", "post"], "post"),
        ParamSpec::toggle("oversample", "Oversample", true),
        ParamSpec::float("mix", "Mix", ParamUnit::Ratio, 0.0, 1.0, 1.0),
        ParamSpec::float("output", "Output", ParamUnit::Decibels, -24.0, 12.0, 0.0),
    ],
};

/// Bass, mid, treble and presence bands.
struct ToneStack {
    bands: [BiquadFilter; 4],
    active: bool,
}

impl ToneStack {
    fn new(params: &ResolvedParams, sample_rate: f64) -> Self {
        let (bass, mid, treble, presence) = (
            params.float("bass"),
            params.float("mid"),
            params.float("treble"),
            params.float("presence"),
        );
        ToneStack {
            bands: [
                BiquadFilter::with_params(FilterType::LowShelf, sample_rate, 100.0, 0.707, bass),
                BiquadFilter::with_params(FilterType::Peaking, sample_rate, 1000.0, 0.7, mid),
                BiquadFilter::with_params(FilterType::HighShelf, sample_rate, 3500.0, 0.707, treble),
                BiquadFilter::with_params(FilterType::Peaking, sample_rate, 6000.0, 1.0, presence),
            ],
            active: [bass, mid, treble, presence].iter().any(|g| *g != 0.0),
        }
    }

    #[inline]
    fn process(&mut self, x: f32) -> f32 {
        if !self.active {
            return x;
        }
        let y = self.bands.iter_mut().fold(x as f64, |v, b| b.process(v));
        y as f32
    }
}

/// Second and third harmonics of a shaped sample.
#[inline]
fn overtones(y: f32) -> f32 {
    let theta = y.clamp(-1.0, 1.0).asin();
    (2.0 * theta).sin() * 0.5 + (3.0 * theta).sin() * 0.25
}

impl Effect for Distortion {
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
        let kind = choice(params, "type", DistortionKind::from_id)?;
        let drive = params.float("drive");
        let table = distortion_curve(kind, drive, params.float("asymmetry"), CURVE_SIZE);
        let harmonic_amount = (params.float("harmonics") * drive / 100.0) as f32;
        let tone_pre = params.choice("tone_position") == "pre";
        let factor = if params.toggle("oversample") { OVERSAMPLE_FACTOR } else { 1 };
        let mix = params.float("mix") as f32;
        let output = gain(params.float("output"));

        let mut channels = buffer.copy_region(region);
        for ch in channels.iter_mut() {
            let mut tone = ToneStack::new(params, sr);
            let mut oversampler = Oversampler::new(factor, sr);
            for s in ch.iter_mut() {
                let dry = *s;
                let mut x = dry;
                if tone_pre {
                    x = tone.process(x);
                }
                x = oversampler.process(x, |v| {
                    let y = lookup(&table, v);
                    if harmonic_amount > 0.0 {
                        y + harmonic_amount * overtones(y)
                    } else {
                        y
                    }
                });
                if !tone_pre {
                    x = tone.process(x);
                }
                *s = blend(dry, x, mix) * output;
            }
        }
        Ok(RenderedRegion::region(channels))
    }
}
