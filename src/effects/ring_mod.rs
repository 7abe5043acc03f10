//! Ring, amplitude, frequency and sync modulation against a band-limited
//! carrier.

use log::{debug, warn};

use super::{blend, choice, Effect};
use crate::buffer::{Region, RenderedRegion, SampleBuffer};
use crate::context::RenderContext;
use crate::dsp::delay::DelayLine;
use crate::dsp::oscillator::{Carrier, CarrierWave};
use crate::dsp::pitch::detect_pitch;
use crate::error::FxError;
use crate::params::{EffectSchema, ParamSpec, ParamUnit, ResolvedParams};

pub struct RingModulator;

/// Deepest FM excursion, in seconds of delay.
const FM_MAX_DEVIATION: f64 = 0.005;
const MIN_CARRIER_HZ: f64 = 0.1;
const PITCH_RANGE: (f64, f64) = (50.0, 2000.0);

static SCHEMA: EffectSchema = EffectSchema {
    id: "ring_modulator",
    name: "Ring Modulator",
    params: &[
        ParamSpec::choice("waveform", "Waveform", CarrierWave::IDS, "sine"),
        ParamSpec::float("frequency", "Frequency", ParamUnit::Hertz, 1.0, 5000.0, 440.0),
        ParamSpec::float("offset", "Offset", ParamUnit::Hertz, -1000.0, 1000.0, 0.0),
        ParamSpec::choice("mode", "Mode", Mode::IDS, "ring"),
        ParamSpec::float("depth", "Depth", ParamUnit::Ratio, 0.0, 1.0, 1.0),
        ParamSpec::toggle("pitch_sync", "Pitch Sync", false),
        ParamSpec::float("harmonic", "Harmonic", ParamUnit::Count, 1.0, 8.0, 1.0),
        ParamSpec::float("stereo_spread", "Stereo Spread", ParamUnit::Ratio, 0.0, 1.0, 0.0),
        ParamSpec::float("mix", "Mix", ParamUnit::Ratio, 0.0, 1.0, 1.0),
    ],
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Ring,
    Amplitude,
    Frequency,
    Sync,
}

impl Mode {
    const IDS: &'static [&'static str] = &["ring", "am", "fm", "sync"];

    fn from_id(id: &str) -> Option<Self> {
        Some(match id {
            "ring" => Mode::Ring,
            "am" => Mode::Amplitude,
            "fm" => Mode::Frequency,
            "sync" => Mode::Sync,
            _ => return None,
        })
    }
}

/// Carrier frequency for this render, locked to the detected fundamental
/// when pitch sync is on and the region is pitched.
fn carrier_frequency(params: &ResolvedParams, buffer: &SampleBuffer, region: Region) -> f64 {
    let offset = params.float("offset");
    let manual = params.float("frequency");
    if !params.toggle("pitch_sync") {
        return (manual + offset).max(MIN_CARRIER_HZ);
    }
    let mono = buffer.mono_range(region.start, region.end);
    match detect_pitch(&mono, buffer.sample_rate(), PITCH_RANGE.0, PITCH_RANGE.1) {
        Some(est) if est.is_pitched() => {
            let locked = est.frequency * params.count("harmonic") as f64;
            debug!("ring modulator locked to {:.1} Hz (confidence {:.2})", locked, est.confidence);
            (locked + offset).max(MIN_CARRIER_HZ)
        }
        _ => {
            warn!("ring modulator: no stable pitch in region, using {manual} Hz");
            (manual + offset).max(MIN_CARRIER_HZ)
        }
    }
}

impl Effect for RingModulator {
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
        let wave = choice(params, "waveform", CarrierWave::from_id)?;
        let mode = choice(params, "mode", Mode::from_id)?;
        let frequency = carrier_frequency(params, buffer, region);
        let depth = params.float("depth") as f32;
        let spread = params.float("stereo_spread");
        let mix = params.float("mix") as f32;
        let max_deviation = FM_MAX_DEVIATION * sr;

        // Without spread every channel shares one carrier, noise included.
        let shared = ctx.fork_rng();
        let mut channels = buffer.copy_region(region);
        for (ch, samples) in channels.iter_mut().enumerate() {
            let phase = spread * 0.5 * ch as f64;
            let rng = if spread > 0.0 { ctx.fork_rng() } else { shared.clone() };
            let mut carrier = Carrier::new(wave, frequency, sr, rng).with_phase(phase);
            let mut line = DelayLine::new(max_deviation.ceil() as usize + 1);
            let mut previous = 0.0f32;
            for s in samples.iter_mut() {
                let x = *s;
                if mode == Mode::Sync && previous <= 0.0 && x > 0.0 {
                    carrier.reset_phase(phase);
                }
                previous = x;
                let c = carrier.next_sample();
                let wet = match mode {
                    Mode::Ring | Mode::Sync => x * c,
                    Mode::Amplitude => x * (1.0 + depth * c) / (1.0 + depth),
                    Mode::Frequency => {
                        line.write(x);
                        let delay = depth as f64 * max_deviation * (1.0 + c as f64) * 0.5;
                        line.read_fractional(delay)
                    }
                };
                *s = blend(x, wet, mix);
            }
        }
        Ok(RenderedRegion::region(channels))
    }
}
