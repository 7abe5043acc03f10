//! Beat-sliced stutter: random slices are captured, mangled and repeated.

use log::debug;
use rand::Rng;

use super::{division_seconds, Effect, DIVISIONS};
use crate::buffer::{Region, RenderedRegion, SampleBuffer};
use crate::context::RenderContext;
use crate::dsp::resample::{repitch_wrapped, semitones_to_ratio};
use crate::error::FxError;
use crate::params::{EffectSchema, ParamSpec, ParamUnit, ResolvedParams};

pub struct Glitch;

/// Crossfade at each repeat boundary.
const DECLICK_SECONDS: f64 = 0.002;
/// Per-repeat wet level range.
const WET_RANGE: (f32, f32) = (0.8, 1.0);
/// At this depth quantization is skipped.
const FULL_BIT_DEPTH: u32 = 16;

static SCHEMA: EffectSchema = EffectSchema {
    id: "glitch",
    name: "Glitch",
    params: &[
        ParamSpec::choice("division", "Division", DIVISIONS, "1/16"),
        ParamSpec::float("probability", "Probability", ParamUnit::Ratio, 0.0, 1.0, 0.5),
        ParamSpec::float("repeats", "Repeats", ParamUnit::Count, 1.0, 8.0, 2.0),
        ParamSpec::float("reverse", "Reverse Chance", ParamUnit::Ratio, 0.0, 1.0, 0.3),
        ParamSpec::float("pitch", "Pitch", ParamUnit::Semitones, -12.0, 12.0, 0.0),
        ParamSpec::float("bit_depth", "Bit Depth", ParamUnit::Count, 2.0, 16.0, 16.0),
    ],
};

/// Quantize to `bits` of signed amplitude resolution.
#[inline]
pub fn crush(x: f32, bits: u32) -> f32 {
    if bits >= FULL_BIT_DEPTH {
        return x;
    }
    let levels = (1u32 << (bits.max(1) - 1)) as f32;
    (x * levels).round() / levels
}

/// Settings shared by every glitched slice of one render.
struct Mangle {
    repeats: usize,
    reverse_chance: f64,
    ratio: f64,
    bits: u32,
    declick: usize,
}

impl Mangle {
    /// Capture `[from, to)` of every channel, transform it, and write its
    /// head back `repeats` times across the slice.
    fn apply(&self, channels: &mut [Vec<f32>], from: usize, to: usize, rng: &mut impl Rng) {
        let reverse = rng.gen_bool(self.reverse_chance);
        let wets: Vec<f32> = (0..self.repeats)
            .map(|_| rng.gen_range(WET_RANGE.0..=WET_RANGE.1))
            .collect();
        let span = to - from;
        let segment = (span / self.repeats).max(1);

        for samples in channels.iter_mut() {
            let mut captured = samples[from..to].to_vec();
            if reverse {
                captured.reverse();
            }
            if self.ratio != 1.0 {
                captured = repitch_wrapped(&captured, self.ratio);
            }
            for s in captured.iter_mut() {
                *s = crush(*s, self.bits);
            }

            for (k, wet) in wets.iter().enumerate() {
                let seg_start = from + k * segment;
                if seg_start >= to {
                    break;
                }
                let seg_end = if k + 1 == self.repeats { to } else { (seg_start + segment).min(to) };
                let seg_len = seg_end - seg_start;
                let fade = self.declick.min(seg_len / 2).max(1);
                for j in 0..seg_len {
                    let edge = j.min(seg_len - 1 - j);
                    let ramp = if edge < fade { edge as f32 / fade as f32 } else { 1.0 };
                    let w = wet * ramp;
                    let s = &mut samples[seg_start + j];
                    *s = *s * (1.0 - w) + captured[j % captured.len()] * w;
                }
            }
        }
    }
}

impl Effect for Glitch {
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
        let slice_len = ctx.samples(division_seconds(params, "division", ctx)?).max(1);
        let probability = params.float("probability");
        let mangle = Mangle {
            repeats: params.count("repeats").max(1),
            reverse_chance: params.float("reverse"),
            ratio: semitones_to_ratio(params.float("pitch")),
            bits: params.count("bit_depth") as u32,
            declick: ctx.samples(DECLICK_SECONDS).max(1),
        };

        let mut channels = buffer.copy_region(region);
        let len = region.len();
        let mut glitched = 0usize;
        for from in (0..len).step_by(slice_len) {
            let to = (from + slice_len).min(len);
            if ctx.rng().gen_bool(probability) {
                mangle.apply(&mut channels, from, to, ctx.rng());
                glitched += 1;
            }
        }
        debug!(
            "glitch: {glitched} of {} slices of {slice_len} samples",
            len.div_ceil(slice_len)
        );
        Ok(RenderedRegion::region(channels))
    }
}
