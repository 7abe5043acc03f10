//! Peak limiter with lookahead detection and five algorithm presets.

use std::collections::VecDeque;

use super::{choice, Effect};
use crate::buffer::{Region, RenderedRegion, SampleBuffer};
use crate::context::RenderContext;
use crate::dsp::curves::{compression_amount, db_to_linear, limiter_gain_db, linear_to_db, KneeShape, Saturation};
use crate::error::FxError;
use crate::params::{EffectSchema, ParamSpec, ParamUnit, ResolvedParams};

pub struct Limiter;

static SCHEMA: EffectSchema = EffectSchema {
    id: "limiter",
    name: "Limiter",
    params: &[
        ParamSpec::float("ceiling", "Ceiling", ParamUnit::Decibels, -24.0, 0.0, -1.0),
        ParamSpec::float("lookahead", "Lookahead", ParamUnit::Milliseconds, 0.0, 20.0, 5.0),
        ParamSpec::float("release", "Release", ParamUnit::Seconds, 0.001, 1.0, 0.05),
        ParamSpec::choice("algorithm", "Algorithm", Algorithm::IDS, "transparent"),
    ],
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Algorithm {
    Transparent,
    Vintage,
    Aggressive,
    Mastering,
    Brickwall,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Coloration {
    Clean,
    Warmth,
    Punch,
}

/// Stages of the mastering cascade, as (offset below ceiling dB, ratio).
const MASTERING_STAGES: [(f64, f64); 3] = [(6.0, 2.0), (3.0, 4.0), (0.5, 10.0)];

impl Algorithm {
    const IDS: &'static [&'static str] = &["transparent", "vintage", "aggressive", "mastering", "brickwall"];

    fn from_id(id: &str) -> Option<Self> {
        Some(match id {
            "transparent" => Algorithm::Transparent,
            "vintage" => Algorithm::Vintage,
            "aggressive" => Algorithm::Aggressive,
            "mastering" => Algorithm::Mastering,
            "brickwall" => Algorithm::Brickwall,
            _ => return None,
        })
    }

    /// Knee width in dB and curve shape.
    fn knee(self) -> (f64, KneeShape) {
        match self {
            Algorithm::Transparent => (3.0, KneeShape::Sine),
            Algorithm::Vintage => (6.0, KneeShape::SCurve),
            Algorithm::Aggressive => (1.0, KneeShape::PowerLaw),
            Algorithm::Mastering | Algorithm::Brickwall => (0.0, KneeShape::Linear),
        }
    }

    fn coloration(self) -> Coloration {
        match self {
            Algorithm::Vintage => Coloration::Warmth,
            Algorithm::Aggressive => Coloration::Punch,
            _ => Coloration::Clean,
        }
    }

    /// Gain (dB, <= 0) for a detected peak level.
    fn gain_db(self, level_db: f64, ceiling_db: f64) -> f64 {
        match self {
            Algorithm::Mastering => {
                let mut level = level_db;
                for (offset, ratio) in MASTERING_STAGES {
                    level -= compression_amount(level, ceiling_db - offset, ratio, 0.0);
                }
                // Whatever the cascade leaves above the ceiling is clamped.
                let out = level.min(ceiling_db);
                out - level_db
            }
            _ => {
                let (knee, shape) = self.knee();
                limiter_gain_db(level_db, ceiling_db, knee, shape)
            }
        }
    }
}

impl Coloration {
    fn saturation(self) -> Saturation {
        match self {
            Coloration::Clean => Saturation::None,
            Coloration::Warmth => Saturation::Tanh { amount: 0.2 },
            Coloration::Punch => Saturation::PowerLaw { exponent: 0.85 },
        }
    }
}

/// Peak level of every frame in `[from, to)` across channels.
fn frame_peaks(buffer: &SampleBuffer, from: usize, to: usize) -> Vec<f32> {
    (from..to)
        .map(|i| {
            buffer
                .channels()
                .iter()
                .fold(0.0f32, |m, c| m.max(c[i].abs()))
        })
        .collect()
}

/// Sliding maximum of `peaks[i..=i + window]`, for each `i < len`.
fn lookahead_max(peaks: &[f32], len: usize, window: usize) -> Vec<f32> {
    let mut out = Vec::with_capacity(len);
    let mut deque: VecDeque<usize> = VecDeque::new();
    let mut next = 0;
    for i in 0..len {
        let reach = (i + window).min(peaks.len().saturating_sub(1));
        while next <= reach {
            while deque.back().is_some_and(|&b| peaks[b] <= peaks[next]) {
                deque.pop_back();
            }
            deque.push_back(next);
            next += 1;
        }
        while deque.front().is_some_and(|&f| f < i) {
            deque.pop_front();
        }
        out.push(deque.front().map_or(0.0, |&f| peaks[f]));
    }
    out
}

impl Effect for Limiter {
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
        let algorithm = choice(params, "algorithm", Algorithm::from_id)?;
        let ceiling_db = params.float("ceiling");
        let ceiling = db_to_linear(ceiling_db) as f32;
        let lookahead = ctx.samples(params.float("lookahead") / 1000.0);
        let release_coef = (-1.0 / (params.float("release") * ctx.sample_rate_f64())).exp();
        let saturation = algorithm.coloration().saturation();

        // Detection may look past the region end into audio that follows it.
        let detect_end = (region.end + lookahead).min(buffer.len());
        let peaks = frame_peaks(buffer, region.start, detect_end);
        let detected = lookahead_max(&peaks, region.len(), lookahead);

        let mut channels = buffer.copy_region(region);
        let mut gain_db = 0.0f64;
        for (i, &level) in detected.iter().enumerate() {
            let target = algorithm.gain_db(linear_to_db(level as f64), ceiling_db);
            gain_db = if target < gain_db {
                target
            } else {
                target + (gain_db - target) * release_coef
            };
            let g = db_to_linear(gain_db) as f32;
            for ch in channels.iter_mut() {
                let x = ch[i] * g;
                let colored = match saturation {
                    Saturation::None => x,
                    s => ceiling * s.apply(x / ceiling),
                };
                ch[i] = colored.clamp(-ceiling, ceiling);
            }
        }
        Ok(RenderedRegion::region(channels))
    }
}
