//! Compressor with stereo-linked, mid/side and multiband modes.

use log::warn;

use super::{blend, choice, Effect};
use crate::buffer::{Region, RenderedRegion, SampleBuffer};
use crate::context::RenderContext;
use crate::dsp::crossover::MultibandCrossover;
use crate::dsp::curves::auto_makeup_db;
use crate::dsp::dynamics::{CompressorModel, DynamicsKernel, DynamicsSettings};
use crate::dsp::midside::MidSideCodec;
use crate::error::FxError;
use crate::params::{EffectSchema, ParamSpec, ParamUnit, ResolvedParams};

pub struct Compressor;

static SCHEMA: EffectSchema = EffectSchema {
    id: "compressor",
    name: "Compressor",
    params: &[
        ParamSpec::float("threshold", "Threshold", ParamUnit::Decibels, -60.0, 0.0, -24.0),
        ParamSpec::float("ratio", "Ratio", ParamUnit::Ratio, 1.0, 20.0, 4.0),
        ParamSpec::float("attack", "Attack", ParamUnit::Seconds, 0.0, 1.0, 0.003),
        ParamSpec::float("release", "Release", ParamUnit::Seconds, 0.0, 1.0, 0.25),
        ParamSpec::float("knee", "Knee", ParamUnit::Decibels, 0.0, 40.0, 6.0),
        ParamSpec::float("makeup", "Makeup", ParamUnit::Decibels, 0.0, 24.0, 0.0),
        ParamSpec::toggle("auto_makeup", "Auto Makeup", false),
        ParamSpec::choice("model", "Model", CompressorModel::IDS, "clean"),
        ParamSpec::choice("mode", "Mode", Mode::IDS, "stereo"),
        ParamSpec::float("side_threshold", "Side Threshold", ParamUnit::Decibels, -60.0, 0.0, -24.0),
        ParamSpec::float("side_ratio", "Side Ratio", ParamUnit::Ratio, 1.0, 20.0, 2.0),
        ParamSpec::float("bands", "Bands", ParamUnit::Count, 2.0, 4.0, 3.0),
        ParamSpec::float("low_crossover", "Low Crossover", ParamUnit::Hertz, 20.0, 1000.0, 200.0),
        ParamSpec::float("mid_crossover", "Mid Crossover", ParamUnit::Hertz, 200.0, 8000.0, 2000.0),
        ParamSpec::float("high_crossover", "High Crossover", ParamUnit::Hertz, 2000.0, 16000.0, 8000.0),
        ParamSpec::float("mix", "Mix", ParamUnit::Ratio, 0.0, 1.0, 1.0),
    ],
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Stereo,
    MidSide,
    Multiband,
}

impl Mode {
    const IDS: &'static [&'static str] = &["stereo", "mid_side", "multiband"];

    fn from_id(id: &str) -> Option<Self> {
        Some(match id {
            "stereo" => Mode::Stereo,
            "mid_side" => Mode::MidSide,
            "multiband" => Mode::Multiband,
            _ => return None,
        })
    }
}

impl Effect for Compressor {
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
        let model = choice(params, "model", CompressorModel::from_id)?;
        let mode = choice(params, "mode", Mode::from_id)?;

        let threshold_db = params.float("threshold");
        let ratio = params.float("ratio");
        let makeup_db = if params.toggle("auto_makeup") {
            auto_makeup_db(threshold_db, ratio)
        } else {
            params.float("makeup")
        };
        let settings = DynamicsSettings {
            threshold_db,
            ratio,
            knee_db: params.float("knee"),
            attack: params.float("attack"),
            release: params.float("release"),
            makeup_db,
        };

        let dry = buffer.copy_region(region);
        let mut wet = dry.clone();
        match mode {
            Mode::Stereo => DynamicsKernel::new(settings, model, sr).process_channels(&mut wet),
            Mode::MidSide if wet.len() != 2 => {
                warn!("mid/side compression needs two channels, got {}; using linked mode", wet.len());
                DynamicsKernel::new(settings, model, sr).process_channels(&mut wet);
            }
            Mode::MidSide => {
                let side = DynamicsSettings {
                    threshold_db: params.float("side_threshold"),
                    ratio: params.float("side_ratio"),
                    ..settings
                };
                wet = mid_side(&wet, settings, side, model, sr);
            }
            Mode::Multiband => {
                let crossovers = match params.count("bands") {
                    2 => vec![params.float("mid_crossover")],
                    3 => vec![params.float("low_crossover"), params.float("mid_crossover")],
                    _ => vec![
                        params.float("low_crossover"),
                        params.float("mid_crossover"),
                        params.float("high_crossover"),
                    ],
                };
                wet = multiband(&wet, &crossovers, settings, model, sr);
            }
        }

        let mix = params.float("mix") as f32;
        if mix < 1.0 {
            for (w, d) in wet.iter_mut().zip(&dry) {
                for (w, d) in w.iter_mut().zip(d) {
                    *w = blend(*d, *w, mix);
                }
            }
        }
        Ok(RenderedRegion::region(wet))
    }
}

/// Compress mid and side independently, then decode.
fn mid_side(
    channels: &[Vec<f32>],
    mid_settings: DynamicsSettings,
    side_settings: DynamicsSettings,
    model: CompressorModel,
    sample_rate: f64,
) -> Vec<Vec<f32>> {
    let (mid, side) = MidSideCodec::encode_channels(&channels[0], &channels[1]);
    let mut mid = vec![mid];
    let mut side = vec![side];
    DynamicsKernel::new(mid_settings, model, sample_rate).process_channels(&mut mid);
    DynamicsKernel::new(side_settings, model, sample_rate).process_channels(&mut side);
    let (left, right) = MidSideCodec::decode_channels(&mid[0], &side[0]);
    vec![left, right]
}

/// Split every channel into bands, compress each band (linked across
/// channels) and sum the bands back.
fn multiband(
    channels: &[Vec<f32>],
    crossovers: &[f64],
    settings: DynamicsSettings,
    model: CompressorModel,
    sample_rate: f64,
) -> Vec<Vec<f32>> {
    let mut splitters: Vec<MultibandCrossover> = channels
        .iter()
        .map(|_| MultibandCrossover::new(crossovers, sample_rate))
        .collect();
    let num_bands = splitters.first().map_or(1, |s| s.num_bands());
    let mut kernels: Vec<DynamicsKernel> = (0..num_bands)
        .map(|_| DynamicsKernel::new(settings, model, sample_rate))
        .collect();
    let saturation = model.saturation();

    let len = channels.first().map_or(0, |c| c.len());
    let mut out = vec![vec![0.0f32; len]; channels.len()];
    let mut bands = vec![vec![0.0f64; num_bands]; channels.len()];

    for i in 0..len {
        for (ch, splitter) in splitters.iter_mut().enumerate() {
            splitter.split(channels[ch][i] as f64, &mut bands[ch]);
        }
        let mut sums = vec![0.0f64; channels.len()];
        for (b, kernel) in kernels.iter_mut().enumerate() {
            let level = bands.iter().fold(0.0f64, |m, bs| m.max(bs[b].abs()));
            let g = kernel.gain_for(level);
            for (sum, bs) in sums.iter_mut().zip(&bands) {
                *sum += bs[b] * g;
            }
        }
        for (o, sum) in out.iter_mut().zip(&sums) {
            o[i] = saturation.apply(*sum as f32);
        }
    }
    out
}
