//! Noise gate with hold and a range floor.

use super::Effect;
use crate::buffer::{Region, RenderedRegion, SampleBuffer};
use crate::context::RenderContext;
use crate::dsp::curves::db_to_linear;
use crate::dsp::envelope::{EnvelopeFollower, GateEnvelope};
use crate::error::FxError;
use crate::params::{EffectSchema, ParamSpec, ParamUnit, ResolvedParams};

pub struct Gate;

/// Detector smoothing time.
const DETECTOR_SECONDS: f64 = 0.002;

static SCHEMA: EffectSchema = EffectSchema {
    id: "gate",
    name: "Noise Gate",
    params: &[
        ParamSpec::float("threshold", "Threshold", ParamUnit::Decibels, -80.0, 0.0, -40.0),
        ParamSpec::float("range", "Range", ParamUnit::Decibels, -100.0, 0.0, -60.0),
        ParamSpec::float("attack", "Attack", ParamUnit::Seconds, 0.0, 0.1, 0.001),
        ParamSpec::float("hold", "Hold", ParamUnit::Seconds, 0.0, 1.0, 0.01),
        ParamSpec::float("release", "Release", ParamUnit::Seconds, 0.001, 2.0, 0.1),
    ],
};

impl Effect for Gate {
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
        let mut detector = EnvelopeFollower::new(DETECTOR_SECONDS, sr);
        let mut gate = GateEnvelope::new(
            db_to_linear(params.float("threshold")),
            db_to_linear(params.float("range")),
            params.float("attack"),
            params.float("hold"),
            params.float("release"),
            sr,
        );

        let mut channels = buffer.copy_region(region);
        for i in 0..region.len() {
            let level = channels.iter().fold(0.0f32, |m, c| m.max(c[i].abs()));
            let gain = gate.next_gain(detector.process(level as f64)) as f32;
            for ch in channels.iter_mut() {
                ch[i] *= gain;
            }
        }
        Ok(RenderedRegion::region(channels))
    }
}
