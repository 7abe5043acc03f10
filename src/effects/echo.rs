//! Feedback delay with safety caps and an output protection stage.
//!
//! Only the region is rendered. Repeats that would sound past the region end
//! are not produced, so audio after the region is left untouched.

use log::debug;

use super::{blend, division_seconds, Effect, DIVISIONS};
use crate::buffer::{Region, RenderedRegion, SampleBuffer};
use crate::context::RenderContext;
use crate::dsp::delay::DelayLine;
use crate::dsp::dynamics::{CompressorModel, DynamicsKernel, DynamicsSettings};
use crate::error::FxError;
use crate::params::{EffectSchema, ParamSpec, ParamUnit, ResolvedParams};

pub struct Echo;

/// Hard ceiling on the feedback path, whatever the parameter says.
pub const MAX_FEEDBACK: f64 = 0.8;
/// Hard ceiling on the input and output gains.
pub const MAX_GAIN: f64 = 1.5;

const PROTECTION: DynamicsSettings = DynamicsSettings {
    threshold_db: -1.0,
    ratio: 20.0,
    knee_db: 0.0,
    attack: 0.001,
    release: 0.05,
    makeup_db: 0.0,
};

static SCHEMA: EffectSchema = EffectSchema {
    id: "echo",
    name: "Echo",
    params: &[
        ParamSpec::float("time", "Delay Time", ParamUnit::Seconds, 0.01, 2.0, 0.25),
        ParamSpec::toggle("tempo_sync", "Tempo Sync", false),
        ParamSpec::choice("division", "Division", DIVISIONS, "1/8"),
        ParamSpec::float("feedback", "Feedback", ParamUnit::Ratio, 0.0, 0.95, 0.4),
        ParamSpec::float("input_gain", "Input Gain", ParamUnit::Ratio, 0.0, 2.0, 1.0),
        ParamSpec::float("output_gain", "Output Gain", ParamUnit::Ratio, 0.0, 2.0, 1.0),
        ParamSpec::float("mix", "Mix", ParamUnit::Ratio, 0.0, 1.0, 0.5),
    ],
};

impl Effect for Echo {
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
        let seconds = if params.toggle("tempo_sync") {
            division_seconds(params, "division", ctx)?
        } else {
            params.float("time")
        };
        let delay = ctx.samples(seconds).max(1);
        let feedback = params.float("feedback").min(MAX_FEEDBACK) as f32;
        let input_gain = params.float("input_gain").min(MAX_GAIN) as f32;
        let output_gain = params.float("output_gain").min(MAX_GAIN) as f32;
        let mix = params.float("mix") as f32;

        let len = region.len();
        let input = buffer.copy_region(region);
        let mut lines: Vec<DelayLine> = input.iter().map(|_| DelayLine::new(delay)).collect();
        let mut protect = DynamicsKernel::new(PROTECTION, CompressorModel::Clean, ctx.sample_rate_f64());

        debug!("echo: {delay} sample delay over {len} samples");
        let mut out = vec![Vec::with_capacity(len); input.len()];
        let mut frame = vec![0.0f32; input.len()];
        for i in 0..len {
            for (ch, line) in lines.iter_mut().enumerate() {
                let dry = input[ch][i];
                let echoed = line.tap(delay);
                line.write(dry * input_gain + echoed * feedback);
                frame[ch] = blend(dry, echoed * output_gain, mix);
            }
            protect.process_frame(&mut frame);
            for (o, s) in out.iter_mut().zip(&frame) {
                o.push(*s);
            }
        }

        Ok(RenderedRegion::region(out))
    }
}
