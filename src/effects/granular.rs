//! Granular freeze: a snapshot of the region is smeared into a new tail
//! inserted after the region.

use log::{debug, warn};
use rand::Rng;

use super::Effect;
use crate::buffer::{Placement, Region, RenderedRegion, SampleBuffer};
use crate::context::RenderContext;
use crate::dsp::resample::{read_wrapped, semitones_to_ratio};
use crate::dsp::window::{fade_out, hann_at};
use crate::error::FxError;
use crate::params::{EffectSchema, ParamSpec, ParamUnit, ResolvedParams};

pub struct GranularFreeze;

static SCHEMA: EffectSchema = EffectSchema {
    id: "granular_freeze",
    name: "Granular Freeze",
    params: &[
        ParamSpec::float("position", "Position", ParamUnit::Ratio, 0.0, 1.0, 0.5),
        ParamSpec::float("snapshot", "Snapshot", ParamUnit::Seconds, 0.01, 1.0, 0.2),
        ParamSpec::float("duration", "Duration", ParamUnit::Seconds, 0.1, 30.0, 2.0),
        ParamSpec::float("grain_size", "Grain Size", ParamUnit::Seconds, 0.01, 0.5, 0.08),
        ParamSpec::float("density", "Density", ParamUnit::Count, 1.0, 200.0, 30.0),
        ParamSpec::float("pitch", "Pitch", ParamUnit::Semitones, -24.0, 24.0, 0.0),
        ParamSpec::float("pitch_jitter", "Pitch Jitter", ParamUnit::Semitones, 0.0, 12.0, 0.0),
        ParamSpec::float("reverse", "Reverse Chance", ParamUnit::Ratio, 0.0, 1.0, 0.2),
        ParamSpec::float("fade_out", "Fade Out", ParamUnit::Ratio, 0.0, 1.0, 0.3),
    ],
};

/// Grains to schedule for a tail, capped at `limit`.
fn grain_count(duration: f64, density: f64, limit: usize) -> usize {
    let wanted = (duration * density).ceil().max(1.0) as usize;
    if wanted > limit {
        warn!("granular freeze: {wanted} grains requested, capping at {limit}");
    }
    wanted.min(limit).max(1)
}

#[derive(Debug, Clone, Copy)]
struct Grain {
    onset: usize,
    source: f64,
    step: f64,
}

impl Effect for GranularFreeze {
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
        let mut duration = params.float("duration");
        if duration > ctx.limits.max_tail_seconds {
            warn!(
                "granular freeze: {duration} s tail exceeds the {} s limit",
                ctx.limits.max_tail_seconds
            );
            duration = ctx.limits.max_tail_seconds;
        }
        let tail_len = ctx.samples(duration);
        let grain_len = ctx.samples(params.float("grain_size"));
        if tail_len == 0 || grain_len < 2 {
            return Err(FxError::render(format!(
                "granular freeze: degenerate sizes (tail {tail_len}, grain {grain_len})"
            )));
        }

        let snapshot_len = ctx.samples(params.float("snapshot")).clamp(1, region.len());
        let slack = region.len() - snapshot_len;
        let snap_start = region.start + (params.float("position") * slack as f64).round() as usize;
        let snapshot = buffer.copy_range(snap_start, snap_start + snapshot_len);

        let density = params.float("density");
        let count = grain_count(duration, density, ctx.limits.max_grains);
        let overlap = density * params.float("grain_size");
        let scale = (1.0 / overlap.max(1.0).sqrt()) as f32;
        let pitch = params.float("pitch");
        let jitter = params.float("pitch_jitter");
        let reverse_chance = params.float("reverse");

        let interval = tail_len as f64 / count as f64;
        let rng = ctx.rng();
        let grains: Vec<Grain> = (0..count)
            .map(|g| {
                let onset = ((g as f64 + rng.gen_range(0.0..1.0)) * interval) as usize;
                let source = rng.gen_range(0.0..snapshot_len as f64);
                let semitones = if jitter > 0.0 { pitch + rng.gen_range(-jitter..=jitter) } else { pitch };
                let ratio = semitones_to_ratio(semitones);
                let step = if rng.gen_bool(reverse_chance) { -ratio } else { ratio };
                Grain {
                    onset: onset.min(tail_len - 1),
                    source,
                    step,
                }
            })
            .collect();

        let window: Vec<f32> = (0..grain_len)
            .map(|k| hann_at(k as f64 / (grain_len - 1) as f64) as f32 * scale)
            .collect();

        let mut tail = vec![vec![0.0f32; tail_len]; snapshot.len()];
        for (out, snap) in tail.iter_mut().zip(&snapshot) {
            for grain in &grains {
                let reach = grain_len.min(tail_len - grain.onset);
                for (k, w) in window[..reach].iter().enumerate() {
                    let pos = grain.source + k as f64 * grain.step;
                    out[grain.onset + k] += read_wrapped(snap, pos) * w;
                }
            }
            let fade = (params.float("fade_out") * tail_len as f64).round() as usize;
            fade_out(out, fade.max(1));
        }

        debug!(
            "granular freeze: {count} grains of {grain_len} samples into a {tail_len} sample tail at {}",
            region.end
        );
        Ok(RenderedRegion::new(tail, Placement::Insert { at: region.end }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effects::test_util::{rms, stereo_sine};
    use crate::effects::{render_effect, EffectKind};
    use crate::params::ParameterSet;
    use crate::splice::splice_rendered;

    fn run(buffer: &SampleBuffer, region: Region, params: ParameterSet, seed: u64) -> RenderedRegion {
        let mut ctx = RenderContext::new(buffer.sample_rate(), buffer.num_channels(), seed);
        render_effect(EffectKind::GranularFreeze, buffer, region, &params, &mut ctx).unwrap()
    }

    #[test]
    fn tail_is_inserted_after_the_region() {
        let buffer = stereo_sine(300.0, 0.5, 8000, 8000);
        let region = Region::new(2000, 4000).unwrap();
        let rendered = run(&buffer, region, ParameterSet::new().with("duration", 1.0), 1);
        assert_eq!(rendered.placement, Placement::Insert { at: 4000 });
        assert_eq!(rendered.len(), 8000);

        let out = splice_rendered(&buffer, &rendered, region);
        assert_eq!(out.len(), 16000);
        assert_eq!(&out.channel(0)[..4000], &buffer.channel(0)[..4000]);
        assert_eq!(&out.channel(0)[12000..], &buffer.channel(0)[4000..]);
        assert!(rms(&out.channel(0)[5000..9000]) > 0.05);
    }

    #[test]
    fn tail_fades_to_silence() {
        let buffer = stereo_sine(300.0, 0.5, 8000, 8000);
        let region = Region::full(&buffer).unwrap();
        let rendered = run(&buffer, region, ParameterSet::new().with("fade_out", 0.5), 2);
        for ch in &rendered.channels {
            assert_eq!(*ch.last().unwrap(), 0.0);
        }
    }

    #[test]
    fn tail_length_is_capped() {
        let buffer = stereo_sine(300.0, 0.5, 4000, 8000);
        let region = Region::full(&buffer).unwrap();
        let mut ctx = RenderContext::new(8000, 2, 0);
        ctx.limits.max_tail_seconds = 0.5;
        let rendered = render_effect(
            EffectKind::GranularFreeze,
            &buffer,
            region,
            &ParameterSet::new().with("duration", 30.0),
            &mut ctx,
        )
        .unwrap();
        assert_eq!(rendered.len(), 4000);
    }

    #[test]
    fn grain_count_respects_the_limit() {
        assert_eq!(grain_count(2.0, 30.0, 20_000), 60);
        assert_eq!(grain_count(30.0, 200.0, 1000), 1000);
        assert_eq!(grain_count(0.1, 1.0, 10), 1);
    }

    #[test]
    fn seed_changes_the_texture() {
        let buffer = stereo_sine(300.0, 0.5, 8000, 8000);
        let region = Region::full(&buffer).unwrap();
        let a = run(&buffer, region, ParameterSet::new(), 1);
        let b = run(&buffer, region, ParameterSet::new(), 2);
        assert_ne!(a, b);
    }
}
