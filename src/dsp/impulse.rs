//! Procedural reverb impulse responses.
//!
//! Noise shaped by an exponential decay reaching -60 dB at the preset's
//! decay time, darkened by a one-pole lowpass, with sparse early reflections
//! in the first 80 ms. Each channel draws its own noise so the stereo image
//! is decorrelated. Every channel is normalized to unit energy.

use rand::Rng;
use rand::rngs::StdRng;

/// ln(1000): amplitude falls by 60 dB over the decay time.
const DECAY_60DB: f64 = 6.907_755_278_982_137;
const EARLY_WINDOW_SECONDS: f64 = 0.08;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReverbPreset {
    Room,
    Hall,
    Plate,
    Cave,
    Church,
}

/// Physical character of a preset.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImpulseShape {
    pub decay_seconds: f64,
    /// Lowpass cutoff applied to the tail; `None` leaves it bright.
    pub damping_hz: Option<f64>,
    pub early_reflections: usize,
}

impl ReverbPreset {
    pub const IDS: &'static [&'static str] = &["room", "hall", "plate", "cave", "church"];

    pub fn from_id(id: &str) -> Option<Self> {
        Some(match id {
            "room" => ReverbPreset::Room,
            "hall" => ReverbPreset::Hall,
            "plate" => ReverbPreset::Plate,
            "cave" => ReverbPreset::Cave,
            "church" => ReverbPreset::Church,
            _ => return None,
        })
    }

    pub fn shape(self) -> ImpulseShape {
        let (decay_seconds, damping_hz, early_reflections) = match self {
            ReverbPreset::Room => (0.8, Some(6000.0), 6),
            ReverbPreset::Hall => (2.5, Some(4000.0), 10),
            ReverbPreset::Plate => (1.8, None, 0),
            ReverbPreset::Cave => (4.5, Some(2500.0), 14),
            ReverbPreset::Church => (3.5, Some(3000.0), 12),
        };
        ImpulseShape {
            decay_seconds,
            damping_hz,
            early_reflections,
        }
    }
}

/// Synthesize one impulse response per channel.
///
/// The length is `shape.decay_seconds * decay_scale`, capped at `max_seconds`.
pub fn generate(
    shape: ImpulseShape,
    decay_scale: f64,
    sample_rate: f64,
    channels: usize,
    max_seconds: f64,
    rng: &mut StdRng,
) -> Vec<Vec<f32>> {
    let decay = (shape.decay_seconds * decay_scale).clamp(0.01, max_seconds.max(0.01));
    let len = ((decay * sample_rate).ceil() as usize).max(1);

    let damping = shape.damping_hz.map(|hz| {
        let x = (-2.0 * std::f64::consts::PI * hz / sample_rate).exp();
        (1.0 - x, x)
    });
    let early_len = ((EARLY_WINDOW_SECONDS * sample_rate) as usize).clamp(1, len);

    (0..channels.max(1))
        .map(|_| {
            let mut ir = vec![0.0f64; len];
            let mut lp = 0.0f64;
            for (i, v) in ir.iter_mut().enumerate() {
                let t = i as f64 / sample_rate;
                let noise: f64 = rng.gen_range(-1.0..=1.0);
                let mut s = noise * (-DECAY_60DB * t / decay).exp();
                if let Some((a, b)) = damping {
                    lp = a * s + b * lp;
                    s = lp;
                }
                *v = s;
            }

            for _ in 0..shape.early_reflections {
                let pos = rng.gen_range(0..early_len);
                let falloff = 1.0 - pos as f64 / early_len as f64;
                let sign = if rng.gen_bool(0.5) { 1.0 } else { -1.0 };
                ir[pos] += sign * rng.gen_range(0.3..0.9) * falloff;
            }

            let energy: f64 = ir.iter().map(|v| v * v).sum();
            let scale = if energy > 0.0 { 1.0 / energy.sqrt() } else { 0.0 };
            ir.into_iter().map(|v| (v * scale) as f32).collect()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn ir(preset: ReverbPreset, channels: usize, seed: u64) -> Vec<Vec<f32>> {
        let mut rng = StdRng::seed_from_u64(seed);
        generate(preset.shape(), 1.0, 22050.0, channels, 8.0, &mut rng)
    }

    #[test]
    fn unit_energy_per_channel() {
        for &id in ReverbPreset::IDS {
            for ch in ir(ReverbPreset::from_id(id).unwrap(), 2, 1) {
                let e: f64 = ch.iter().map(|v| (*v as f64).powi(2)).sum();
                assert!((e - 1.0).abs() < 1e-3, "{id} energy {e}");
            }
        }
    }

    #[test]
    fn tail_decays() {
        let ch = &ir(ReverbPreset::Hall, 1, 2)[0];
        let quarter = ch.len() / 4;
        let head: f32 = ch[..quarter].iter().map(|v| v * v).sum();
        let tail: f32 = ch[ch.len() - quarter..].iter().map(|v| v * v).sum();
        assert!(tail < head * 0.01, "head {head}, tail {tail}");
    }

    #[test]
    fn channels_are_decorrelated() {
        let chans = ir(ReverbPreset::Plate, 2, 3);
        let dot: f32 = chans[0].iter().zip(&chans[1]).map(|(a, b)| a * b).sum();
        assert!(dot.abs() < 0.2, "correlation {dot}");
    }

    #[test]
    fn length_is_capped() {
        let mut rng = StdRng::seed_from_u64(0);
        let chans = generate(ReverbPreset::Cave.shape(), 2.0, 1000.0, 1, 1.0, &mut rng);
        assert_eq!(chans[0].len(), 1000);
    }

    #[test]
    fn same_seed_same_ir() {
        assert_eq!(ir(ReverbPreset::Room, 2, 9), ir(ReverbPreset::Room, 2, 9));
    }
}
