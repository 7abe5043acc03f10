//! Low-frequency oscillators and band-limited carrier wavetables.

use std::f64::consts::PI;

use rand::Rng;
use rand::rngs::StdRng;

/// Supported waveform shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Waveform {
    Sine,
    Square,
    Sawtooth,
    Triangle,
}

impl Waveform {
    pub const IDS: &'static [&'static str] = &["sine", "square", "sawtooth", "triangle"];

    pub fn from_id(id: &str) -> Option<Self> {
        Some(match id {
            "sine" => Waveform::Sine,
            "square" => Waveform::Square,
            "sawtooth" | "saw" => Waveform::Sawtooth,
            "triangle" => Waveform::Triangle,
            _ => return None,
        })
    }

    /// Naive value at `phase` in [0, 1). Fine for modulation rates.
    #[inline]
    pub fn value_at(self, phase: f64) -> f64 {
        match self {
            Waveform::Sine => (2.0 * PI * phase).sin(),
            Waveform::Square => {
                if phase < 0.5 {
                    1.0
                } else {
                    -1.0
                }
            }
            Waveform::Sawtooth => 2.0 * phase - 1.0,
            Waveform::Triangle => {
                if phase < 0.5 {
                    4.0 * phase - 1.0
                } else {
                    3.0 - 4.0 * phase
                }
            }
        }
    }
}

/// A free-running modulation oscillator, output in [-1, 1].
#[derive(Debug, Clone)]
pub struct Lfo {
    pub waveform: Waveform,
    pub frequency: f64,
    phase: f64,
    sample_rate: f64,
}

impl Lfo {
    pub fn new(waveform: Waveform, frequency: f64, sample_rate: f64) -> Self {
        Lfo {
            waveform,
            frequency,
            phase: 0.0,
            sample_rate,
        }
    }

    /// Start at a phase offset (fraction of a cycle).
    pub fn with_phase(mut self, phase: f64) -> Self {
        self.phase = phase.rem_euclid(1.0);
        self
    }

    #[inline]
    pub fn next_sample(&mut self) -> f64 {
        let v = self.waveform.value_at(self.phase);
        self.phase = (self.phase + self.frequency / self.sample_rate).rem_euclid(1.0);
        v
    }

    /// Skip ahead `n` samples without producing output.
    pub fn advance(&mut self, n: usize) {
        self.phase = (self.phase + n as f64 * self.frequency / self.sample_rate).rem_euclid(1.0);
    }

    pub fn phase(&self) -> f64 {
        self.phase
    }
}

pub const WAVETABLE_SIZE: usize = 2048;
pub const MAX_HARMONICS: usize = 64;

/// One cycle of a waveform synthesized by additive harmonic summation,
/// limited to partials below Nyquist for the intended fundamental.
#[derive(Debug, Clone)]
pub struct Wavetable {
    table: Vec<f32>,
}

impl Wavetable {
    pub fn additive(waveform: Waveform, fundamental: f64, sample_rate: f64) -> Self {
        let nyquist = sample_rate / 2.0;
        let harmonics = ((nyquist / fundamental.max(1.0)).floor() as usize).clamp(1, MAX_HARMONICS);

        let mut table = vec![0.0f64; WAVETABLE_SIZE];
        for k in 1..=harmonics {
            let amp = match waveform {
                Waveform::Sine => {
                    if k == 1 { 1.0 } else { 0.0 }
                }
                Waveform::Square => {
                    if k % 2 == 1 { 1.0 / k as f64 } else { 0.0 }
                }
                Waveform::Sawtooth => {
                    let sign = if k % 2 == 1 { 1.0 } else { -1.0 };
                    sign / k as f64
                }
                Waveform::Triangle => {
                    if k % 2 == 1 {
                        let sign = if (k / 2) % 2 == 0 { 1.0 } else { -1.0 };
                        sign / (k * k) as f64
                    } else {
                        0.0
                    }
                }
            };
            if amp == 0.0 {
                continue;
            }
            for (i, v) in table.iter_mut().enumerate() {
                let phase = i as f64 / WAVETABLE_SIZE as f64;
                *v += amp * (2.0 * PI * k as f64 * phase).sin();
            }
        }

        let peak = table.iter().fold(0.0f64, |m, v| m.max(v.abs()));
        let scale = if peak > 0.0 { 1.0 / peak } else { 1.0 };
        Wavetable {
            table: table.into_iter().map(|v| (v * scale) as f32).collect(),
        }
    }

    /// Linearly interpolated value at `phase` in [0, 1).
    #[inline]
    pub fn sample(&self, phase: f64) -> f32 {
        let pos = phase.rem_euclid(1.0) * WAVETABLE_SIZE as f64;
        let i = (pos as usize) % WAVETABLE_SIZE;
        let j = (i + 1) % WAVETABLE_SIZE;
        let frac = (pos - pos.floor()) as f32;
        self.table[i] + (self.table[j] - self.table[i]) * frac
    }
}

/// Carrier shape for modulation effects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CarrierWave {
    Tone(Waveform),
    Noise,
}

impl CarrierWave {
    pub const IDS: &'static [&'static str] = &["sine", "triangle", "square", "sawtooth", "noise"];

    pub fn from_id(id: &str) -> Option<Self> {
        if id == "noise" {
            Some(CarrierWave::Noise)
        } else {
            Waveform::from_id(id).map(CarrierWave::Tone)
        }
    }
}

#[derive(Debug, Clone)]
enum CarrierSource {
    Table(Wavetable),
    Noise(StdRng),
}

/// A phase-accumulating carrier oscillator.
#[derive(Debug, Clone)]
pub struct Carrier {
    source: CarrierSource,
    frequency: f64,
    phase: f64,
    sample_rate: f64,
}

impl Carrier {
    /// `rng` is only consumed by the noise carrier.
    pub fn new(wave: CarrierWave, frequency: f64, sample_rate: f64, rng: StdRng) -> Self {
        let source = match wave {
            CarrierWave::Tone(w) => CarrierSource::Table(Wavetable::additive(w, frequency, sample_rate)),
            CarrierWave::Noise => CarrierSource::Noise(rng),
        };
        Carrier {
            source,
            frequency,
            phase: 0.0,
            sample_rate,
        }
    }

    pub fn with_phase(mut self, phase: f64) -> Self {
        self.phase = phase.rem_euclid(1.0);
        self
    }

    #[inline]
    pub fn next_sample(&mut self) -> f32 {
        let v = match &mut self.source {
            CarrierSource::Table(t) => t.sample(self.phase),
            CarrierSource::Noise(rng) => rng.gen_range(-1.0f32..=1.0),
        };
        self.phase = (self.phase + self.frequency / self.sample_rate).rem_euclid(1.0);
        v
    }

    /// Hard-sync: restart the cycle at `phase`.
    pub fn reset_phase(&mut self, phase: f64) {
        self.phase = phase.rem_euclid(1.0);
    }

    pub fn frequency(&self) -> f64 {
        self.frequency
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn lfo_sine_starts_at_zero() {
        let mut lfo = Lfo::new(Waveform::Sine, 2.0, 44100.0);
        assert!(lfo.next_sample().abs() < 1e-12);
    }

    #[test]
    fn lfo_shapes_stay_in_range() {
        for &id in Waveform::IDS {
            let mut lfo = Lfo::new(Waveform::from_id(id).unwrap(), 5.0, 1000.0);
            for _ in 0..2000 {
                let v = lfo.next_sample();
                assert!((-1.0..=1.0).contains(&v), "{id} out of range: {v}");
            }
        }
    }

    #[test]
    fn lfo_phase_offset() {
        let mut lfo = Lfo::new(Waveform::Sine, 1.0, 1000.0).with_phase(0.25);
        assert!((lfo.next_sample() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn wavetables_are_normalized() {
        for &id in Waveform::IDS {
            let t = Wavetable::additive(Waveform::from_id(id).unwrap(), 100.0, 44100.0);
            let peak = t.table.iter().fold(0.0f32, |m, v| m.max(v.abs()));
            assert!((peak - 1.0).abs() < 1e-5, "{id} peak {peak}");
        }
    }

    #[test]
    fn high_fundamental_is_band_limited_to_sine() {
        // Above a third of Nyquist only the fundamental fits.
        let square = Wavetable::additive(Waveform::Square, 10000.0, 44100.0);
        let sine = Wavetable::additive(Waveform::Sine, 10000.0, 44100.0);
        for (a, b) in square.table.iter().zip(&sine.table) {
            assert!((a - b).abs() < 1e-6);
        }
    }

    #[test]
    fn noise_carrier_is_seeded() {
        let a: Vec<f32> = {
            let mut c = Carrier::new(CarrierWave::Noise, 100.0, 44100.0, StdRng::seed_from_u64(3));
            (0..32).map(|_| c.next_sample()).collect()
        };
        let mut c = Carrier::new(CarrierWave::Noise, 100.0, 44100.0, StdRng::seed_from_u64(3));
        let b: Vec<f32> = (0..32).map(|_| c.next_sample()).collect();
        assert_eq!(a, b);
        assert!(a.iter().all(|v| v.abs() <= 1.0));
    }
}
