//! Feed-forward dynamics kernel shared by the compressor modes.
//!
//! Detection is peak-linked across whatever frame it is handed (a stereo
//! pair, a mid or side channel, or one band of a multiband split). The
//! gain-reduction envelope is smoothed with separate attack and release
//! coefficients; model variants warp those times by the current reduction
//! and color the output.

use super::curves::{compression_amount, db_to_linear, linear_to_db, Saturation};

/// Character of the gain stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressorModel {
    Clean,
    Vintage,
    Vca,
    Optical,
    Fet,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TimeWarp {
    Linear,
    /// Times stretch exponentially with gain reduction.
    Exponential,
    /// Times stretch logarithmically with gain reduction.
    Logarithmic,
}

impl TimeWarp {
    #[inline]
    fn apply(self, time: f64, reduction_db: f64) -> f64 {
        match self {
            TimeWarp::Linear => time,
            TimeWarp::Exponential => time * (reduction_db / 24.0).exp(),
            TimeWarp::Logarithmic => time * (1.0 + 0.25 * (1.0 + reduction_db).ln()),
        }
    }
}

impl CompressorModel {
    pub const IDS: &'static [&'static str] = &["clean", "vintage", "vca", "optical", "fet"];

    pub fn from_id(id: &str) -> Option<Self> {
        Some(match id {
            "clean" => CompressorModel::Clean,
            "vintage" => CompressorModel::Vintage,
            "vca" => CompressorModel::Vca,
            "optical" => CompressorModel::Optical,
            "fet" => CompressorModel::Fet,
            _ => return None,
        })
    }

    fn attack_scale(self) -> f64 {
        match self {
            CompressorModel::Vintage => 2.0,
            CompressorModel::Vca => 0.5,
            CompressorModel::Fet => 0.25,
            CompressorModel::Clean | CompressorModel::Optical => 1.0,
        }
    }

    fn release_scale(self) -> f64 {
        match self {
            CompressorModel::Vintage => 1.5,
            CompressorModel::Vca => 0.8,
            CompressorModel::Optical => 2.0,
            CompressorModel::Clean | CompressorModel::Fet => 1.0,
        }
    }

    fn warp(self) -> TimeWarp {
        match self {
            CompressorModel::Vintage | CompressorModel::Fet => TimeWarp::Exponential,
            CompressorModel::Optical => TimeWarp::Logarithmic,
            CompressorModel::Clean | CompressorModel::Vca => TimeWarp::Linear,
        }
    }

    pub fn saturation(self) -> Saturation {
        match self {
            CompressorModel::Vintage => Saturation::Tanh { amount: 0.3 },
            CompressorModel::Optical => Saturation::Gentle { amount: 0.05 },
            CompressorModel::Fet => Saturation::PowerLaw { exponent: 0.9 },
            CompressorModel::Clean | CompressorModel::Vca => Saturation::None,
        }
    }
}

/// Static settings of one dynamics stage.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DynamicsSettings {
    pub threshold_db: f64,
    pub ratio: f64,
    pub knee_db: f64,
    /// Seconds; 0 reacts instantly.
    pub attack: f64,
    /// Seconds; 0 reacts instantly.
    pub release: f64,
    pub makeup_db: f64,
}

impl Default for DynamicsSettings {
    fn default() -> Self {
        DynamicsSettings {
            threshold_db: -24.0,
            ratio: 4.0,
            knee_db: 6.0,
            attack: 0.003,
            release: 0.25,
            makeup_db: 0.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DynamicsKernel {
    settings: DynamicsSettings,
    model: CompressorModel,
    sample_rate: f64,
    /// Smoothed gain reduction in dB (>= 0).
    reduction_db: f64,
}

impl DynamicsKernel {
    pub fn new(settings: DynamicsSettings, model: CompressorModel, sample_rate: f64) -> Self {
        DynamicsKernel {
            settings,
            model,
            sample_rate,
            reduction_db: 0.0,
        }
    }

    #[inline]
    fn coefficient(&self, time: f64) -> f64 {
        if time <= 0.0 {
            0.0
        } else {
            (-1.0 / (time * self.sample_rate)).exp()
        }
    }

    /// Feed one detector level (linear peak) and get the linear gain to apply,
    /// makeup included.
    #[inline]
    pub fn gain_for(&mut self, level: f64) -> f64 {
        let s = &self.settings;
        let target = compression_amount(linear_to_db(level), s.threshold_db, s.ratio, s.knee_db);

        let warp = self.model.warp();
        let time = if target > self.reduction_db {
            warp.apply(s.attack * self.model.attack_scale(), self.reduction_db)
        } else {
            warp.apply(s.release * self.model.release_scale(), self.reduction_db)
        };
        let coef = self.coefficient(time);
        self.reduction_db = target + (self.reduction_db - target) * coef;

        db_to_linear(s.makeup_db - self.reduction_db)
    }

    /// Process one frame in place with linked detection.
    #[inline]
    pub fn process_frame(&mut self, frame: &mut [f32]) {
        let level = frame.iter().fold(0.0f32, |m, s| m.max(s.abs())) as f64;
        let gain = self.gain_for(level) as f32;
        let saturation = self.model.saturation();
        for s in frame.iter_mut() {
            *s = saturation.apply(*s * gain);
        }
    }

    /// Process equal-length channels in place, linked.
    pub fn process_channels(&mut self, channels: &mut [Vec<f32>]) {
        let len = channels.iter().map(|c| c.len()).min().unwrap_or(0);
        let mut frame = vec![0.0f32; channels.len()];
        for i in 0..len {
            for (f, c) in frame.iter_mut().zip(channels.iter()) {
                *f = c[i];
            }
            self.process_frame(&mut frame);
            for (f, c) in frame.iter().zip(channels.iter_mut()) {
                c[i] = *f;
            }
        }
    }

    /// Current gain reduction in dB (for metering).
    pub fn gain_reduction_db(&self) -> f64 {
        self.reduction_db
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(threshold_db: f64, ratio: f64, attack: f64, release: f64) -> DynamicsSettings {
        DynamicsSettings {
            threshold_db,
            ratio,
            knee_db: 0.0,
            attack,
            release,
            makeup_db: 0.0,
        }
    }

    #[test]
    fn passthrough_below_threshold() {
        let mut k = DynamicsKernel::new(settings(-20.0, 4.0, 0.001, 0.1), CompressorModel::Clean, 44100.0);
        let mut frame = [0.05f32, 0.05];
        for _ in 0..1000 {
            frame = [0.05, 0.05];
            k.process_frame(&mut frame);
        }
        assert!((frame[0] - 0.05).abs() < 1e-6, "got {}", frame[0]);
    }

    #[test]
    fn reduces_loud_signals_to_static_curve() {
        let mut k = DynamicsKernel::new(settings(-12.0, 4.0, 0.001, 0.1), CompressorModel::Clean, 44100.0);
        let mut gain = 1.0;
        for _ in 0..5000 {
            gain = k.gain_for(1.0);
        }
        // 12 dB over at 4:1 removes 9 dB.
        let db = linear_to_db(gain);
        assert!((db + 9.0).abs() < 0.01, "gain {db} dB");
    }

    #[test]
    fn attack_is_gradual() {
        let mut k = DynamicsKernel::new(settings(-20.0, 10.0, 0.01, 0.5), CompressorModel::Clean, 44100.0);
        let first = k.gain_for(1.0);
        for _ in 0..500 {
            k.gain_for(1.0);
        }
        let later = k.gain_for(1.0);
        assert!(first > later, "first={first}, later={later}");
    }

    #[test]
    fn release_recovers() {
        let mut k = DynamicsKernel::new(settings(-20.0, 10.0, 0.001, 0.05), CompressorModel::Clean, 44100.0);
        for _ in 0..1000 {
            k.gain_for(1.0);
        }
        let compressed = k.gain_for(0.01);
        let start = k.gain_reduction_db();

        // one release time constant at 44.1 kHz is 2205 samples
        for _ in 0..2205 {
            k.gain_for(0.01);
        }
        let expected = start * (-1.0f64).exp();
        assert!((k.gain_reduction_db() - expected).abs() < 1e-3 * start);

        for _ in 0..20_000 {
            k.gain_for(0.01);
        }
        let released = k.gain_for(0.01);
        assert!(released > compressed);
        assert!(k.gain_reduction_db() < 0.1);
    }

    #[test]
    fn zero_times_are_instant() {
        let mut k = DynamicsKernel::new(settings(-20.0, 4.0, 0.0, 0.0), CompressorModel::Clean, 44100.0);
        let g = k.gain_for(db_to_linear(-10.0));
        assert!((linear_to_db(g) + 7.5).abs() < 1e-9);
    }

    #[test]
    fn unity_ratio_is_transparent() {
        let s = DynamicsSettings {
            threshold_db: 0.0,
            ratio: 1.0,
            ..DynamicsSettings::default()
        };
        let mut k = DynamicsKernel::new(s, CompressorModel::Clean, 48000.0);
        let mut ch = vec![vec![0.9f32, -0.3, 0.5, 1.0], vec![0.1, 0.2, -1.0, 0.0]];
        let orig = ch.clone();
        k.process_channels(&mut ch);
        assert_eq!(ch, orig);
    }

    #[test]
    fn slower_models_attack_slower() {
        let run = |model| {
            let mut k = DynamicsKernel::new(settings(-20.0, 8.0, 0.005, 0.2), model, 44100.0);
            for _ in 0..100 {
                k.gain_for(1.0);
            }
            k.gain_reduction_db()
        };
        assert!(run(CompressorModel::Fet) > run(CompressorModel::Clean));
        assert!(run(CompressorModel::Clean) > run(CompressorModel::Vintage));
    }
}
