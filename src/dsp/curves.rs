//! Transfer curves and level conversions shared by the dynamics and
//! distortion effects.

/// Convert linear amplitude to dB.
#[inline]
pub fn linear_to_db(linear: f64) -> f64 {
    if linear <= 0.0 {
        -120.0
    } else {
        20.0 * linear.log10()
    }
}

/// Convert dB to linear amplitude.
#[inline]
pub fn db_to_linear(db: f64) -> f64 {
    10.0_f64.powf(db / 20.0)
}

/// Compressor static curve: how many dB are removed from a level.
///
/// Above threshold the excess is reduced by `1 - 1/ratio`. Inside the knee
/// the ratio itself ramps in quadratically:
/// `smoothRatio = 1 + (ratio - 1) * (excess / knee)^2`.
pub fn compression_amount(input_db: f64, threshold_db: f64, ratio: f64, knee_db: f64) -> f64 {
    let excess = input_db - threshold_db;
    if excess <= 0.0 || ratio <= 1.0 {
        return 0.0;
    }
    if knee_db > 0.0 && excess < knee_db {
        let x = excess / knee_db;
        let smooth_ratio = 1.0 + (ratio - 1.0) * x * x;
        excess * (1.0 - 1.0 / smooth_ratio)
    } else {
        excess * (1.0 - 1.0 / ratio)
    }
}

/// Output level of the compressor static curve.
pub fn compressor_output_db(input_db: f64, threshold_db: f64, ratio: f64, knee_db: f64) -> f64 {
    input_db - compression_amount(input_db, threshold_db, ratio, knee_db)
}

pub const AUTO_MAKEUP_FACTOR: f64 = 0.5;
pub const AUTO_MAKEUP_CAP_DB: f64 = 12.0;

/// Auto makeup: `min(|threshold| / ratio * factor, cap)`.
pub fn auto_makeup_db(threshold_db: f64, ratio: f64) -> f64 {
    (threshold_db.abs() / ratio.max(1.0) * AUTO_MAKEUP_FACTOR).min(AUTO_MAKEUP_CAP_DB)
}

/// Shape of a limiter's knee between `ceiling - width` and the ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KneeShape {
    Linear,
    Sine,
    SCurve,
    PowerLaw,
}

impl KneeShape {
    /// Maps knee position `t` in [0, 1] to output position in [0, 1].
    #[inline]
    pub fn shape(self, t: f64) -> f64 {
        let t = t.clamp(0.0, 1.0);
        match self {
            KneeShape::Linear => t,
            KneeShape::Sine => (1.0 - (std::f64::consts::PI * t).cos()) / 2.0,
            KneeShape::SCurve => t * t * (3.0 - 2.0 * t),
            KneeShape::PowerLaw => t * t,
        }
    }
}

/// Limiter gain in dB (always <= 0) for a detected peak level.
///
/// Below the knee the gain is unity; at or above the ceiling the level is
/// pulled exactly onto the ceiling. Inside the knee the output follows the
/// shape but never rises above the input.
pub fn limiter_gain_db(level_db: f64, ceiling_db: f64, knee_db: f64, shape: KneeShape) -> f64 {
    if level_db >= ceiling_db {
        return ceiling_db - level_db;
    }
    let knee_start = ceiling_db - knee_db;
    if knee_db <= 0.0 || level_db <= knee_start {
        return 0.0;
    }
    let t = (level_db - knee_start) / knee_db;
    let out = knee_start + knee_db * shape.shape(t);
    (out - level_db).min(0.0)
}

/// Post-processing nonlinearity used for model coloration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Saturation {
    None,
    /// Blend toward `tanh(x)`.
    Tanh { amount: f32 },
    /// `sign(x) * |x|^exponent`.
    PowerLaw { exponent: f32 },
    /// `x * (1 - amount * |x|)`.
    Gentle { amount: f32 },
}

impl Saturation {
    #[inline]
    pub fn apply(self, x: f32) -> f32 {
        match self {
            Saturation::None => x,
            Saturation::Tanh { amount } => x + amount * (x.tanh() - x),
            Saturation::PowerLaw { exponent } => x.signum() * x.abs().powf(exponent),
            Saturation::Gentle { amount } => x * (1.0 - amount * x.abs()),
        }
    }
}

/// Waveshaper palette.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DistortionKind {
    Tube,
    Transistor,
    Digital,
    Tape,
    Fuzz,
    Bitcrush,
    Waveshaper,
    Asymmetric,
}

impl DistortionKind {
    pub const IDS: &'static [&'static str] = &[
        "tube", "transistor", "digital", "tape", "fuzz", "bitcrush", "waveshaper", "asymmetric",
    ];

    pub fn from_id(id: &str) -> Option<Self> {
        Some(match id {
            "tube" => DistortionKind::Tube,
            "transistor" => DistortionKind::Transistor,
            "digital" => DistortionKind::Digital,
            "tape" => DistortionKind::Tape,
            "fuzz" => DistortionKind::Fuzz,
            "bitcrush" => DistortionKind::Bitcrush,
            "waveshaper" => DistortionKind::Waveshaper,
            "asymmetric" => DistortionKind::Asymmetric,
            _ => return None,
        })
    }

    /// The raw shape over [-1, 1]; `drive` runs 0..=100.
    fn shape(self, x: f64, drive: f64) -> f64 {
        let g = 1.0 + drive / 10.0;
        match self {
            DistortionKind::Tube => {
                if x >= 0.0 {
                    (1.0 - (-g * x).exp()) / (1.0 - (-g).exp())
                } else {
                    let gn = g * 0.8;
                    -(1.0 - (gn * x).exp()) / (1.0 - (-gn).exp())
                }
            }
            DistortionKind::Transistor => (g * x).tanh() / g.tanh(),
            DistortionKind::Digital => (g * x).clamp(-1.0, 1.0),
            DistortionKind::Tape => (g * x) / (1.0 + g * x.abs()) * (1.0 + g) / g,
            DistortionKind::Fuzz => {
                let gf = 1.0 + drive / 2.0;
                x.signum() * (1.0 - (-gf * x.abs()).exp()) / (1.0 - (-gf).exp())
            }
            DistortionKind::Bitcrush => {
                let bits = (16.0 - (drive / 100.0 * 14.0).round()).clamp(2.0, 16.0);
                let step = 2.0 / 2.0_f64.powf(bits);
                ((x / step).round() * step).clamp(-1.0, 1.0)
            }
            DistortionKind::Waveshaper => {
                let k = drive * 4.0;
                let deg = std::f64::consts::PI / 180.0;
                let f = |v: f64| ((3.0 + k) * v * 20.0 * deg) / (std::f64::consts::PI + k * v.abs());
                f(x) / f(1.0)
            }
            DistortionKind::Asymmetric => {
                if x >= 0.0 {
                    (g * x).tanh() / g.tanh()
                } else {
                    let gn = g * 1.8;
                    0.8 * (gn * x).tanh() / gn.tanh()
                }
            }
        }
    }
}

pub const CURVE_SIZE: usize = 8192;

/// Build a waveshaper lookup table over input [-1, 1].
///
/// `asymmetry` in [-1, 1] lowers the positive (> 0) or negative (< 0)
/// clipping threshold by up to half, which adds even harmonics.
pub fn distortion_curve(kind: DistortionKind, drive: f64, asymmetry: f64, size: usize) -> Vec<f32> {
    let size = size.max(2);
    let pos_threshold = 1.0 - 0.5 * asymmetry.max(0.0);
    let neg_threshold = 1.0 - 0.5 * (-asymmetry).max(0.0);
    (0..size)
        .map(|i| {
            let x = i as f64 * 2.0 / (size - 1) as f64 - 1.0;
            let y = if x >= 0.0 {
                pos_threshold * kind.shape((x / pos_threshold).min(1.0), drive)
            } else {
                neg_threshold * kind.shape((x / neg_threshold).max(-1.0), drive)
            };
            y as f32
        })
        .collect()
}

/// Apply a curve the way a WaveShaperNode does: clamp to [-1, 1] and
/// interpolate linearly between table entries.
#[inline]
pub fn lookup(table: &[f32], x: f32) -> f32 {
    let n = table.len();
    let pos = (x.clamp(-1.0, 1.0) + 1.0) * 0.5 * (n - 1) as f32;
    let i = (pos as usize).min(n - 2);
    let frac = pos - i as f32;
    table[i] + (table[i + 1] - table[i]) * frac
}
