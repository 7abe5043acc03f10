//! Fundamental-frequency detection for carrier pitch sync.
//!
//! A simplified YIN: squared-difference autocorrelation, cumulative mean
//! normalization, first dip under an absolute threshold, then parabolic
//! refinement.

/// Result of pitch detection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PitchEstimate {
    /// Estimated fundamental in Hz.
    pub frequency: f64,
    /// Confidence in [0, 1]; higher is better.
    pub confidence: f64,
}

impl PitchEstimate {
    /// Below this confidence the input is treated as unpitched.
    pub const MIN_CONFIDENCE: f64 = 0.5;

    pub fn is_pitched(&self) -> bool {
        self.frequency > 0.0 && self.confidence >= Self::MIN_CONFIDENCE
    }
}

const YIN_THRESHOLD: f64 = 0.15;

/// Detect the fundamental of a mono signal within `[min_freq, max_freq]`.
///
/// Returns `None` when the signal is too short to hold two periods of the
/// lowest frequency or no period could be found.
pub fn detect_pitch(
    samples: &[f32],
    sample_rate: u32,
    min_freq: f64,
    max_freq: f64,
) -> Option<PitchEstimate> {
    let sr = sample_rate as f64;
    let min_lag = (sr / max_freq).ceil().max(2.0) as usize;
    let max_lag = (sr / min_freq).floor() as usize;
    if max_lag <= min_lag || samples.len() < max_lag * 2 {
        return None;
    }

    let window = max_lag.min(samples.len() / 2);

    let mut diff = vec![0.0f64; window + 1];
    for (tau, d) in diff.iter_mut().enumerate().skip(1) {
        *d = (0..window)
            .map(|j| {
                let v = samples[j] as f64 - samples[j + tau] as f64;
                v * v
            })
            .sum();
    }

    let mut cmnd = vec![1.0f64; window + 1];
    let mut running = 0.0;
    for tau in 1..=window {
        running += diff[tau];
        if running > 0.0 {
            cmnd[tau] = diff[tau] * tau as f64 / running;
        }
    }

    let upper = window.min(max_lag);
    let mut best = None;
    for tau in min_lag..=upper {
        if cmnd[tau] < YIN_THRESHOLD {
            let mut t = tau;
            while t < upper && cmnd[t + 1] < cmnd[t] {
                t += 1;
            }
            best = Some(t);
            break;
        }
    }
    // No dip under the threshold: take the global minimum.
    let best_tau = match best {
        Some(t) => t,
        None => (min_lag..=upper).min_by(|&a, &b| cmnd[a].total_cmp(&cmnd[b]))?,
    };
    let best_val = cmnd[best_tau];

    let refined = if best_tau > 0 && best_tau < window {
        let (a, b, c) = (cmnd[best_tau - 1], cmnd[best_tau], cmnd[best_tau + 1]);
        let denom = a - 2.0 * b + c;
        if denom.abs() > 1e-12 {
            best_tau as f64 + 0.5 * (a - c) / denom
        } else {
            best_tau as f64
        }
    } else {
        best_tau as f64
    };

    Some(PitchEstimate {
        frequency: sr / refined,
        confidence: (1.0 - best_val).clamp(0.0, 1.0),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    fn sine(freq: f64, sample_rate: u32, duration: f64) -> Vec<f32> {
        let n = (sample_rate as f64 * duration) as usize;
        (0..n)
            .map(|i| (2.0 * PI * freq * i as f64 / sample_rate as f64).sin() as f32)
            .collect()
    }

    #[test]
    fn detects_a4() {
        let est = detect_pitch(&sine(440.0, 44100, 0.2), 44100, 50.0, 2000.0).unwrap();
        assert!(est.is_pitched());
        assert!((est.frequency - 440.0).abs() < 5.0, "got {}", est.frequency);
    }

    #[test]
    fn detects_low_e() {
        let est = detect_pitch(&sine(82.41, 44100, 0.5), 44100, 50.0, 2000.0).unwrap();
        assert!((est.frequency - 82.41).abs() < 3.0, "got {}", est.frequency);
    }

    #[test]
    fn noise_has_low_confidence() {
        let mut state: u64 = 12345;
        let noise: Vec<f32> = (0..44100)
            .map(|_| {
                state = state
                    .wrapping_mul(6364136223846793005)
                    .wrapping_add(1442695040888963407);
                ((state >> 11) as f64 / (1u64 << 53) as f64 * 2.0 - 1.0) as f32
            })
            .collect();
        let est = detect_pitch(&noise, 44100, 50.0, 2000.0).unwrap();
        assert!(est.confidence < 0.6, "confidence {}", est.confidence);
    }

    #[test]
    fn too_short_is_none() {
        assert!(detect_pitch(&[0.0; 100], 44100, 50.0, 2000.0).is_none());
        assert!(detect_pitch(&[], 44100, 50.0, 2000.0).is_none());
    }
}
