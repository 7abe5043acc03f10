//! Oversampling wrapper for nonlinear stages.
//!
//! Upsampling zero-stuffs and lowpasses; downsampling lowpasses and keeps
//! every `factor`-th sample. Both lowpasses are two cascaded Butterworth
//! biquads just under the original Nyquist.

use super::filter::{BiquadFilter, FilterType};

const BUTTERWORTH_Q: f64 = std::f64::consts::FRAC_1_SQRT_2;

#[derive(Debug, Clone)]
pub struct Oversampler {
    factor: usize,
    up: [BiquadFilter; 2],
    down: [BiquadFilter; 2],
}

impl Oversampler {
    pub fn new(factor: usize, sample_rate: f64) -> Self {
        let factor = factor.max(1);
        let high_rate = sample_rate * factor as f64;
        let cutoff = sample_rate * 0.45;
        let lp = || BiquadFilter::with_params(FilterType::Lowpass, high_rate, cutoff, BUTTERWORTH_Q, 0.0);
        Oversampler {
            factor,
            up: [lp(), lp()],
            down: [lp(), lp()],
        }
    }

    pub fn factor(&self) -> usize {
        self.factor
    }

    /// Run `stage` at the oversampled rate for one input sample.
    #[inline]
    pub fn process<F: FnMut(f32) -> f32>(&mut self, input: f32, mut stage: F) -> f32 {
        if self.factor == 1 {
            return stage(input);
        }
        let mut out = 0.0;
        for k in 0..self.factor {
            let stuffed = if k == 0 { input as f64 * self.factor as f64 } else { 0.0 };
            let up = self.up[0].process(stuffed);
            let up = self.up[1].process(up);
            let shaped = stage(up as f32) as f64;
            let down = self.down[0].process(shaped);
            let down = self.down[1].process(down);
            if k == 0 {
                out = down as f32;
            }
        }
        out
    }
}
