//! Multiband crossover built from cascaded Butterworth sections.
//!
//! Each split point is a 4th-order Linkwitz-Riley pair: two Butterworth
//! lowpass biquads for the band below and two Butterworth highpass biquads
//! for everything above. Bands are peeled off from the bottom up, so band
//! `k` is the lowpass of whatever remained above split `k - 1`.

use super::filter::{BiquadFilter, FilterType};

const BUTTERWORTH_Q: f64 = std::f64::consts::FRAC_1_SQRT_2;

#[derive(Debug, Clone)]
struct Split {
    low: [BiquadFilter; 2],
    high: [BiquadFilter; 2],
}

impl Split {
    fn new(frequency: f64, sample_rate: f64) -> Self {
        let lp = || BiquadFilter::with_params(FilterType::Lowpass, sample_rate, frequency, BUTTERWORTH_Q, 0.0);
        let hp = || BiquadFilter::with_params(FilterType::Highpass, sample_rate, frequency, BUTTERWORTH_Q, 0.0);
        Split {
            low: [lp(), lp()],
            high: [hp(), hp()],
        }
    }

    #[inline]
    fn process(&mut self, input: f64) -> (f64, f64) {
        let low = self.low[0].process(input);
        let high = self.high[0].process(input);
        (self.low[1].process(low), self.high[1].process(high))
    }
}

/// Splits one channel into `frequencies.len() + 1` bands.
#[derive(Debug, Clone)]
pub struct MultibandCrossover {
    splits: Vec<Split>,
}

impl MultibandCrossover {
    /// Crossover points are sorted and de-duplicated; each must be below Nyquist.
    pub fn new(frequencies: &[f64], sample_rate: f64) -> Self {
        let mut freqs: Vec<f64> = frequencies
            .iter()
            .copied()
            .filter(|f| f.is_finite() && *f > 0.0)
            .map(|f| f.min(sample_rate * 0.45))
            .collect();
        freqs.sort_by(|a, b| a.total_cmp(b));
        freqs.dedup_by(|a, b| (*a - *b).abs() < 1.0);
        MultibandCrossover {
            splits: freqs.iter().map(|&f| Split::new(f, sample_rate)).collect(),
        }
    }

    pub fn num_bands(&self) -> usize {
        self.splits.len() + 1
    }

    /// Split one sample; `bands` must hold `num_bands()` slots.
    #[inline]
    pub fn split(&mut self, input: f64, bands: &mut [f64]) {
        let mut rest = input;
        for (k, split) in self.splits.iter_mut().enumerate() {
            let (low, high) = split.process(rest);
            bands[k] = low;
            rest = high;
        }
        bands[self.splits.len()] = rest;
    }
}
