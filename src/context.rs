//! Per-render context. Built fresh for every render call so no graph
//! state, oscillator phase, or random sequence leaks between applies.

use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::config::RenderLimits;
use crate::tempo::Tempo;

pub struct RenderContext {
    pub sample_rate: u32,
    pub channels: usize,
    pub tempo: Tempo,
    pub limits: RenderLimits,
    rng: StdRng,
}

impl RenderContext {
    pub fn new(sample_rate: u32, channels: usize, seed: u64) -> Self {
        RenderContext {
            sample_rate,
            channels,
            tempo: Tempo::default(),
            limits: RenderLimits::default(),
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn with_tempo(mut self, tempo: Tempo) -> Self {
        self.tempo = tempo;
        self
    }

    pub fn with_limits(mut self, limits: RenderLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn sample_rate_f64(&self) -> f64 {
        self.sample_rate as f64
    }

    /// Convert seconds to a whole number of samples.
    pub fn samples(&self, seconds: f64) -> usize {
        (seconds.max(0.0) * self.sample_rate as f64).round() as usize
    }

    pub fn rng(&mut self) -> &mut StdRng {
        &mut self.rng
    }

    /// A child generator for work that must not disturb the main sequence.
    pub fn fork_rng(&mut self) -> StdRng {
        use rand::Rng;
        StdRng::seed_from_u64(self.rng.gen_range(0..u64::MAX))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    #[test]
    fn same_seed_same_sequence() {
        let mut a = RenderContext::new(44100, 2, 7);
        let mut b = RenderContext::new(44100, 2, 7);
        let xa: Vec<f64> = (0..8).map(|_| a.rng().gen_range(0.0..1.0)).collect();
        let xb: Vec<f64> = (0..8).map(|_| b.rng().gen_range(0.0..1.0)).collect();
        assert_eq!(xa, xb);
    }

    #[test]
    fn samples_rounds() {
        let ctx = RenderContext::new(1000, 1, 0);
        assert_eq!(ctx.samples(0.0126), 13);
        assert_eq!(ctx.samples(-1.0), 0);
    }
}
