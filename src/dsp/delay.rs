//! Circular mono delay line with integer and fractional reads.

/// A single-channel delay line.
///
/// Holds up to `capacity - 1` samples of history. Reads address the past:
/// `read(0)` is the most recently written sample.
#[derive(Debug, Clone)]
pub struct DelayLine {
    buffer: Vec<f32>,
    write_pos: usize,
}

impl DelayLine {
    /// A line able to delay by up to `max_delay_samples`.
    pub fn new(max_delay_samples: usize) -> Self {
        DelayLine {
            buffer: vec![0.0; max_delay_samples + 2],
            write_pos: 0,
        }
    }

    pub fn with_seconds(max_delay_seconds: f64, sample_rate: f64) -> Self {
        Self::new((max_delay_seconds.max(0.0) * sample_rate).ceil() as usize)
    }

    /// Longest delay a read may request.
    pub fn max_delay(&self) -> usize {
        self.buffer.len() - 2
    }

    #[inline]
    pub fn write(&mut self, sample: f32) {
        self.write_pos = (self.write_pos + 1) % self.buffer.len();
        self.buffer[self.write_pos] = sample;
    }

    /// Sample written `delay` samples ago (clamped to the capacity).
    #[inline]
    pub fn read(&self, delay: usize) -> f32 {
        let len = self.buffer.len();
        let delay = delay.min(len - 1);
        self.buffer[(self.write_pos + len - delay) % len]
    }

    /// Linearly interpolated read at a fractional delay.
    #[inline]
    pub fn read_fractional(&self, delay: f64) -> f32 {
        let delay = delay.clamp(0.0, self.max_delay() as f64);
        let whole = delay.floor() as usize;
        let frac = (delay - whole as f64) as f32;
        let a = self.read(whole);
        let b = self.read(whole + 1);
        a + (b - a) * frac
    }

    /// The sample that will be `delay` samples old once the next write
    /// lands. Read this, then `write`, to run a feedback loop.
    #[inline]
    pub fn tap(&self, delay: usize) -> f32 {
        self.read(delay.saturating_sub(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_back_in_order() {
        let mut d = DelayLine::new(8);
        for v in 1..=5 {
            d.write(v as f32);
        }
        assert_eq!(d.read(0), 5.0);
        assert_eq!(d.read(4), 1.0);
        assert_eq!(d.read(5), 0.0);
    }

    #[test]
    fn fractional_read_interpolates() {
        let mut d = DelayLine::new(8);
        d.write(0.0);
        d.write(1.0);
        assert!((d.read_fractional(0.25) - 0.75).abs() < 1e-6);
    }

    #[test]
    fn delayed_impulse_with_feedback() {
        // 10-sample delay, feedback 0.5: echoes at 10, 20, 30 with halving level.
        let mut d = DelayLine::new(16);
        let mut out = Vec::new();
        for i in 0..40 {
            let input = if i == 0 { 1.0 } else { 0.0 };
            let delayed = d.tap(10);
            d.write(input + delayed * 0.5);
            out.push(delayed);
        }
        assert_eq!(out[10], 1.0);
        assert_eq!(out[20], 0.5);
        assert_eq!(out[30], 0.25);
        assert!(out[..10].iter().all(|v| *v == 0.0));
    }

    #[test]
    fn wraps_around() {
        let mut d = DelayLine::new(3);
        for v in 0..100 {
            d.write(v as f32);
        }
        assert_eq!(d.read(0), 99.0);
        assert_eq!(d.read(3), 96.0);
    }
}
