//! Audio containers shared by every effect: the multi-channel
//! `SampleBuffer`, the half-open `Region` a user selects, and the
//! `RenderedRegion` an effect hands back for splicing.

use serde::{Deserialize, Serialize};

use crate::error::FxError;

/// Multi-channel f32 audio at a fixed sample rate.
///
/// Every channel has the same length. Buffers are never mutated in place by
/// an apply; each apply produces a new one.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleBuffer {
    channels: Vec<Vec<f32>>,
    sample_rate: u32,
}

impl SampleBuffer {
    /// Build a buffer, checking the channel-length invariant.
    pub fn new(channels: Vec<Vec<f32>>, sample_rate: u32) -> Result<Self, FxError> {
        if sample_rate == 0 {
            return Err(FxError::validation("sample rate must be positive"));
        }
        if channels.is_empty() {
            return Err(FxError::validation("buffer needs at least one channel"));
        }
        let len = channels[0].len();
        if let Some(bad) = channels.iter().position(|c| c.len() != len) {
            return Err(FxError::validation(format!(
                "channel {bad} has {} samples, expected {len}",
                channels[bad].len()
            )));
        }
        Ok(SampleBuffer {
            channels,
            sample_rate,
        })
    }

    /// A silent buffer.
    pub fn silent(num_channels: usize, len: usize, sample_rate: u32) -> Result<Self, FxError> {
        Self::new(vec![vec![0.0; len]; num_channels.max(1)], sample_rate)
    }

    pub fn from_mono(samples: Vec<f32>, sample_rate: u32) -> Result<Self, FxError> {
        Self::new(vec![samples], sample_rate)
    }

    /// Samples per channel.
    pub fn len(&self) -> usize {
        self.channels[0].len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn num_channels(&self) -> usize {
        self.channels.len()
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn duration_secs(&self) -> f64 {
        self.len() as f64 / self.sample_rate as f64
    }

    pub fn channel(&self, index: usize) -> &[f32] {
        &self.channels[index]
    }

    pub fn channels(&self) -> &[Vec<f32>] {
        &self.channels
    }

    pub fn into_channels(self) -> Vec<Vec<f32>> {
        self.channels
    }

    /// Copy `[start, end)` of every channel, clipped to the buffer length.
    pub fn copy_range(&self, start: usize, end: usize) -> Vec<Vec<f32>> {
        let len = self.len();
        let start = start.min(len);
        let end = end.clamp(start, len);
        self.channels.iter().map(|c| c[start..end].to_vec()).collect()
    }

    /// Copy the samples a region covers.
    pub fn copy_region(&self, region: Region) -> Vec<Vec<f32>> {
        self.copy_range(region.start, region.end)
    }

    /// Average of all channels over `[start, end)`.
    pub fn mono_range(&self, start: usize, end: usize) -> Vec<f32> {
        let channels = self.copy_range(start, end);
        let n = channels.len() as f32;
        let len = channels.first().map_or(0, |c| c.len());
        (0..len)
            .map(|i| channels.iter().map(|c| c[i]).sum::<f32>() / n)
            .collect()
    }

    /// Largest absolute sample value across all channels.
    pub fn peak(&self) -> f32 {
        self.channels
            .iter()
            .flat_map(|c| c.iter())
            .fold(0.0f32, |m, &s| m.max(s.abs()))
    }
}

/// Half-open sample range `[start, end)` selected for processing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Region {
    pub start: usize,
    pub end: usize,
}

impl Region {
    /// Build a non-empty region.
    pub fn new(start: usize, end: usize) -> Result<Self, FxError> {
        if end <= start {
            return Err(FxError::validation(format!(
                "region [{start}, {end}) is empty"
            )));
        }
        Ok(Region { start, end })
    }

    /// The whole of a buffer.
    pub fn full(buffer: &SampleBuffer) -> Result<Self, FxError> {
        Self::new(0, buffer.len())
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, index: usize) -> bool {
        index >= self.start && index < self.end
    }

    /// Check the region is non-empty and lies inside a buffer of `len` samples.
    pub fn validate(&self, len: usize) -> Result<(), FxError> {
        if self.is_empty() {
            return Err(FxError::validation(format!(
                "region [{}, {}) is empty",
                self.start, self.end
            )));
        }
        if self.end > len {
            return Err(FxError::validation(format!(
                "region [{}, {}) exceeds buffer length {len}",
                self.start, self.end
            )));
        }
        Ok(())
    }
}

/// Where a rendered block lands when spliced back into the source buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// Index 0 of the render is `region.start`; anything past the region is dropped.
    Region,
    /// The render is addressed at absolute indices; only the region is copied.
    FullLength,
    /// The render replaces audio starting at an absolute index, clipped to the
    /// original length. May reach outside the region (pre-echo buildups).
    Overwrite { start: usize },
    /// The render is inserted at an absolute index; later audio shifts right
    /// and the buffer grows.
    Insert { at: usize },
}

/// Output of an effect render, consumed immediately by the splicer.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedRegion {
    pub channels: Vec<Vec<f32>>,
    pub placement: Placement,
}

impl RenderedRegion {
    pub fn new(channels: Vec<Vec<f32>>, placement: Placement) -> Self {
        RenderedRegion {
            channels,
            placement,
        }
    }

    /// Region-relative render of exactly the processed span.
    pub fn region(channels: Vec<Vec<f32>>) -> Self {
        Self::new(channels, Placement::Region)
    }

    pub fn len(&self) -> usize {
        self.channels.iter().map(|c| c.len()).max().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Reject non-finite output and clamp everything to [-1, 1].
    pub fn finalize(mut self) -> Result<Self, FxError> {
        for (ch, samples) in self.channels.iter_mut().enumerate() {
            for (i, s) in samples.iter_mut().enumerate() {
                if !s.is_finite() {
                    return Err(FxError::render(format!(
                        "non-finite sample at channel {ch}, index {i}"
                    )));
                }
                *s = s.clamp(-1.0, 1.0);
            }
        }
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_ragged_channels() {
        let err = SampleBuffer::new(vec![vec![0.0; 4], vec![0.0; 3]], 44100).unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn rejects_zero_sample_rate() {
        assert!(SampleBuffer::new(vec![vec![0.0; 4]], 0).is_err());
    }

    #[test]
    fn region_validation() {
        assert!(Region::new(10, 10).is_err());
        let r = Region { start: 5, end: 2 };
        assert!(r.validate(100).is_err());
        let r = Region::new(0, 101).unwrap();
        assert!(r.validate(100).is_err());
        assert!(Region::new(0, 100).unwrap().validate(100).is_ok());
    }

    #[test]
    fn copy_range_is_clipped() {
        let buf = SampleBuffer::from_mono(vec![1.0, 2.0, 3.0], 8000).unwrap();
        assert_eq!(buf.copy_range(1, 10), vec![vec![2.0, 3.0]]);
        assert_eq!(buf.copy_range(5, 10), vec![Vec::<f32>::new()]);
    }

    #[test]
    fn finalize_clamps_and_rejects_nan() {
        let r = RenderedRegion::region(vec![vec![2.0, -3.0, 0.5]]).finalize().unwrap();
        assert_eq!(r.channels[0], vec![1.0, -1.0, 0.5]);

        let err = RenderedRegion::region(vec![vec![0.0, f32::NAN]]).finalize().unwrap_err();
        assert!(matches!(err, FxError::Render(_)));
    }

    #[test]
    fn mono_fold_down() {
        let buf = SampleBuffer::new(vec![vec![1.0, 0.0], vec![0.0, 1.0]], 8000).unwrap();
        assert_eq!(buf.mono_range(0, 2), vec![0.5, 0.5]);
    }
}
