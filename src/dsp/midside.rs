//! Mid/side stereo codec with power-preserving 1/√2 scaling.

use std::f32::consts::FRAC_1_SQRT_2;

pub struct MidSideCodec;

impl MidSideCodec {
    /// `(L, R) -> (M, S)`
    #[inline]
    pub fn encode(left: f32, right: f32) -> (f32, f32) {
        ((left + right) * FRAC_1_SQRT_2, (left - right) * FRAC_1_SQRT_2)
    }

    /// `(M, S) -> (L, R)`
    #[inline]
    pub fn decode(mid: f32, side: f32) -> (f32, f32) {
        ((mid + side) * FRAC_1_SQRT_2, (mid - side) * FRAC_1_SQRT_2)
    }

    /// Encode whole channels.
    pub fn encode_channels(left: &[f32], right: &[f32]) -> (Vec<f32>, Vec<f32>) {
        left.iter()
            .zip(right)
            .map(|(&l, &r)| Self::encode(l, r))
            .unzip()
    }

    /// Decode whole channels.
    pub fn decode_channels(mid: &[f32], side: &[f32]) -> (Vec<f32>, Vec<f32>) {
        mid.iter()
            .zip(side)
            .map(|(&m, &s)| Self::decode(m, s))
            .unzip()
    }
}
