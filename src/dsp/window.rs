//! Grain windows and linear fades.

use std::f64::consts::PI;

/// Raised-cosine (Hann) window value at `pos` in [0, 1].
#[inline]
pub fn hann_at(pos: f64) -> f64 {
    0.5 - 0.5 * (2.0 * PI * pos.clamp(0.0, 1.0)).cos()
}

/// Symmetric Hann window of `len` points.
pub fn hann(len: usize) -> Vec<f32> {
    match len {
        0 => Vec::new(),
        1 => vec![1.0],
        _ => (0..len)
            .map(|i| hann_at(i as f64 / (len - 1) as f64) as f32)
            .collect(),
    }
}

/// Linear fade from silence over the first `len` samples.
pub fn fade_in(samples: &mut [f32], len: usize) {
    let len = len.min(samples.len());
    for (i, s) in samples[..len].iter_mut().enumerate() {
        *s *= i as f32 / len as f32;
    }
}

/// Linear fade to silence over the last `len` samples; the final sample is 0.
pub fn fade_out(samples: &mut [f32], len: usize) {
    let n = samples.len();
    let len = len.min(n);
    if len == 0 {
        return;
    }
    for (k, s) in samples[n - len..].iter_mut().enumerate() {
        *s *= (len - 1 - k) as f32 / len as f32;
    }
}
