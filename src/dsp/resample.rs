//! Fractional-position reads for pitch shifting by simple resampling.

/// Playback-rate ratio for a shift in semitones.
#[inline]
pub fn semitones_to_ratio(semitones: f64) -> f64 {
    2.0_f64.powf(semitones / 12.0)
}

/// Read with linear interpolation at a fractional position.
/// Positions before the start or past the end read as silence.
#[inline]
pub fn read_interpolated(data: &[f32], position: f64) -> f32 {
    if data.is_empty() || position < 0.0 {
        return 0.0;
    }
    let idx = position as usize;
    if idx >= data.len() - 1 {
        return if idx < data.len() { data[idx] } else { 0.0 };
    }
    let frac = (position - idx as f64) as f32;
    data[idx] * (1.0 - frac) + data[idx + 1] * frac
}

/// Like [`read_interpolated`] but the position wraps around the data.
#[inline]
pub fn read_wrapped(data: &[f32], position: f64) -> f32 {
    let n = data.len();
    if n == 0 {
        return 0.0;
    }
    let pos = position.rem_euclid(n as f64);
    let idx = (pos as usize).min(n - 1);
    let next = (idx + 1) % n;
    let frac = (pos - idx as f64) as f32;
    data[idx] * (1.0 - frac) + data[next] * frac
}

/// Resample `data` by `ratio` into a block of the same length, wrapping
/// when a faster rate runs off the end.
pub fn repitch_wrapped(data: &[f32], ratio: f64) -> Vec<f32> {
    (0..data.len())
        .map(|i| read_wrapped(data, i as f64 * ratio))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interpolation() {
        let data = [0.0, 1.0, 0.0];
        assert!((read_interpolated(&data, 0.5) - 0.5).abs() < 1e-6);
        assert!((read_interpolated(&data, 1.5) - 0.5).abs() < 1e-6);
        assert_eq!(read_interpolated(&data, 2.0), 0.0);
        assert_eq!(read_interpolated(&data, 5.0), 0.0);
        assert_eq!(read_interpolated(&data, -1.0), 0.0);
    }

    #[test]
    fn wrapped_reads_cycle() {
        let data = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(read_wrapped(&data, 4.0), 1.0);
        assert!((read_wrapped(&data, 3.5) - 2.5).abs() < 1e-6);
        assert_eq!(read_wrapped(&data, -1.0), 4.0);
    }

    #[test]
    fn octave_up_skips_samples() {
        let data: Vec<f32> = (0..8).map(|i| i as f32).collect();
        let up = repitch_wrapped(&data, semitones_to_ratio(12.0));
        assert_eq!(up[..4], [0.0, 2.0, 4.0, 6.0]);
        assert_eq!(up[4], 0.0);
    }
}
