//! FFT overlap-add convolution.

use std::sync::Arc;

use rustfft::num_complex::Complex32;
use rustfft::{Fft, FftPlanner};

const MIN_BLOCK: usize = 64;

/// Convolves signals against one fixed impulse response.
///
/// The input is cut into blocks of `B = next_pow2(ir.len())` samples, each
/// multiplied with the IR spectrum at FFT size `2B`, and the results are
/// overlap-added.
pub struct Convolver {
    block: usize,
    ir_len: usize,
    ir_spectrum: Vec<Complex32>,
    forward: Arc<dyn Fft<f32>>,
    inverse: Arc<dyn Fft<f32>>,
}

impl Convolver {
    pub fn new(ir: &[f32]) -> Self {
        let block = ir.len().next_power_of_two().max(MIN_BLOCK);
        let size = block * 2;
        let mut planner = FftPlanner::<f32>::new();
        let forward = planner.plan_fft_forward(size);
        let inverse = planner.plan_fft_inverse(size);

        let mut ir_spectrum = vec![Complex32::new(0.0, 0.0); size];
        for (slot, &v) in ir_spectrum.iter_mut().zip(ir) {
            *slot = Complex32::new(v, 0.0);
        }
        forward.process(&mut ir_spectrum);

        Convolver {
            block,
            ir_len: ir.len(),
            ir_spectrum,
            forward,
            inverse,
        }
    }

    /// Full linear convolution: `input.len() + ir.len() - 1` samples.
    pub fn process(&self, input: &[f32]) -> Vec<f32> {
        if input.is_empty() || self.ir_len == 0 {
            return Vec::new();
        }
        let out_len = input.len() + self.ir_len - 1;
        let mut out = vec![0.0f32; out_len];
        let size = self.block * 2;
        let scale = 1.0 / size as f32;
        let mut buf = vec![Complex32::new(0.0, 0.0); size];

        for (k, chunk) in input.chunks(self.block).enumerate() {
            buf.fill(Complex32::new(0.0, 0.0));
            for (slot, &v) in buf.iter_mut().zip(chunk) {
                *slot = Complex32::new(v, 0.0);
            }
            self.forward.process(&mut buf);
            for (a, h) in buf.iter_mut().zip(&self.ir_spectrum) {
                *a *= *h;
            }
            self.inverse.process(&mut buf);

            let offset = k * self.block;
            let span = (chunk.len() + self.ir_len - 1).min(out_len - offset);
            for (o, v) in out[offset..offset + span].iter_mut().zip(&buf) {
                *o += v.re * scale;
            }
        }
        out
    }
}

/// One-shot convenience wrapper.
pub fn convolve(input: &[f32], ir: &[f32]) -> Vec<f32> {
    Convolver::new(ir).process(input)
}
