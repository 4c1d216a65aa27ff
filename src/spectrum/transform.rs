//! Real-input forward FFT with the standard packed layout.
//!
//! For input `a` of length `n`, [`RealTransform::real_forward`] overwrites
//! `a` with the non-redundant half of the spectrum `X`:
//!
//! ```text
//! n even:  a[0] = Re X[0]   a[1] = Re X[n/2]
//! n odd:   a[0] = Re X[0]   a[1] = Im X[(n-1)/2]   a[n-1] = Re X[(n-1)/2]
//! both:    a[2k] = Re X[k]  a[2k+1] = Im X[k]      for 0 < k < n/2
//! ```

use std::sync::{Arc, Mutex, PoisonError};

use rustfft::num_complex::Complex;
use rustfft::FftPlanner;

/// In-place real forward transform.
pub trait RealTransform: Send + Sync {
    fn real_forward(&self, data: &mut [f64]);
}

/// [`RealTransform`] computed with a rustfft complex FFT of the same length.
///
/// Plans are cached by the inner planner, so repeated analyses of the same
/// length reuse their twiddles.
pub struct RustFftTransform {
    planner: Mutex<FftPlanner<f64>>,
}

impl RustFftTransform {
    pub fn new() -> Self {
        Self {
            planner: Mutex::new(FftPlanner::new()),
        }
    }
}

impl Default for RustFftTransform {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for RustFftTransform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RustFftTransform").finish_non_exhaustive()
    }
}

impl RealTransform for RustFftTransform {
    fn real_forward(&self, data: &mut [f64]) {
        let n = data.len();
        if n < 2 {
            // X[0] of a single sample is the sample itself.
            return;
        }

        let fft: Arc<dyn rustfft::Fft<f64>> = self
            .planner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .plan_fft_forward(n);

        let mut spectrum: Vec<Complex<f64>> =
            data.iter().map(|&x| Complex::new(x, 0.0)).collect();
        fft.process(&mut spectrum);

        pack(&spectrum, data);
    }
}

fn pack(spectrum: &[Complex<f64>], out: &mut [f64]) {
    let n = out.len();
    let half = n / 2;

    out[0] = spectrum[0].re;
    for k in 1..half {
        out[2 * k] = spectrum[k].re;
        out[2 * k + 1] = spectrum[k].im;
    }

    if n % 2 == 0 {
        out[1] = spectrum[half].re;
    } else {
        out[1] = spectrum[half].im;
        out[n - 1] = spectrum[half].re;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    fn naive_dft(input: &[f64]) -> Vec<Complex<f64>> {
        let n = input.len();
        (0..n)
            .map(|k| {
                input
                    .iter()
                    .enumerate()
                    .map(|(j, &x)| {
                        let angle = -2.0 * PI * (j * k) as f64 / n as f64;
                        Complex::new(x * angle.cos(), x * angle.sin())
                    })
                    .sum()
            })
            .collect()
    }

    fn assert_close(a: f64, b: f64) {
        assert!((a - b).abs() < 1e-9, "{a} != {b}");
    }

    #[test]
    fn even_length_packing_matches_dft() {
        let input = [3.0, -1.0, 4.0, 1.0, -5.0, 9.0, 2.0, -6.0];
        let expected = naive_dft(&input);

        let mut data = input;
        RustFftTransform::new().real_forward(&mut data);

        assert_close(data[0], expected[0].re);
        assert_close(data[1], expected[4].re);
        for k in 1..4 {
            assert_close(data[2 * k], expected[k].re);
            assert_close(data[2 * k + 1], expected[k].im);
        }
    }

    #[test]
    fn odd_length_packing_matches_dft() {
        let input = [2.0, 7.0, -1.0, 8.0, 2.0, -8.0, 1.0];
        let expected = naive_dft(&input);

        let mut data = input;
        RustFftTransform::new().real_forward(&mut data);

        assert_close(data[0], expected[0].re);
        assert_close(data[1], expected[3].im);
        assert_close(data[6], expected[3].re);
        for k in 1..3 {
            assert_close(data[2 * k], expected[k].re);
            assert_close(data[2 * k + 1], expected[k].im);
        }
    }

    #[test]
    fn tiny_inputs() {
        let transform = RustFftTransform::new();

        let mut empty: [f64; 0] = [];
        transform.real_forward(&mut empty);

        let mut one = [5.0];
        transform.real_forward(&mut one);
        assert_eq!(one, [5.0]);

        let mut two = [1.0, 3.0];
        transform.real_forward(&mut two);
        assert_close(two[0], 4.0);
        assert_close(two[1], -2.0);
    }
}
