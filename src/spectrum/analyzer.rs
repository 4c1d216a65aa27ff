//! Magnitude spectrum of a whole recording.
//!
//! Samples are widened to `f64` as-is (no window, no normalisation), run
//! through a [`RealTransform`] of the same length, and read back pairwise from
//! the packed output: bin `i` has frequency `i * sample_rate / N` and
//! magnitude `sqrt(a[2i]² + a[2i+1]²)`.  Because of the packed layout, bin 0
//! also folds in the Nyquist term for even `N`.
//!
//! ```rust
//! use pcm_scope::spectrum::SpectrumAnalyzer;
//!
//! let analyzer = SpectrumAnalyzer::new(32_000);
//! assert!(analyzer.analyze(&[]).is_empty());
//! assert_eq!(analyzer.analyze(&[0; 1000]).len(), 500);
//! ```

use std::sync::Arc;

use serde::Serialize;

use super::transform::{RealTransform, RustFftTransform};

/// One `(frequency, magnitude)` point of the spectrum.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SpectrumBin {
    /// Centre frequency in Hz.
    pub frequency: f64,
    /// Raw transform magnitude (not power-normalised).
    pub magnitude: f64,
}

/// Computes [`SpectrumBin`]s for sample sequences at a fixed sample rate.
#[derive(Clone)]
pub struct SpectrumAnalyzer {
    sample_rate: u32,
    transform: Arc<dyn RealTransform>,
}

impl SpectrumAnalyzer {
    /// Analyzer backed by [`RustFftTransform`].
    pub fn new(sample_rate: u32) -> Self {
        Self::with_transform(sample_rate, Arc::new(RustFftTransform::new()))
    }

    pub fn with_transform(sample_rate: u32, transform: Arc<dyn RealTransform>) -> Self {
        Self {
            sample_rate,
            transform,
        }
    }

    /// Spectrum of `samples`: `samples.len() / 2` bins, empty for no input.
    pub fn analyze(&self, samples: &[i16]) -> Vec<SpectrumBin> {
        let n = samples.len();
        if n == 0 {
            return Vec::new();
        }

        let mut data: Vec<f64> = samples.iter().map(|&s| f64::from(s)).collect();
        self.transform.real_forward(&mut data);

        let resolution = f64::from(self.sample_rate) / n as f64;
        (0..n / 2)
            .map(|i| {
                let re = data[2 * i];
                let im = data[2 * i + 1];
                SpectrumBin {
                    frequency: i as f64 * resolution,
                    magnitude: (re * re + im * im).sqrt(),
                }
            })
            .collect()
    }
}

impl std::fmt::Debug for SpectrumAnalyzer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpectrumAnalyzer")
            .field("sample_rate", &self.sample_rate)
            .finish_non_exhaustive()
    }
}

/// Strongest bin above DC, with its index.
pub fn peak_bin(bins: &[SpectrumBin]) -> Option<(usize, SpectrumBin)> {
    strongest_bins(bins, 1).into_iter().next()
}

/// The `count` strongest bins above DC, loudest first.
pub fn strongest_bins(bins: &[SpectrumBin], count: usize) -> Vec<(usize, SpectrumBin)> {
    let mut ranked: Vec<(usize, SpectrumBin)> =
        bins.iter().copied().enumerate().skip(1).collect();
    ranked.sort_by(|a, b| b.1.magnitude.total_cmp(&a.1.magnitude));
    ranked.truncate(count);
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    const RATE: u32 = 32_000;

    fn sine(freq: f64, n: usize) -> Vec<i16> {
        (0..n)
            .map(|i| {
                let t = i as f64 / f64::from(RATE);
                (10_000.0 * (2.0 * PI * freq * t).sin()).round() as i16
            })
            .collect()
    }

    #[test]
    fn empty_input_gives_empty_spectrum() {
        assert!(SpectrumAnalyzer::new(RATE).analyze(&[]).is_empty());
    }

    #[test]
    fn bin_count_is_half_the_input() {
        let analyzer = SpectrumAnalyzer::new(RATE);
        assert_eq!(analyzer.analyze(&sine(100.0, 1024)).len(), 512);
        assert_eq!(analyzer.analyze(&sine(100.0, 1001)).len(), 500);
        assert!(analyzer.analyze(&[7]).is_empty());
    }

    #[test]
    fn frequencies_step_by_resolution() {
        let bins = SpectrumAnalyzer::new(RATE).analyze(&sine(0.0, 64));
        assert_eq!(bins[0].frequency, 0.0);
        assert!((bins[1].frequency - 500.0).abs() < 1e-9);
        assert!((bins[31].frequency - 15_500.0).abs() < 1e-9);
    }

    #[test]
    fn pure_tone_peaks_at_its_bin() {
        // 1024 samples → 31.25 Hz resolution; 37 * 31.25 = 1156.25 Hz.
        let bins = SpectrumAnalyzer::new(RATE).analyze(&sine(1156.25, 1024));
        let (index, bin) = peak_bin(&bins).unwrap();
        assert_eq!(index, 37);
        assert!((bin.frequency - 1156.25).abs() < 1e-9);
    }

    #[test]
    fn off_bin_tone_peaks_at_nearest_bin() {
        // 3000 Hz / 31.25 Hz = 96.0; 3010 Hz is still nearest to bin 96.
        let bins = SpectrumAnalyzer::new(RATE).analyze(&sine(3010.0, 1024));
        assert_eq!(peak_bin(&bins).unwrap().0, 96);
    }

    #[test]
    fn constant_signal_is_all_dc() {
        let bins = SpectrumAnalyzer::new(RATE).analyze(&[2; 16]);
        assert!((bins[0].magnitude - 32.0).abs() < 1e-9);
        assert!(bins[1..].iter().all(|b| b.magnitude < 1e-9));
    }

    #[test]
    fn bin_zero_folds_in_nyquist_term() {
        // Alternating signal: DC = 0, X[n/2] = n.
        let samples: Vec<i16> = (0..8).map(|i| if i % 2 == 0 { 1 } else { -1 }).collect();
        let bins = SpectrumAnalyzer::new(RATE).analyze(&samples);
        assert!((bins[0].magnitude - 8.0).abs() < 1e-9);
    }

    #[test]
    fn strongest_bins_are_sorted() {
        let mut samples = sine(1000.0, 320);
        for (s, t) in samples.iter_mut().zip(sine(3000.0, 320)) {
            *s = s.saturating_add(t / 2);
        }
        let bins = SpectrumAnalyzer::new(RATE).analyze(&samples);
        let top = strongest_bins(&bins, 2);
        // 100 Hz resolution.
        assert_eq!(top[0].0, 10);
        assert_eq!(top[1].0, 30);
    }

    #[test]
    fn peak_of_empty_is_none() {
        assert!(peak_bin(&[]).is_none());
    }
}
