//! Spectral analysis of the recorded signal.
//!
//! ```text
//! Vec<i16> → f64 → RealTransform::real_forward (packed) → SpectrumBin × N/2
//! ```

pub mod analyzer;
pub mod transform;

pub use analyzer::{peak_bin, strongest_bins, SpectrumAnalyzer, SpectrumBin};
pub use transform::{RealTransform, RustFftTransform};
