//! Audio plumbing: PCM format, codec, device lines and the live preview.
//!
//! # Pipeline
//!
//! ```text
//! InputLine::read → 4096-byte chunk → codec::decode → Vec<i16>
//!                                         ├─▶ codec::encode → recording
//!                                         └─▶ PreviewSeries (filter_positive)
//! recording → 4096-byte chunks → OutputLine::write
//! ```
//!
//! Lines come from a [`DeviceProvider`]: [`CpalProvider`] for the system audio
//! host, [`SyntheticProvider`] for a generated tone and a recording sink.

pub mod codec;
pub mod cpal_backend;
pub mod device;
pub mod format;
pub mod preview;
pub mod synthetic;

pub use codec::{decode, encode, CodecError};
pub use cpal_backend::CpalProvider;
pub use device::{DeviceError, DeviceProvider, InputLine, OutputLine};
pub use format::{AudioFormat, CHUNK_BYTES};
pub use preview::{filter_positive, PreviewFilter, PreviewPoint, PreviewSeries};
pub use synthetic::{DeviceEvent, DeviceLog, SyntheticProvider};
