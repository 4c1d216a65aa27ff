//! Device capability traits.
//!
//! The capture and playback loops never talk to an audio API directly.  They
//! are handed an [`InputLine`] or [`OutputLine`] opened by a
//! [`DeviceProvider`]; [`crate::audio::CpalProvider`] binds these to the
//! system audio host and [`crate::audio::SyntheticProvider`] to in-process
//! generators used by tests and the offline CLI mode.
//!
//! All three traits are object-safe and `Send` so a line can be moved onto
//! the blocking worker that drives it.

use thiserror::Error;

use super::format::AudioFormat;

// ---------------------------------------------------------------------------
// DeviceError
// ---------------------------------------------------------------------------

/// Errors reported by a device line.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DeviceError {
    /// No device matches the requested format, or it is already claimed.
    #[error("audio device unavailable: {0}")]
    Unavailable(String),

    /// A blocking read or write failed.
    #[error("audio device I/O failed: {0}")]
    Io(String),

    /// Flushing or closing the line failed.
    #[error("failed to close audio device: {0}")]
    Flush(String),
}

// ---------------------------------------------------------------------------
// Lines
// ---------------------------------------------------------------------------

/// A capture line opened at a fixed [`AudioFormat`].
pub trait InputLine: Send {
    /// Begin delivering audio.
    fn start(&mut self) -> Result<(), DeviceError>;

    /// Block until audio is available and copy up to `buf.len()` bytes into
    /// `buf`.  Returns the number of bytes written; `0` means nothing arrived
    /// within the line's polling interval.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, DeviceError>;

    /// Stop the line and release the device.
    fn close(&mut self) -> Result<(), DeviceError>;
}

/// A playback line opened at a fixed [`AudioFormat`].
pub trait OutputLine: Send {
    /// Begin consuming audio.
    fn start(&mut self) -> Result<(), DeviceError>;

    /// Queue `buf` for playback, blocking until the device has accepted it.
    fn write(&mut self, buf: &[u8]) -> Result<usize, DeviceError>;

    /// Block until everything written so far has been played.
    fn drain(&mut self) -> Result<(), DeviceError>;

    /// Stop the line and release the device.
    fn close(&mut self) -> Result<(), DeviceError>;
}

/// Opens lines on some audio backend.
pub trait DeviceProvider: Send + Sync {
    /// Acquire and open an input line at `format`.
    fn open_input(&self, format: &AudioFormat) -> Result<Box<dyn InputLine>, DeviceError>;

    /// Acquire and open an output line at `format`.
    fn open_output(&self, format: &AudioFormat) -> Result<Box<dyn OutputLine>, DeviceError>;
}

const _: fn() = || {
    fn _assert_object_safe(
        _: Box<dyn InputLine>,
        _: Box<dyn OutputLine>,
        _: Box<dyn DeviceProvider>,
    ) {
    }
};
