//! Playback loop.
//!
//! Streams a snapshot of the recording to an [`OutputLine`] in fixed-size
//! chunks, in order, until it is exhausted; then drains and closes the line.
//! There is no early stop: once started, playback always runs to the end.

use crate::audio::{OutputLine, CHUNK_BYTES};

use super::error::SessionError;

/// Totals for one finished playback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PlaybackReport {
    /// `write` calls issued.
    pub writes: usize,
    /// Bytes accepted by the device.
    pub bytes: usize,
}

/// One pass of a recording over an output line that is already started.
pub struct PlaybackSession {
    line: Box<dyn OutputLine>,
    data: Vec<u8>,
    chunk_bytes: usize,
}

impl PlaybackSession {
    pub fn new(line: Box<dyn OutputLine>, data: Vec<u8>) -> Self {
        Self {
            line,
            data,
            chunk_bytes: CHUNK_BYTES,
        }
    }

    /// Override the chunk size (must be even and non-zero).
    pub fn with_chunk_bytes(mut self, chunk_bytes: usize) -> Self {
        self.chunk_bytes = chunk_bytes.max(2) & !1;
        self
    }

    /// Play everything, then close the line.
    ///
    /// With a device that accepts whole writes this issues exactly
    /// `ceil(len / chunk_bytes)` writes.
    pub fn run(mut self) -> Result<PlaybackReport, SessionError> {
        let result = self.pump();
        let closed = self.line.close();

        match (result, closed) {
            (Ok(report), Ok(())) => Ok(report),
            (Ok(_), Err(e)) => Err(SessionError::Flush(e.to_string())),
            (Err(e), closed) => {
                if let Err(close_err) = closed {
                    log::warn!("playback: close after failure also failed: {close_err}");
                }
                Err(e)
            }
        }
    }

    fn pump(&mut self) -> Result<PlaybackReport, SessionError> {
        let mut report = PlaybackReport::default();
        for chunk in self.data.chunks(self.chunk_bytes) {
            let mut offset = 0;
            while offset < chunk.len() {
                let written = self.line.write(&chunk[offset..])?;
                report.writes += 1;
                if written == 0 {
                    return Err(SessionError::Io("output device accepted no data".into()));
                }
                offset += written;
            }
            report.bytes += chunk.len();
        }

        self.line.drain()?;
        log::debug!(
            "playback: {} bytes in {} writes",
            report.bytes,
            report.writes
        );
        Ok(report)
    }
}
