//! Capture loop.
//!
//! [`CaptureSession::run`] is meant for a blocking worker.  It reads
//! [`CHUNK_BYTES`] at a time from its [`InputLine`], decodes each chunk,
//! appends it to the recording and feeds the live preview, until the shared
//! `running` flag is cleared.  The flag is checked between reads, so after a
//! stop request at most one more chunk is captured.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use crate::audio::codec::{decode, encode};
use crate::audio::{InputLine, PreviewSeries, CHUNK_BYTES};

use super::error::SessionError;
use super::store::SharedRecording;

/// Preview series shared with the capture worker.
pub type SharedPreview = Arc<Mutex<PreviewSeries>>;

/// Totals for one finished capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CaptureReport {
    /// Non-empty reads appended to the recording.
    pub chunks: usize,
    /// Bytes appended to the recording.
    pub bytes: usize,
}

/// One recording pass over an input line that is already started.
pub struct CaptureSession {
    line: Box<dyn InputLine>,
    recording: SharedRecording,
    preview: SharedPreview,
    running: Arc<AtomicBool>,
}

impl CaptureSession {
    pub fn new(
        line: Box<dyn InputLine>,
        recording: SharedRecording,
        preview: SharedPreview,
        running: Arc<AtomicBool>,
    ) -> Self {
        Self {
            line,
            recording,
            preview,
            running,
        }
    }

    /// Capture until stopped, then close the line.
    ///
    /// A read or decode failure ends the loop early; the line is still
    /// closed and everything appended so far stays in the recording.
    pub fn run(mut self) -> Result<CaptureReport, SessionError> {
        let result = self.pump();
        let closed = self.line.close();

        match (result, closed) {
            (Ok(report), Ok(())) => Ok(report),
            (Ok(_), Err(e)) => Err(SessionError::Flush(e.to_string())),
            (Err(e), closed) => {
                if let Err(close_err) = closed {
                    log::warn!("capture: close after failure also failed: {close_err}");
                }
                Err(e)
            }
        }
    }

    fn pump(&mut self) -> Result<CaptureReport, SessionError> {
        let mut report = CaptureReport::default();
        let mut chunk = vec![0u8; CHUNK_BYTES];

        while self.running.load(Ordering::SeqCst) {
            let n = self.line.read(&mut chunk)?;
            if n == 0 {
                continue;
            }

            let samples = decode(&chunk[..n])?;

            self.recording
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .append(&encode(&samples));
            self.preview
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push_chunk(&samples);

            report.chunks += 1;
            report.bytes += n;
        }

        log::debug!(
            "capture: loop exited after {} chunks ({} bytes)",
            report.chunks,
            report.bytes
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::device::DeviceError;
    use crate::audio::PreviewFilter;
    use crate::session::store::new_shared_recording;

    /// Returns scripted reads, then clears `running` once the script is used.
    struct ScriptedInput {
        reads: Vec<Result<Vec<u8>, DeviceError>>,
        running: Arc<AtomicBool>,
        closed: Arc<AtomicBool>,
    }

    impl InputLine for ScriptedInput {
        fn start(&mut self) -> Result<(), DeviceError> {
            Ok(())
        }

        fn read(&mut self, buf: &mut [u8]) -> Result<usize, DeviceError> {
            if self.reads.len() <= 1 {
                self.running.store(false, Ordering::SeqCst);
            }
            if self.reads.is_empty() {
                return Ok(0);
            }
            let bytes = self.reads.remove(0)?;
            buf[..bytes.len()].copy_from_slice(&bytes);
            Ok(bytes.len())
        }

        fn close(&mut self) -> Result<(), DeviceError> {
            self.closed.store(true, Ordering::SeqCst);
            Ok(())
        }
    }

    fn session(
        reads: Vec<Result<Vec<u8>, DeviceError>>,
    ) -> (CaptureSession, SharedRecording, SharedPreview, Arc<AtomicBool>) {
        let running = Arc::new(AtomicBool::new(true));
        let closed = Arc::new(AtomicBool::new(false));
        let recording = new_shared_recording();
        let preview = Arc::new(Mutex::new(PreviewSeries::new(
            PreviewFilter::PositiveOnly,
            1_000,
        )));
        let line = ScriptedInput {
            reads,
            running: Arc::clone(&running),
            closed: Arc::clone(&closed),
        };
        let session = CaptureSession::new(
            Box::new(line),
            Arc::clone(&recording),
            Arc::clone(&preview),
            running,
        );
        (session, recording, preview, closed)
    }

    #[test]
    fn appends_every_chunk_in_order() {
        let (session, recording, preview, closed) =
            session(vec![Ok(encode(&[5, -5])), Ok(encode(&[7]))]);

        let report = session.run().unwrap();
        assert_eq!(report, CaptureReport { chunks: 2, bytes: 6 });
        assert_eq!(recording.lock().unwrap().samples().unwrap(), vec![5, -5, 7]);
        assert_eq!(preview.lock().unwrap().len(), 2);
        assert!(closed.load(Ordering::SeqCst));
    }

    #[test]
    fn read_error_keeps_captured_audio_and_closes() {
        let (session, recording, _, closed) = session(vec![
            Ok(encode(&[1, 2])),
            Err(DeviceError::Io("unplugged".into())),
        ]);

        let err = session.run().unwrap_err();
        assert_eq!(err, SessionError::Io("unplugged".into()));
        assert_eq!(recording.lock().unwrap().len(), 4);
        assert!(closed.load(Ordering::SeqCst));
    }

    #[test]
    fn odd_chunk_is_rejected() {
        let (session, recording, _, _) = session(vec![Ok(vec![1, 2, 3])]);

        let err = session.run().unwrap_err();
        assert!(matches!(err, SessionError::Malformed(_)), "{err}");
        assert!(recording.lock().unwrap().is_empty());
    }

    #[test]
    fn empty_reads_are_skipped() {
        let (session, recording, _, _) = session(vec![Ok(Vec::new()), Ok(encode(&[3]))]);

        let report = session.run().unwrap();
        assert_eq!(report.chunks, 1);
        assert_eq!(recording.lock().unwrap().len(), 2);
    }
}
