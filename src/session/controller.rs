//! Control surface for capture, playback and analysis.
//!
//! [`SessionController`] is the composition-root context: it owns the
//! recording, the session state, the live preview and the device provider,
//! and hands each capture or playback pass to its own blocking worker on the
//! tokio runtime.
//!
//! ```text
//! start_capture ─▶ open + start input ─▶ reset recording ─▶ Recording ─▶ spawn_blocking(CaptureSession::run) ─▶ Idle
//! stop_capture  ─▶ clear flag ─▶ await worker (line closed) ─▶ Idle
//! start_playback ─▶ snapshot ─▶ open + start output ─▶ Playing ─▶ spawn_blocking(PlaybackSession::run) ─▶ Idle
//! compute_spectrum ─▶ decode recording ─▶ SpectrumAnalyzer::analyze
//! ```
//!
//! The recording has a single writer (the capture worker) and readers only
//! start once that worker has exited, after
//! [`stop_capture`](SessionController::stop_capture) or a device failure:
//! every reader is rejected with [`SessionError::Busy`] while Recording.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use crate::audio::{
    AudioFormat, DeviceError, DeviceProvider, PreviewFilter, PreviewPoint, PreviewSeries,
};
use crate::config::AppConfig;
use crate::spectrum::{SpectrumAnalyzer, SpectrumBin};

use super::capture::{CaptureReport, CaptureSession, SharedPreview};
use super::error::SessionError;
use super::playback::{PlaybackReport, PlaybackSession};
use super::state::{SessionState, SharedSessionState};
use super::store::{new_shared_recording, SharedRecording};

/// Default cap on live preview points (about 10 s of fully positive audio).
pub const DEFAULT_PREVIEW_POINTS: usize = 320_000;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Any failure while acquiring a line means the device is unavailable.
fn acquisition_error(err: DeviceError) -> SessionError {
    match err {
        DeviceError::Unavailable(msg) | DeviceError::Io(msg) | DeviceError::Flush(msg) => {
            SessionError::DeviceUnavailable(msg)
        }
    }
}

struct ActiveCapture {
    running: Arc<AtomicBool>,
    task: JoinHandle<Result<CaptureReport, SessionError>>,
}

/// Owns one recording and everything that reads or writes it.
pub struct SessionController {
    format: AudioFormat,
    provider: Arc<dyn DeviceProvider>,
    runtime: Handle,
    analyzer: SpectrumAnalyzer,
    state: SharedSessionState,
    recording: SharedRecording,
    preview: SharedPreview,
    capture: Option<ActiveCapture>,
    playback: Option<JoinHandle<Result<PlaybackReport, SessionError>>>,
}

impl SessionController {
    /// Controller at [`AudioFormat::PCM_32K_MONO`] with the default preview
    /// filter.  Workers are spawned on `runtime`.
    pub fn new(provider: Arc<dyn DeviceProvider>, runtime: Handle) -> Self {
        let format = AudioFormat::PCM_32K_MONO;
        Self {
            format,
            provider,
            runtime,
            analyzer: SpectrumAnalyzer::new(format.sample_rate),
            state: Arc::new(Mutex::new(SessionState::Idle)),
            recording: new_shared_recording(),
            preview: Arc::new(Mutex::new(PreviewSeries::new(
                PreviewFilter::default(),
                DEFAULT_PREVIEW_POINTS,
            ))),
            capture: None,
            playback: None,
        }
    }

    /// Controller configured from the `[preview]` section of `config`.
    pub fn from_config(
        provider: Arc<dyn DeviceProvider>,
        runtime: Handle,
        config: &AppConfig,
    ) -> Self {
        let filter = if config.preview.positive_only {
            PreviewFilter::PositiveOnly
        } else {
            PreviewFilter::All
        };
        Self::new(provider, runtime).with_preview(filter, config.preview.max_points)
    }

    /// Replace the preview filter and point cap.
    pub fn with_preview(self, filter: PreviewFilter, max_points: usize) -> Self {
        *lock(&self.preview) = PreviewSeries::new(filter, max_points);
        self
    }

    pub fn format(&self) -> AudioFormat {
        self.format
    }

    pub fn state(&self) -> SessionState {
        *lock(&self.state)
    }

    fn set_state(&self, state: SessionState) {
        *lock(&self.state) = state;
    }

    // -----------------------------------------------------------------------
    // Capture
    // -----------------------------------------------------------------------

    /// Open and start the input device, then record on a blocking worker.
    ///
    /// The recording is only reset once the device is running.  The worker
    /// returns the state to Idle when its loop ends, whether stopped or
    /// failed; see [`capture_finished`](Self::capture_finished).
    ///
    /// # Errors
    ///
    /// [`SessionError::Busy`] unless Idle; [`SessionError::DeviceUnavailable`]
    /// when the device cannot be opened or started, in which case the state
    /// stays Idle and the previous recording is left intact.
    pub fn start_capture(&mut self) -> Result<(), SessionError> {
        let state = self.state();
        if state.is_busy() {
            return Err(SessionError::Busy {
                action: "start capture",
                state,
            });
        }

        if self.capture.take().is_some() {
            log::debug!("capture: discarding result of a capture that ended on its own");
        }

        let mut line = self.provider.open_input(&self.format).map_err(|e| {
            log::error!("capture: failed to open input device: {e}");
            acquisition_error(e)
        })?;
        if let Err(e) = line.start() {
            log::error!("capture: failed to start input device: {e}");
            if let Err(close_err) = line.close() {
                log::warn!("capture: close after failed start also failed: {close_err}");
            }
            return Err(acquisition_error(e));
        }

        lock(&self.recording).reset();
        lock(&self.preview).clear();
        self.set_state(SessionState::Recording);

        let running = Arc::new(AtomicBool::new(true));
        let session = CaptureSession::new(
            line,
            Arc::clone(&self.recording),
            Arc::clone(&self.preview),
            Arc::clone(&running),
        );
        let state = Arc::clone(&self.state);
        let task = self.runtime.spawn_blocking(move || {
            let result = session.run();
            if let Err(e) = &result {
                log::error!("capture ended with error: {e}");
            }
            *lock(&state) = SessionState::Idle;
            result
        });
        self.capture = Some(ActiveCapture { running, task });

        log::info!("capture started ({})", self.format);
        Ok(())
    }

    /// Whether the current capture worker has exited, either after a stop
    /// request or because the device failed.  Its outcome is collected by
    /// [`stop_capture`](Self::stop_capture).
    pub fn capture_finished(&self) -> bool {
        self.capture
            .as_ref()
            .is_some_and(|active| active.task.is_finished())
    }

    /// Stop recording and wait until the worker has exited and closed the
    /// device.  At most one further chunk is captured after this is called.
    ///
    /// Also collects the outcome of a capture that already ended on its own.
    /// The state is Idle afterwards even when the worker reports an error;
    /// audio captured before the error stays in the recording.
    pub async fn stop_capture(&mut self) -> Result<CaptureReport, SessionError> {
        let Some(active) = self.capture.take() else {
            return Err(SessionError::NotRecording);
        };

        active.running.store(false, Ordering::SeqCst);
        let outcome = active.task.await;
        self.set_state(SessionState::Idle);

        let dropped = lock(&self.preview).dropped();
        if dropped > 0 {
            log::warn!("preview: {dropped} points past the cap were not plotted");
        }

        let report = outcome.map_err(|e| SessionError::Worker(e.to_string()))??;
        log::info!(
            "capture stopped: {} bytes ({:.2}s) in {} chunks",
            report.bytes,
            self.format.duration_secs(report.bytes),
            report.chunks
        );
        Ok(report)
    }

    /// Bytes recorded so far.  Safe to poll while Recording; it only reads the
    /// length, never the audio.
    pub fn recorded_bytes(&self) -> usize {
        lock(&self.recording).len()
    }

    /// Copy of the live time-domain series.
    pub fn preview_series(&self) -> Vec<PreviewPoint> {
        lock(&self.preview).points().to_vec()
    }

    // -----------------------------------------------------------------------
    // Playback
    // -----------------------------------------------------------------------

    /// Open and start the output device, then play the whole recording on a
    /// blocking worker.  The worker returns the state to Idle once the recording is
    /// exhausted and the device is closed.
    ///
    /// # Errors
    ///
    /// [`SessionError::Busy`] unless Idle (including while another playback is
    /// running), [`SessionError::EmptyRecording`] when nothing was recorded,
    /// [`SessionError::DeviceUnavailable`] when the device cannot be opened or
    /// started.
    pub fn start_playback(&mut self) -> Result<(), SessionError> {
        let state = self.state();
        if state.is_busy() {
            return Err(SessionError::Busy {
                action: "start playback",
                state,
            });
        }

        let data = lock(&self.recording).snapshot();
        if data.is_empty() {
            return Err(SessionError::EmptyRecording);
        }

        let mut line = self.provider.open_output(&self.format).map_err(|e| {
            log::error!("playback: failed to open output device: {e}");
            acquisition_error(e)
        })?;
        if let Err(e) = line.start() {
            log::error!("playback: failed to start output device: {e}");
            if let Err(close_err) = line.close() {
                log::warn!("playback: close after failed start also failed: {close_err}");
            }
            return Err(acquisition_error(e));
        }

        if self.playback.take().is_some() {
            log::debug!("playback: discarding result of an unawaited earlier playback");
        }

        self.set_state(SessionState::Playing);
        log::info!(
            "playback started: {} bytes ({:.2}s)",
            data.len(),
            self.format.duration_secs(data.len())
        );

        let state = Arc::clone(&self.state);
        let session = PlaybackSession::new(line, data);
        self.playback = Some(self.runtime.spawn_blocking(move || {
            let result = session.run();
            match &result {
                Ok(report) => log::info!("playback finished: {} writes", report.writes),
                Err(e) => log::error!("playback failed: {e}"),
            }
            *lock(&state) = SessionState::Idle;
            result
        }));
        Ok(())
    }

    /// Wait for the most recent playback to finish and return its outcome.
    pub async fn wait_playback(&mut self) -> Result<PlaybackReport, SessionError> {
        let Some(task) = self.playback.take() else {
            return Err(SessionError::NotPlaying);
        };
        task.await.map_err(|e| SessionError::Worker(e.to_string()))?
    }

    // -----------------------------------------------------------------------
    // Analysis
    // -----------------------------------------------------------------------

    /// Magnitude spectrum of the whole recording.  Empty when nothing was
    /// recorded.
    ///
    /// # Errors
    ///
    /// [`SessionError::Busy`] while Recording.
    pub fn compute_spectrum(&self) -> Result<Vec<SpectrumBin>, SessionError> {
        let state = self.state();
        if !state.can_read_recording() {
            return Err(SessionError::Busy {
                action: "compute spectrum",
                state,
            });
        }

        let samples = lock(&self.recording).samples()?;
        Ok(self.analyzer.analyze(&samples))
    }

    /// Copy of the recording's bytes.
    ///
    /// # Errors
    ///
    /// [`SessionError::Busy`] while Recording.
    pub fn snapshot(&self) -> Result<Vec<u8>, SessionError> {
        let state = self.state();
        if !state.can_read_recording() {
            return Err(SessionError::Busy {
                action: "read the recording",
                state,
            });
        }
        Ok(lock(&self.recording).snapshot())
    }
}

impl Drop for SessionController {
    fn drop(&mut self) {
        // Let a still-running capture worker exit and release its device.
        if let Some(active) = self.capture.take() {
            active.running.store(false, Ordering::SeqCst);
        }
    }
}
