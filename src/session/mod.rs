//! Recording sessions: the shared recording, the state machine, the capture
//! and playback loops, and the controller that ties them together.
//!
//! # Architecture
//!
//! ```text
//!              SessionController  (owns everything below)
//!               │        │         │
//!   spawn_blocking   spawn_blocking  analyze (caller's thread)
//!               │        │         │
//!     CaptureSession  PlaybackSession  SpectrumAnalyzer
//!        │ append        │ snapshot      │ samples
//!        └──────▶ RecordingStore ◀───────┘
//! ```
//!
//! # Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use pcm_scope::audio::SyntheticProvider;
//! use pcm_scope::session::SessionController;
//!
//! #[tokio::main]
//! async fn main() {
//!     let provider = Arc::new(SyntheticProvider::tone(440.0));
//!     let mut ctl = SessionController::new(provider, tokio::runtime::Handle::current());
//!
//!     ctl.start_capture().unwrap();
//!     tokio::time::sleep(std::time::Duration::from_millis(200)).await;
//!     ctl.stop_capture().await.unwrap();
//!
//!     ctl.start_playback().unwrap();
//!     ctl.wait_playback().await.unwrap();
//!
//!     let spectrum = ctl.compute_spectrum().unwrap();
//!     println!("{} bins", spectrum.len());
//! }
//! ```

pub mod capture;
pub mod controller;
pub mod error;
pub mod playback;
pub mod state;
pub mod store;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use capture::{CaptureReport, CaptureSession, SharedPreview};
pub use controller::SessionController;
pub use error::SessionError;
pub use playback::{PlaybackReport, PlaybackSession};
pub use state::{SessionState, SharedSessionState};
pub use store::{new_shared_recording, RecordingStore, SharedRecording};
