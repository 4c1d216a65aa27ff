//! Session state machine.
//!
//! ```text
//! Idle ──start_capture──▶ Recording ──stop_capture──▶ Idle
//! Idle ──start_playback─▶ Playing ──buffer exhausted─▶ Idle
//! ```
//!
//! Recording and Playing never follow each other directly.

use std::sync::{Arc, Mutex};

/// What the controller is doing right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    /// Nothing running; every control is available.
    #[default]
    Idle,
    /// A capture worker is appending to the recording.
    Recording,
    /// A playback worker is streaming the recording out.
    Playing,
}

impl SessionState {
    /// `true` while a worker owns a device line.
    ///
    /// ```
    /// use pcm_scope::session::SessionState;
    ///
    /// assert!(!SessionState::Idle.is_busy());
    /// assert!(SessionState::Recording.is_busy());
    /// assert!(SessionState::Playing.is_busy());
    /// ```
    pub fn is_busy(&self) -> bool {
        !matches!(self, SessionState::Idle)
    }

    /// Whether the recording may be read (played or analysed).
    pub fn can_read_recording(&self) -> bool {
        !matches!(self, SessionState::Recording)
    }

    pub fn label(&self) -> &'static str {
        match self {
            SessionState::Idle => "Idle",
            SessionState::Recording => "Recording",
            SessionState::Playing => "Playing",
        }
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// State shared with the playback worker, which returns it to Idle itself.
pub type SharedSessionState = Arc<Mutex<SessionState>>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_idle() {
        assert_eq!(SessionState::default(), SessionState::Idle);
    }

    #[test]
    fn recording_blocks_readers() {
        assert!(!SessionState::Recording.can_read_recording());
        assert!(SessionState::Idle.can_read_recording());
        assert!(SessionState::Playing.can_read_recording());
    }

    #[test]
    fn labels() {
        assert_eq!(SessionState::Idle.to_string(), "Idle");
        assert_eq!(SessionState::Recording.to_string(), "Recording");
        assert_eq!(SessionState::Playing.to_string(), "Playing");
    }
}
