use thiserror::Error;

use crate::audio::codec::CodecError;
use crate::audio::DeviceError;

use super::state::SessionState;

/// Errors returned by the control surface.
///
/// Device failures are never retried; the caller decides whether to try
/// again.  A failed start leaves the state at Idle and the previous recording
/// untouched.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SessionError {
    /// The input or output device could not be opened or started.
    #[error("audio device unavailable: {0}")]
    DeviceUnavailable(String),

    /// The request conflicts with the running session.
    #[error("cannot {action} while {state}")]
    Busy {
        action: &'static str,
        state: SessionState,
    },

    #[error("no capture session is running")]
    NotRecording,

    #[error("no playback session has been started")]
    NotPlaying,

    #[error("nothing has been recorded yet")]
    EmptyRecording,

    /// A chunk did not hold whole samples.
    #[error(transparent)]
    Malformed(#[from] CodecError),

    /// A blocking device read or write failed mid-session.
    #[error("audio I/O failed: {0}")]
    Io(String),

    /// Closing the device failed.  Audio captured before the failure is kept.
    #[error("failed to flush audio device: {0}")]
    Flush(String),

    /// The worker task panicked or was cancelled.
    #[error("session worker failed: {0}")]
    Worker(String),
}

impl From<DeviceError> for SessionError {
    fn from(err: DeviceError) -> Self {
        match err {
            DeviceError::Unavailable(msg) => SessionError::DeviceUnavailable(msg),
            DeviceError::Io(msg) => SessionError::Io(msg),
            DeviceError::Flush(msg) => SessionError::Flush(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn device_errors_map_to_session_errors() {
        assert_eq!(
            SessionError::from(DeviceError::Unavailable("x".into())),
            SessionError::DeviceUnavailable("x".into())
        );
        assert_eq!(
            SessionError::from(DeviceError::Flush("y".into())),
            SessionError::Flush("y".into())
        );
    }

    #[test]
    fn busy_message_names_state() {
        let err = SessionError::Busy {
            action: "start playback",
            state: SessionState::Recording,
        };
        assert_eq!(err.to_string(), "cannot start playback while Recording");
    }
}
