//! The single authoritative recording.
//!
//! [`RecordingStore`] is append-only while a capture is active and read-only
//! otherwise.  It is shared with the capture worker as a [`SharedRecording`]
//! (`Arc<Mutex<RecordingStore>>`); the mutex keeps access memory-safe while
//! the controller's state gate keeps readers and the writer apart in time.

use std::sync::{Arc, Mutex};

use crate::audio::codec::{decode, CodecError};
use crate::audio::AudioFormat;

/// Byte-encoded PCM recorded by the last capture session.
#[derive(Debug, Default, Clone)]
pub struct RecordingStore {
    bytes: Vec<u8>,
}

impl RecordingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Discard the recording.  Called once at the start of every capture.
    pub fn reset(&mut self) {
        self.bytes = Vec::new();
    }

    /// Append encoded audio.  Only the active capture session calls this.
    pub fn append(&mut self, bytes: &[u8]) {
        self.bytes.extend_from_slice(bytes);
    }

    /// Copy of the full recording.
    pub fn snapshot(&self) -> Vec<u8> {
        self.bytes.clone()
    }

    /// The recording decoded to samples.
    pub fn samples(&self) -> Result<Vec<i16>, CodecError> {
        decode(&self.bytes)
    }

    /// Recorded length in bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Recorded duration assuming `format`.
    pub fn duration_secs(&self, format: &AudioFormat) -> f32 {
        format.duration_secs(self.bytes.len())
    }
}

/// Recording shared between the controller and the capture worker.
pub type SharedRecording = Arc<Mutex<RecordingStore>>;

/// Construct an empty [`SharedRecording`].
pub fn new_shared_recording() -> SharedRecording {
    Arc::new(Mutex::new(RecordingStore::new()))
}
