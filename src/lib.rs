//! pcm-scope: record mono PCM, play it back and inspect its spectrum.

pub mod audio;
pub mod config;
pub mod session;
pub mod spectrum;
