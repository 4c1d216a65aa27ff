//! The fixed PCM format used for the whole process.
//!
//! Every line is opened at [`AudioFormat::PCM_32K_MONO`]; the format is never
//! renegotiated once a session has started.

/// Size in bytes of one device read or write.
pub const CHUNK_BYTES: usize = 4096;

/// Description of a PCM stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioFormat {
    /// Frames per second.
    pub sample_rate: u32,
    /// Bits per sample (per channel).
    pub bits_per_sample: u16,
    /// Number of interleaved channels.
    pub channels: u16,
    /// Two's-complement samples when `true`.
    pub signed: bool,
    /// Byte order of each sample.
    pub big_endian: bool,
}

impl AudioFormat {
    /// 32 kHz, signed 16-bit, mono, little-endian.
    pub const PCM_32K_MONO: AudioFormat = AudioFormat {
        sample_rate: 32_000,
        bits_per_sample: 16,
        channels: 1,
        signed: true,
        big_endian: false,
    };

    /// Bytes occupied by one frame (one sample per channel).
    pub fn bytes_per_frame(&self) -> usize {
        usize::from(self.bits_per_sample / 8) * usize::from(self.channels)
    }

    /// Bytes produced by one second of audio.
    pub fn bytes_per_second(&self) -> usize {
        self.bytes_per_frame() * self.sample_rate as usize
    }

    /// Duration in seconds of `bytes` of audio in this format.
    pub fn duration_secs(&self, bytes: usize) -> f32 {
        let per_sec = self.bytes_per_second();
        if per_sec == 0 {
            return 0.0;
        }
        bytes as f32 / per_sec as f32
    }

    /// Stream configuration handed to cpal when opening a line.
    pub fn stream_config(&self) -> cpal::StreamConfig {
        cpal::StreamConfig {
            channels: self.channels,
            sample_rate: cpal::SampleRate(self.sample_rate),
            buffer_size: cpal::BufferSize::Default,
        }
    }
}

impl Default for AudioFormat {
    fn default() -> Self {
        Self::PCM_32K_MONO
    }
}

impl std::fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} Hz, {}-bit, {} ch, {}, {}",
            self.sample_rate,
            self.bits_per_sample,
            self.channels,
            if self.signed { "signed" } else { "unsigned" },
            if self.big_endian { "BE" } else { "LE" },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_32k_mono_16bit() {
        let fmt = AudioFormat::default();
        assert_eq!(fmt.sample_rate, 32_000);
        assert_eq!(fmt.bits_per_sample, 16);
        assert_eq!(fmt.channels, 1);
        assert!(fmt.signed);
        assert!(!fmt.big_endian);
    }

    #[test]
    fn one_second_is_64000_bytes() {
        assert_eq!(AudioFormat::PCM_32K_MONO.bytes_per_second(), 64_000);
        assert!((AudioFormat::PCM_32K_MONO.duration_secs(32_000) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn chunk_is_64ms() {
        let ms = AudioFormat::PCM_32K_MONO.duration_secs(CHUNK_BYTES) * 1000.0;
        assert!((ms - 64.0).abs() < 1e-3, "chunk = {ms} ms");
    }

    #[test]
    fn stream_config_matches_format() {
        let cfg = AudioFormat::PCM_32K_MONO.stream_config();
        assert_eq!(cfg.channels, 1);
        assert_eq!(cfg.sample_rate.0, 32_000);
    }
}
