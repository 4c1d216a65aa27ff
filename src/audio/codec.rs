//! Little-endian 16-bit PCM codec.
//!
//! Stateless: each chunk read from or written to a device is converted on its
//! own, so a chunk boundary never splits a sample.
//!
//! ```rust
//! use pcm_scope::audio::codec::{decode, encode};
//!
//! let bytes = encode(&[1, -2, i16::MAX]);
//! assert_eq!(bytes.len(), 6);
//! assert_eq!(decode(&bytes).unwrap(), vec![1, -2, i16::MAX]);
//! ```

use thiserror::Error;

/// Errors raised by [`decode`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// The byte buffer ends with half a sample.
    #[error("malformed PCM buffer: {len} bytes is not a whole number of 16-bit samples")]
    MalformedBuffer { len: usize },
}

/// Interpret `bytes` as little-endian signed 16-bit samples.
///
/// # Errors
///
/// [`CodecError::MalformedBuffer`] when `bytes.len()` is odd.
pub fn decode(bytes: &[u8]) -> Result<Vec<i16>, CodecError> {
    if bytes.len() % 2 != 0 {
        return Err(CodecError::MalformedBuffer { len: bytes.len() });
    }

    Ok(bytes
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
        .collect())
}

/// Inverse of [`decode`]; always returns `2 * samples.len()` bytes.
pub fn encode(samples: &[i16]) -> Vec<u8> {
    let mut out = Vec::with_capacity(samples.len() * 2);
    for s in samples {
        out.extend_from_slice(&s.to_le_bytes());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_is_little_endian() {
        // 0x0201 = 513, 0xFFFF = -1, 0x8000 = i16::MIN
        let bytes = [0x01, 0x02, 0xFF, 0xFF, 0x00, 0x80];
        assert_eq!(decode(&bytes).unwrap(), vec![513, -1, i16::MIN]);
    }

    #[test]
    fn odd_length_is_malformed() {
        let err = decode(&[0x01, 0x02, 0x03]).unwrap_err();
        assert_eq!(err, CodecError::MalformedBuffer { len: 3 });
    }

    #[test]
    fn empty_buffer_decodes_to_nothing() {
        assert!(decode(&[]).unwrap().is_empty());
        assert!(encode(&[]).is_empty());
    }

    #[test]
    fn encode_length_is_twice_sample_count() {
        for n in [0usize, 1, 7, 2048] {
            let samples = vec![-123_i16; n];
            assert_eq!(encode(&samples).len(), 2 * n);
        }
    }

    #[test]
    fn encode_of_decode_restores_bytes() {
        let bytes: Vec<u8> = (0..=255u8).chain(0..=255u8).collect();
        assert_eq!(encode(&decode(&bytes).unwrap()), bytes);
    }

    #[test]
    fn chunks_decode_independently() {
        let samples: Vec<i16> = (-2048..2048).collect();
        let bytes = encode(&samples);

        let joined: Vec<i16> = bytes
            .chunks(4096)
            .flat_map(|c| decode(c).unwrap())
            .collect();
        assert_eq!(joined, samples);
    }
}
