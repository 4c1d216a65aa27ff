//! In-process device backend.
//!
//! [`SyntheticProvider`] opens an input line that generates a pure sine tone
//! and an output line that records every write instead of playing it.  Every
//! line operation is appended to a shared [`DeviceLog`], which lets tests
//! check call order and interleaving without real hardware.  The CLI uses the
//! same backend for its `--tone` mode.
//!
//! ```rust
//! use pcm_scope::audio::{AudioFormat, DeviceProvider, SyntheticProvider};
//!
//! let provider = SyntheticProvider::tone(440.0).with_total_samples(4);
//! let mut line = provider.open_input(&AudioFormat::PCM_32K_MONO).unwrap();
//! line.start().unwrap();
//!
//! let mut buf = [0u8; 64];
//! assert_eq!(line.read(&mut buf).unwrap(), 8);
//! ```

use std::f64::consts::PI;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::device::{DeviceError, DeviceProvider, InputLine, OutputLine};
use super::format::AudioFormat;

/// How long an exhausted input waits before reporting an empty read.
const IDLE_POLL: Duration = Duration::from_millis(2);

// ---------------------------------------------------------------------------
// DeviceLog
// ---------------------------------------------------------------------------

/// One operation performed on a synthetic line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceEvent {
    InputOpened,
    InputStarted,
    /// A read that returned this many bytes.
    Read(usize),
    InputClosed,
    OutputOpened,
    OutputStarted,
    /// A write of this many bytes.
    Write(usize),
    Drained,
    OutputClosed,
}

/// Ordered record of every line operation plus the bytes written to outputs.
#[derive(Debug, Default)]
pub struct DeviceLog {
    events: Mutex<Vec<DeviceEvent>>,
    written: Mutex<Vec<u8>>,
}

impl DeviceLog {
    fn push(&self, event: DeviceEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }

    /// Copy of all events so far.
    pub fn events(&self) -> Vec<DeviceEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    /// Number of reads issued so far, including empty ones.
    pub fn read_calls(&self) -> usize {
        self.events()
            .iter()
            .filter(|e| matches!(e, DeviceEvent::Read(_)))
            .count()
    }

    /// Lengths of every output write, in order.
    pub fn write_lengths(&self) -> Vec<usize> {
        self.events()
            .iter()
            .filter_map(|e| match e {
                DeviceEvent::Write(n) => Some(*n),
                _ => None,
            })
            .collect()
    }

    /// Concatenation of every byte written to output lines.
    pub fn written(&self) -> Vec<u8> {
        self.written.lock().map(|w| w.clone()).unwrap_or_default()
    }
}

// ---------------------------------------------------------------------------
// SyntheticProvider
// ---------------------------------------------------------------------------

/// Configurable in-process [`DeviceProvider`].
#[derive(Debug, Clone)]
pub struct SyntheticProvider {
    frequency: f64,
    amplitude: f64,
    total_samples: Option<usize>,
    read_delay: Duration,
    write_delay: Duration,
    fail_input: bool,
    fail_output: bool,
    fail_start: bool,
    fail_close: bool,
    input_claimed: Arc<AtomicBool>,
    log: Arc<DeviceLog>,
}

impl SyntheticProvider {
    /// A provider whose input produces an endless sine at `frequency` Hz with
    /// half full-scale amplitude.
    pub fn tone(frequency: f64) -> Self {
        Self {
            frequency,
            amplitude: f64::from(i16::MAX) * 0.5,
            total_samples: None,
            read_delay: Duration::ZERO,
            write_delay: Duration::ZERO,
            fail_input: false,
            fail_output: false,
            fail_start: false,
            fail_close: false,
            input_claimed: Arc::new(AtomicBool::new(false)),
            log: Arc::new(DeviceLog::default()),
        }
    }

    /// Stop producing audio after `n` samples; later reads return `0`.
    pub fn with_total_samples(mut self, n: usize) -> Self {
        self.total_samples = Some(n);
        self
    }

    /// Sleep this long in every input read.
    pub fn with_read_delay(mut self, delay: Duration) -> Self {
        self.read_delay = delay;
        self
    }

    /// Sleep this long in every output write.
    pub fn with_write_delay(mut self, delay: Duration) -> Self {
        self.write_delay = delay;
        self
    }

    /// Pace reads like a real device: one chunk's worth of audio per read.
    pub fn realtime(self, format: &AudioFormat, chunk_bytes: usize) -> Self {
        let secs = format.duration_secs(chunk_bytes);
        self.with_read_delay(Duration::from_secs_f32(secs))
    }

    /// Make `open_input` fail with [`DeviceError::Unavailable`].
    pub fn failing_input(mut self) -> Self {
        self.fail_input = true;
        self
    }

    /// Make `open_output` fail with [`DeviceError::Unavailable`].
    pub fn failing_output(mut self) -> Self {
        self.fail_output = true;
        self
    }

    /// Open lines normally but make their `start` fail with
    /// [`DeviceError::Io`], like a device that vanishes between open and play.
    pub fn failing_start(mut self) -> Self {
        self.fail_start = true;
        self
    }

    /// Make `close` on input lines fail with [`DeviceError::Flush`].
    pub fn failing_close(mut self) -> Self {
        self.fail_close = true;
        self
    }

    /// Shared log of every line operation.
    pub fn log(&self) -> Arc<DeviceLog> {
        Arc::clone(&self.log)
    }
}

impl DeviceProvider for SyntheticProvider {
    fn open_input(&self, format: &AudioFormat) -> Result<Box<dyn InputLine>, DeviceError> {
        if self.fail_input {
            return Err(DeviceError::Unavailable("synthetic input disabled".into()));
        }
        if self.input_claimed.swap(true, Ordering::SeqCst) {
            return Err(DeviceError::Unavailable(
                "synthetic input already claimed".into(),
            ));
        }

        self.log.push(DeviceEvent::InputOpened);
        Ok(Box::new(ToneInput {
            step: 2.0 * PI * self.frequency / f64::from(format.sample_rate),
            amplitude: self.amplitude,
            position: 0,
            remaining: self.total_samples,
            read_delay: self.read_delay,
            fail_start: self.fail_start,
            fail_close: self.fail_close,
            claimed: Arc::clone(&self.input_claimed),
            log: Arc::clone(&self.log),
        }))
    }

    fn open_output(&self, _format: &AudioFormat) -> Result<Box<dyn OutputLine>, DeviceError> {
        if self.fail_output {
            return Err(DeviceError::Unavailable("synthetic output disabled".into()));
        }

        self.log.push(DeviceEvent::OutputOpened);
        Ok(Box::new(RecordingOutput {
            write_delay: self.write_delay,
            fail_start: self.fail_start,
            log: Arc::clone(&self.log),
        }))
    }
}

// ---------------------------------------------------------------------------
// Lines
// ---------------------------------------------------------------------------

struct ToneInput {
    /// Phase increment per sample in radians.
    step: f64,
    amplitude: f64,
    position: u64,
    remaining: Option<usize>,
    read_delay: Duration,
    fail_start: bool,
    fail_close: bool,
    claimed: Arc<AtomicBool>,
    log: Arc<DeviceLog>,
}

impl InputLine for ToneInput {
    fn start(&mut self) -> Result<(), DeviceError> {
        if self.fail_start {
            return Err(DeviceError::Io("synthetic input failed to start".into()));
        }
        self.log.push(DeviceEvent::InputStarted);
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, DeviceError> {
        if !self.read_delay.is_zero() {
            std::thread::sleep(self.read_delay);
        }

        let mut count = buf.len() / 2;
        if let Some(remaining) = self.remaining.as_mut() {
            count = count.min(*remaining);
            *remaining -= count;
        }

        if count == 0 {
            std::thread::sleep(IDLE_POLL);
            self.log.push(DeviceEvent::Read(0));
            return Ok(0);
        }

        for frame in buf[..count * 2].chunks_exact_mut(2) {
            let value = (self.amplitude * (self.step * self.position as f64).sin()).round();
            let sample = value.clamp(f64::from(i16::MIN), f64::from(i16::MAX)) as i16;
            frame.copy_from_slice(&sample.to_le_bytes());
            self.position += 1;
        }

        self.log.push(DeviceEvent::Read(count * 2));
        Ok(count * 2)
    }

    fn close(&mut self) -> Result<(), DeviceError> {
        self.claimed.store(false, Ordering::SeqCst);
        self.log.push(DeviceEvent::InputClosed);
        if self.fail_close {
            return Err(DeviceError::Flush("synthetic close failure".into()));
        }
        Ok(())
    }
}

struct RecordingOutput {
    write_delay: Duration,
    fail_start: bool,
    log: Arc<DeviceLog>,
}

impl OutputLine for RecordingOutput {
    fn start(&mut self) -> Result<(), DeviceError> {
        if self.fail_start {
            return Err(DeviceError::Io("synthetic output failed to start".into()));
        }
        self.log.push(DeviceEvent::OutputStarted);
        Ok(())
    }

    fn write(&mut self, buf: &[u8]) -> Result<usize, DeviceError> {
        if !self.write_delay.is_zero() {
            std::thread::sleep(self.write_delay);
        }
        if let Ok(mut written) = self.log.written.lock() {
            written.extend_from_slice(buf);
        }
        self.log.push(DeviceEvent::Write(buf.len()));
        Ok(buf.len())
    }

    fn drain(&mut self) -> Result<(), DeviceError> {
        self.log.push(DeviceEvent::Drained);
        Ok(())
    }

    fn close(&mut self) -> Result<(), DeviceError> {
        self.log.push(DeviceEvent::OutputClosed);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::codec::decode;

    const FMT: AudioFormat = AudioFormat::PCM_32K_MONO;

    #[test]
    fn tone_starts_at_zero_phase() {
        let provider = SyntheticProvider::tone(1000.0);
        let mut line = provider.open_input(&FMT).unwrap();
        let mut buf = [0u8; 64];
        let n = line.read(&mut buf).unwrap();
        let samples = decode(&buf[..n]).unwrap();
        assert_eq!(samples[0], 0);
        assert!(samples[1] > 0);
    }

    #[test]
    fn finite_source_is_exhausted() {
        let provider = SyntheticProvider::tone(440.0).with_total_samples(3);
        let mut line = provider.open_input(&FMT).unwrap();
        let mut buf = [0u8; 16];
        assert_eq!(line.read(&mut buf).unwrap(), 6);
        assert_eq!(line.read(&mut buf).unwrap(), 0);
        assert_eq!(provider.log().read_calls(), 2);
    }

    #[test]
    fn odd_buffer_reads_whole_samples() {
        let provider = SyntheticProvider::tone(440.0);
        let mut line = provider.open_input(&FMT).unwrap();
        let mut buf = [0u8; 7];
        assert_eq!(line.read(&mut buf).unwrap(), 6);
    }

    #[test]
    fn input_cannot_be_claimed_twice() {
        let provider = SyntheticProvider::tone(440.0);
        let mut first = provider.open_input(&FMT).unwrap();
        assert!(matches!(
            provider.open_input(&FMT),
            Err(DeviceError::Unavailable(_))
        ));

        first.close().unwrap();
        assert!(provider.open_input(&FMT).is_ok());
    }

    #[test]
    fn failing_providers_report_unavailable() {
        let provider = SyntheticProvider::tone(440.0)
            .failing_input()
            .failing_output();
        assert!(matches!(
            provider.open_input(&FMT),
            Err(DeviceError::Unavailable(_))
        ));
        assert!(matches!(
            provider.open_output(&FMT),
            Err(DeviceError::Unavailable(_))
        ));
        assert!(provider.log().events().is_empty());
    }

    #[test]
    fn output_records_writes() {
        let provider = SyntheticProvider::tone(440.0);
        let mut line = provider.open_output(&FMT).unwrap();
        line.start().unwrap();
        line.write(&[1, 2, 3, 4]).unwrap();
        line.write(&[5, 6]).unwrap();
        line.drain().unwrap();
        line.close().unwrap();

        let log = provider.log();
        assert_eq!(log.write_lengths(), vec![4, 2]);
        assert_eq!(log.written(), vec![1, 2, 3, 4, 5, 6]);
        assert_eq!(
            log.events(),
            vec![
                DeviceEvent::OutputOpened,
                DeviceEvent::OutputStarted,
                DeviceEvent::Write(4),
                DeviceEvent::Write(2),
                DeviceEvent::Drained,
                DeviceEvent::OutputClosed,
            ]
        );
    }

    #[test]
    fn failing_start_opens_but_refuses_to_start() {
        let provider = SyntheticProvider::tone(440.0).failing_start();
        let mut input = provider.open_input(&FMT).unwrap();
        let mut output = provider.open_output(&FMT).unwrap();

        assert!(matches!(input.start(), Err(DeviceError::Io(_))));
        assert!(matches!(output.start(), Err(DeviceError::Io(_))));
        input.close().unwrap();

        assert_eq!(
            provider.log().events(),
            vec![
                DeviceEvent::InputOpened,
                DeviceEvent::OutputOpened,
                DeviceEvent::InputClosed,
            ]
        );
        // Closing released the claim.
        assert!(provider.open_input(&FMT).is_ok());
    }
}
