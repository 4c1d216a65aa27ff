//! System audio lines via `cpal`.
//!
//! cpal is callback driven and its `Stream` is not `Send` on every platform,
//! while the session loops want blocking, movable lines.  Each line therefore
//! owns a small driver thread that builds the stream, keeps it alive and
//! plays/drops it on request.  Audio crosses between the cpal callback and the
//! line over `std::sync::mpsc` channels:
//!
//! ```text
//! input:  cpal callback ──Vec<u8>──▶ CpalInput::read   (blocks on recv)
//! output: CpalOutput::write ──Vec<i16>──▶ cpal callback (bounded → backpressure)
//! ```

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{mpsc, Arc};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};

use super::codec::{decode, encode};
use super::device::{DeviceError, DeviceProvider, InputLine, OutputLine};
use super::format::AudioFormat;

/// Longest a single `read` waits for the callback before returning `0`.
const READ_POLL: Duration = Duration::from_millis(100);
/// Chunks queued towards the output callback before `write` blocks.
const OUTPUT_QUEUE_CHUNKS: usize = 4;
/// Extra time `drain` allows beyond the queued audio's duration.
const DRAIN_GRACE: Duration = Duration::from_secs(2);

// ---------------------------------------------------------------------------
// CpalProvider
// ---------------------------------------------------------------------------

/// [`DeviceProvider`] backed by the default cpal host.
///
/// Device names of `None` select the host's default input/output device.
#[derive(Debug, Clone, Default)]
pub struct CpalProvider {
    input_device: Option<String>,
    output_device: Option<String>,
}

impl CpalProvider {
    pub fn new(input_device: Option<String>, output_device: Option<String>) -> Self {
        Self {
            input_device,
            output_device,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Direction {
    Input,
    Output,
}

fn find_device(name: Option<&str>, direction: Direction) -> Result<cpal::Device, DeviceError> {
    let host = cpal::default_host();
    let unavailable = |e: cpal::DevicesError| DeviceError::Unavailable(e.to_string());

    let Some(wanted) = name else {
        let device = match direction {
            Direction::Input => host.default_input_device(),
            Direction::Output => host.default_output_device(),
        };
        return device.ok_or_else(|| {
            DeviceError::Unavailable(format!("no default {direction:?} device on the audio host"))
        });
    };

    let mut devices: Box<dyn Iterator<Item = cpal::Device>> = match direction {
        Direction::Input => Box::new(host.input_devices().map_err(unavailable)?),
        Direction::Output => Box::new(host.output_devices().map_err(unavailable)?),
    };

    devices
        .find(|d| d.name().map(|n| n == wanted).unwrap_or(false))
        .ok_or_else(|| DeviceError::Unavailable(format!("{direction:?} device {wanted:?} not found")))
}

impl DeviceProvider for CpalProvider {
    fn open_input(&self, format: &AudioFormat) -> Result<Box<dyn InputLine>, DeviceError> {
        let (data_tx, data_rx) = mpsc::channel::<Vec<u8>>();
        let name = self.input_device.clone();
        let config = format.stream_config();

        let driver = Driver::spawn("pcm-capture", move || {
            let device = find_device(name.as_deref(), Direction::Input)?;
            log::info!(
                "opening input device {:?}",
                device.name().unwrap_or_else(|_| "<unknown>".into())
            );
            device
                .build_input_stream(
                    &config,
                    move |data: &[i16], _: &cpal::InputCallbackInfo| {
                        // Receiver gone means the line is closing.
                        let _ = data_tx.send(encode(data));
                    },
                    |err: cpal::StreamError| {
                        log::error!("cpal input stream error: {err}");
                    },
                    None,
                )
                .map_err(|e| DeviceError::Unavailable(e.to_string()))
        })?;

        Ok(Box::new(CpalInput {
            data: data_rx,
            pending: VecDeque::new(),
            driver,
        }))
    }

    fn open_output(&self, format: &AudioFormat) -> Result<Box<dyn OutputLine>, DeviceError> {
        let (data_tx, data_rx) = mpsc::sync_channel::<Vec<i16>>(OUTPUT_QUEUE_CHUNKS);
        let queued = Arc::new(AtomicUsize::new(0));
        let name = self.output_device.clone();
        let config = format.stream_config();
        let callback_queued = Arc::clone(&queued);

        let driver = Driver::spawn("pcm-playback", move || {
            let device = find_device(name.as_deref(), Direction::Output)?;
            log::info!(
                "opening output device {:?}",
                device.name().unwrap_or_else(|_| "<unknown>".into())
            );
            let mut current: VecDeque<i16> = VecDeque::new();
            device
                .build_output_stream(
                    &config,
                    move |out: &mut [i16], _: &cpal::OutputCallbackInfo| {
                        let mut played = 0;
                        for slot in out.iter_mut() {
                            if current.is_empty() {
                                if let Ok(next) = data_rx.try_recv() {
                                    current.extend(next);
                                }
                            }
                            *slot = match current.pop_front() {
                                Some(s) => {
                                    played += 1;
                                    s
                                }
                                None => 0,
                            };
                        }
                        if played > 0 {
                            callback_queued.fetch_sub(played, Ordering::SeqCst);
                        }
                    },
                    |err: cpal::StreamError| {
                        log::error!("cpal output stream error: {err}");
                    },
                    None,
                )
                .map_err(|e| DeviceError::Unavailable(e.to_string()))
        })?;

        Ok(Box::new(CpalOutput {
            data: Some(data_tx),
            queued,
            sample_rate: format.sample_rate,
            driver,
        }))
    }
}

// ---------------------------------------------------------------------------
// Driver thread
// ---------------------------------------------------------------------------

enum DriverCommand {
    Play(mpsc::Sender<Result<(), DeviceError>>),
    Close,
}

/// Owns the thread that owns the `cpal::Stream`.
struct Driver {
    commands: mpsc::Sender<DriverCommand>,
    thread: Option<JoinHandle<()>>,
}

impl Driver {
    /// Run `build` on a new thread and wait until it reports success or
    /// failure.
    fn spawn<F>(name: &str, build: F) -> Result<Self, DeviceError>
    where
        F: FnOnce() -> Result<cpal::Stream, DeviceError> + Send + 'static,
    {
        let (ready_tx, ready_rx) = mpsc::sync_channel::<Result<(), DeviceError>>(1);
        let (cmd_tx, cmd_rx) = mpsc::channel::<DriverCommand>();

        let thread = std::thread::Builder::new()
            .name(name.into())
            .spawn(move || {
                let stream = match build() {
                    Ok(stream) => {
                        let _ = ready_tx.send(Ok(()));
                        stream
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };

                while let Ok(cmd) = cmd_rx.recv() {
                    match cmd {
                        DriverCommand::Play(reply) => {
                            let result = stream.play().map_err(|e| DeviceError::Io(e.to_string()));
                            let _ = reply.send(result);
                        }
                        DriverCommand::Close => break,
                    }
                }

                drop(stream);
            })
            .map_err(|e| DeviceError::Unavailable(format!("failed to spawn driver thread: {e}")))?;

        match ready_rx.recv() {
            Ok(Ok(())) => Ok(Self {
                commands: cmd_tx,
                thread: Some(thread),
            }),
            Ok(Err(e)) => {
                let _ = thread.join();
                Err(e)
            }
            Err(_) => {
                let _ = thread.join();
                Err(DeviceError::Unavailable(
                    "driver thread exited during setup".into(),
                ))
            }
        }
    }

    fn play(&self) -> Result<(), DeviceError> {
        let gone = || DeviceError::Io("audio driver thread is gone".into());
        let (reply_tx, reply_rx) = mpsc::channel();
        self.commands
            .send(DriverCommand::Play(reply_tx))
            .map_err(|_| gone())?;
        reply_rx.recv().map_err(|_| gone())?
    }

    fn shutdown(&mut self) -> Result<(), DeviceError> {
        let _ = self.commands.send(DriverCommand::Close);
        if let Some(thread) = self.thread.take() {
            thread
                .join()
                .map_err(|_| DeviceError::Flush("audio driver thread panicked".into()))?;
        }
        Ok(())
    }
}

impl Drop for Driver {
    fn drop(&mut self) {
        let _ = self.shutdown();
    }
}

// ---------------------------------------------------------------------------
// Lines
// ---------------------------------------------------------------------------

struct CpalInput {
    data: mpsc::Receiver<Vec<u8>>,
    /// Bytes received from the callback but not yet handed to a reader.
    pending: VecDeque<u8>,
    driver: Driver,
}

impl InputLine for CpalInput {
    fn start(&mut self) -> Result<(), DeviceError> {
        self.driver.play()
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, DeviceError> {
        if self.pending.is_empty() {
            match self.data.recv_timeout(READ_POLL) {
                Ok(bytes) => self.pending.extend(bytes),
                Err(mpsc::RecvTimeoutError::Timeout) => return Ok(0),
                Err(mpsc::RecvTimeoutError::Disconnected) => {
                    return Err(DeviceError::Io("input stream closed".into()))
                }
            }
        }
        // Top up from anything else already delivered.
        while self.pending.len() < buf.len() {
            match self.data.try_recv() {
                Ok(bytes) => self.pending.extend(bytes),
                Err(_) => break,
            }
        }

        // Whole samples only.
        let n = self.pending.len().min(buf.len()) & !1;
        for (dst, src) in buf[..n].iter_mut().zip(self.pending.drain(..n)) {
            *dst = src;
        }
        Ok(n)
    }

    fn close(&mut self) -> Result<(), DeviceError> {
        self.driver.shutdown()
    }
}

struct CpalOutput {
    data: Option<mpsc::SyncSender<Vec<i16>>>,
    /// Samples written but not yet consumed by the callback.
    queued: Arc<AtomicUsize>,
    sample_rate: u32,
    driver: Driver,
}

impl OutputLine for CpalOutput {
    fn start(&mut self) -> Result<(), DeviceError> {
        self.driver.play()
    }

    fn write(&mut self, buf: &[u8]) -> Result<usize, DeviceError> {
        let samples = decode(buf).map_err(|e| DeviceError::Io(e.to_string()))?;
        let Some(tx) = self.data.as_ref() else {
            return Err(DeviceError::Io("output line already closed".into()));
        };

        self.queued.fetch_add(samples.len(), Ordering::SeqCst);
        tx.send(samples)
            .map_err(|_| DeviceError::Io("output stream closed".into()))?;
        Ok(buf.len())
    }

    fn drain(&mut self) -> Result<(), DeviceError> {
        let queued = self.queued.load(Ordering::SeqCst);
        let expected = Duration::from_secs_f64(queued as f64 / f64::from(self.sample_rate.max(1)));
        let deadline = Instant::now() + expected + DRAIN_GRACE;

        while self.queued.load(Ordering::SeqCst) > 0 {
            if Instant::now() > deadline {
                return Err(DeviceError::Io(format!(
                    "drain timed out with {} samples still queued",
                    self.queued.load(Ordering::SeqCst)
                )));
            }
            std::thread::sleep(Duration::from_millis(10));
        }
        Ok(())
    }

    fn close(&mut self) -> Result<(), DeviceError> {
        self.data = None;
        self.driver.shutdown()
    }
}
