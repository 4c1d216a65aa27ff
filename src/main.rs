//! Command-line front end.
//!
//! # Sequence
//!
//! 1. Initialise logging.
//! 2. Load [`AppConfig`] (default on first run), apply the CLI overrides and
//!    write it back when `--save-config` is given.
//! 3. Pick a device provider: cpal, or a synthetic tone with `--tone`.
//! 4. Record for `--seconds`.
//! 5. Play the recording back (unless `--no-playback`).
//! 6. Compute the spectrum, print the strongest bins and optionally export
//!    both series as JSON.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;

use pcm_scope::audio::{
    AudioFormat, CpalProvider, DeviceProvider, PreviewPoint, SyntheticProvider, CHUNK_BYTES,
};
use pcm_scope::config::AppConfig;
use pcm_scope::session::SessionController;
use pcm_scope::spectrum::{strongest_bins, SpectrumBin};

#[derive(Parser, Debug)]
#[command(name = "pcm-scope")]
#[command(about = "Record mono PCM, play it back and show its spectrum")]
#[command(version)]
struct Args {
    /// How long to record, in seconds.
    #[arg(long, default_value_t = 3.0)]
    seconds: f32,

    /// Record a generated sine at this frequency instead of a real device.
    #[arg(long, value_name = "HZ")]
    tone: Option<f64>,

    /// Skip playback after recording.
    #[arg(long)]
    no_playback: bool,

    /// Write the preview and spectrum series to this JSON file.
    #[arg(long, value_name = "PATH")]
    export: Option<PathBuf>,

    /// Settings file to use instead of the platform default.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Input device name (overrides the settings file).
    #[arg(long)]
    input_device: Option<String>,

    /// Output device name (overrides the settings file).
    #[arg(long)]
    output_device: Option<String>,

    /// Plot every sample in the preview, not only positive ones.
    #[arg(long)]
    all_samples: bool,

    /// Write the effective settings (after the overrides above) back to the
    /// settings file.
    #[arg(long)]
    save_config: bool,
}

#[derive(Serialize)]
struct Export<'a> {
    sample_rate: u32,
    recorded_bytes: usize,
    preview: &'a [PreviewPoint],
    spectrum: &'a [SpectrumBin],
}

fn load_config(args: &Args) -> AppConfig {
    let loaded = match &args.config {
        Some(path) => AppConfig::load_from(path),
        None => AppConfig::load(),
    };
    let mut config = loaded.unwrap_or_else(|e| {
        log::warn!("Failed to load config ({e}); using defaults");
        AppConfig::default()
    });

    if args.input_device.is_some() {
        config.audio.input_device = args.input_device.clone();
    }
    if args.output_device.is_some() {
        config.audio.output_device = args.output_device.clone();
    }
    if args.all_samples {
        config.preview.positive_only = false;
    }
    config
}

fn save_config(args: &Args, config: &AppConfig) -> Result<()> {
    match &args.config {
        Some(path) => config.save_to(path),
        None => config.save(),
    }
    .context("failed to save settings")?;
    log::info!("settings saved");
    Ok(())
}

async fn run(args: Args, config: AppConfig) -> Result<()> {
    let provider: Arc<dyn DeviceProvider> = match args.tone {
        Some(hz) => {
            log::info!("using synthetic {hz} Hz tone");
            let tone = SyntheticProvider::tone(hz).realtime(&AudioFormat::PCM_32K_MONO, CHUNK_BYTES);
            Arc::new(tone)
        }
        None => Arc::new(CpalProvider::new(
            config.audio.input_device.clone(),
            config.audio.output_device.clone(),
        )),
    };

    let mut ctl =
        SessionController::from_config(provider, tokio::runtime::Handle::current(), &config);
    let format = ctl.format();

    // Record
    ctl.start_capture().context("could not start recording")?;
    tokio::time::sleep(Duration::from_secs_f32(args.seconds.max(0.0))).await;
    let capture = ctl.stop_capture().await.context("recording failed")?;
    println!(
        "recorded {} bytes ({:.2}s) in {} chunks",
        capture.bytes,
        format.duration_secs(capture.bytes),
        capture.chunks
    );

    // Play back
    if !args.no_playback && capture.bytes > 0 {
        ctl.start_playback().context("could not start playback")?;
        let playback = ctl.wait_playback().await.context("playback failed")?;
        println!("played {} bytes in {} writes", playback.bytes, playback.writes);
    }

    // Analyse
    let spectrum = ctl.compute_spectrum()?;
    let preview = ctl.preview_series();
    if spectrum.is_empty() {
        println!("nothing to analyse");
    } else {
        println!("strongest bins:");
        for (index, bin) in strongest_bins(&spectrum, config.spectrum.top_bins) {
            println!(
                "  #{index:<7} {:>10.2} Hz  {:>14.1}",
                bin.frequency, bin.magnitude
            );
        }
    }

    if let Some(path) = &args.export {
        let export = Export {
            sample_rate: format.sample_rate,
            recorded_bytes: ctl.recorded_bytes(),
            preview: &preview,
            spectrum: &spectrum,
        };
        let json = serde_json::to_string(&export)?;
        std::fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
        log::info!(
            "exported {} preview points and {} bins to {}",
            preview.len(),
            spectrum.len(),
            path.display()
        );
    }

    Ok(())
}

fn main() -> Result<()> {
    // 1. Logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    log::info!("pcm-scope starting up");

    // 2. Configuration
    let config = load_config(&args);
    if args.save_config {
        save_config(&args, &config)?;
    }

    // 3. Tokio runtime (blocking pool hosts the capture/playback workers)
    let rt = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .context("failed to create tokio runtime")?;

    rt.block_on(run(args, config))
}
