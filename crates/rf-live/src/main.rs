//! Real-time engine entry point.
//!
//! Negotiate a device config, build one output stream around one callback,
//! block the main thread until interrupted. The callback is
//! [`RealtimeEngine::process_block`]; shutdown drains through the pause
//! fade before the stream is dropped, instead of just exiting.

mod cli;
mod input;

use std::fs;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;

use rf_realtime::control::PAUSE_FADE_SEC;
use rf_realtime::device::{build_output_stream, default_output_device, negotiate_output_config};
use rf_realtime::{AtomicControls, EngineStats, RealtimeEngine};
use rf_spatial::config::ElevationMode;
use rf_spatial::layout::Layout;
use rf_spatial::remap;
use rf_spatial::scene::Scene;

fn main() -> Result<()> {
    env_logger::init();
    let args = cli::Args::parse();

    if args.sources.is_none() && args.adm.is_none() {
        bail!("exactly one of --sources or --adm is required");
    }

    let layout_doc = fs::read_to_string(&args.layout)
        .with_context(|| format!("reading layout document {:?}", args.layout))?;
    let layout = Layout::load(&layout_doc).context("parsing layout document")?;

    let scene_doc = fs::read_to_string(&args.scene)
        .with_context(|| format!("reading scene document {:?}", args.scene))?;
    let scene = Scene::load(&scene_doc).context("parsing scene document")?;

    let source_ids: Vec<String> = scene.sources.keys().cloned().collect();
    let sources = if let Some(dir) = &args.sources {
        input::load_mono_folder(dir, &source_ids, scene.sample_rate_hz)?
    } else {
        input::load_adm_file(args.adm.as_ref().unwrap(), &source_ids, scene.sample_rate_hz)?
    };
    let sources = Arc::new(sources);

    let device = default_output_device().context("opening default output device")?;
    let stream_config =
        negotiate_output_config(&device, layout.output_channel_count as u16, args.samplerate)
            .context("negotiating output stream config")?;
    let device_channels = stream_config.channels as usize;

    let remap_table = match &args.remap {
        Some(path) => {
            let csv = fs::read_to_string(path).with_context(|| format!("reading remap CSV {path:?}"))?;
            remap::parse(&csv, layout.output_channel_count, device_channels)
        }
        None => remap::identity(layout.output_channel_count),
    };

    let controls = Arc::new(AtomicControls::new());
    if let Some(gain) = args.gain {
        controls.set_master_gain(gain);
    }
    let stats = Arc::new(EngineStats::new());

    let mut engine = RealtimeEngine::new(
        layout.clone(),
        &scene,
        sources,
        controls.clone(),
        stats.clone(),
        remap_table,
        ElevationMode::default(),
        args.samplerate,
        args.buffersize,
        device_channels,
        rf_spatial::config::LFE_COMPENSATION,
    );

    let _stream = build_output_stream(
        &device,
        &stream_config,
        args.buffersize as u32,
        Box::new(move |data: &mut [f32]| engine.process_block(data)),
    )
    .context("starting output stream")?;

    log::info!(
        "streaming {} sources at {} Hz, {} device channels, {} frame buffer",
        source_ids.len(),
        args.samplerate,
        device_channels,
        args.buffersize,
    );

    let running = Arc::new(AtomicBool::new(true));
    let handler_flag = running.clone();
    ctrlc::set_handler(move || handler_flag.store(false, Ordering::SeqCst))
        .context("installing SIGINT/SIGTERM handler")?;

    while running.load(Ordering::SeqCst) {
        std::thread::sleep(Duration::from_millis(50));
    }

    log::info!("shutdown requested: draining pause fade");
    controls.set_paused(true);
    std::thread::sleep(Duration::from_secs_f64(PAUSE_FADE_SEC * 4.0));

    Ok(())
}
