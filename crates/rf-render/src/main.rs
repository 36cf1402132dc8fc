//! Offline renderer entry point.
//!
//! Parse args, do setup, hand off to one library entry point. Errors
//! propagate through `anyhow` so a fatal error prints to stderr and exits
//! non-zero without a panic.

mod cli;

use std::fs;

use anyhow::{Context, Result};
use clap::Parser;

use rf_offline::driver::render;
use rf_offline::writer::write_multichannel;
use rf_spatial::config::RenderConfig;
use rf_spatial::layout::Layout;
use rf_spatial::scene::Scene;

fn main() -> Result<()> {
    env_logger::init();
    let args = cli::Args::parse();

    let layout_doc = fs::read_to_string(&args.layout)
        .with_context(|| format!("reading layout document {:?}", args.layout))?;
    let layout = Layout::load(&layout_doc).context("parsing layout document")?;

    let scene_doc = fs::read_to_string(&args.positions)
        .with_context(|| format!("reading scene document {:?}", args.positions))?;
    let scene = Scene::load(&scene_doc).context("parsing scene document")?;

    let elevation_mode = if args.no_vertical_compensation {
        rf_spatial::config::ElevationMode::Clamp
    } else {
        args.elevation_mode.into()
    };

    let time_window = match (args.t0, args.t1) {
        (None, None) => None,
        (t0, t1) => Some((t0.unwrap_or(0.0), t1.unwrap_or(scene.duration_sec))),
    };

    let mut config = RenderConfig {
        panner: args.spatializer.into(),
        master_gain: args.master_gain,
        elevation_mode,
        render_resolution: args.render_resolution.into(),
        block_size: args.block_size,
        solo_source: args.solo_source,
        time_window,
        debug_dir: args.debug_dir,
        force_2d: args.force_2d,
        ..RenderConfig::default()
    };
    if let Some(focus) = args.dbap_focus {
        config.dbap_focus = focus;
    }
    if let Some(dispersion) = args.lbap_dispersion {
        config.lbap_dispersion = dispersion;
    }
    let config = config.normalized();

    if let Some(dir) = &config.debug_dir {
        fs::create_dir_all(dir).with_context(|| format!("creating debug dir {dir:?}"))?;
    }

    log::info!(
        "rendering {} sources through {} speakers ({} output channels) with {:?}",
        scene.sources.len(),
        layout.num_speakers(),
        layout.output_channel_count,
        config.panner,
    );

    let (buffer, stats) =
        render(&scene, &layout, &config, &args.sources).context("rendering scene")?;

    let format = write_multichannel(&args.out, &buffer.channels, buffer.sample_rate)
        .with_context(|| format!("writing output file {:?}", args.out))?;

    log::info!(
        "wrote {:?} ({:?}, {} channels, {} substepped blocks, {} zero-block retargets)",
        args.out,
        format,
        buffer.channels.len(),
        stats.robustness.sub_stepped_blocks,
        stats.robustness.retargets,
    );

    Ok(())
}
