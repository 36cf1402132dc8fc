//! Command-line surface for the offline renderer.
//!
//! Kept separate from `main.rs` so the flag definitions stay reviewable on
//! their own.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use rf_spatial::config::{ElevationMode, PannerKind, RenderResolution};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SpatializerArg {
    Dbap,
    Vbap,
    Lbap,
}

impl From<SpatializerArg> for PannerKind {
    fn from(value: SpatializerArg) -> Self {
        match value {
            SpatializerArg::Dbap => PannerKind::Dbap,
            SpatializerArg::Vbap => PannerKind::Vbap,
            SpatializerArg::Lbap => PannerKind::Lbap,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ElevationModeArg {
    Clamp,
    AtmosUp,
    FullSphere,
}

impl From<ElevationModeArg> for ElevationMode {
    fn from(value: ElevationModeArg) -> Self {
        match value {
            ElevationModeArg::Clamp => ElevationMode::Clamp,
            ElevationModeArg::AtmosUp => ElevationMode::RescaleAtmosUp,
            ElevationModeArg::FullSphere => ElevationMode::RescaleFullSphere,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RenderResolutionArg {
    Block,
    Sample,
}

impl From<RenderResolutionArg> for RenderResolution {
    fn from(value: RenderResolutionArg) -> Self {
        match value {
            RenderResolutionArg::Block => RenderResolution::Block,
            RenderResolutionArg::Sample => RenderResolution::Sample,
        }
    }
}

/// Renders one ADM scene through one speaker layout to a multichannel file.
#[derive(Parser, Debug)]
#[command(name = "rf-render", version, about)]
pub struct Args {
    /// Speaker-layout document.
    #[arg(long)]
    pub layout: PathBuf,

    /// Scene document (the object/direct-speaker/LFE trajectories).
    #[arg(long)]
    pub positions: PathBuf,

    /// Folder of per-source mono WAV files, named `<id>.wav`.
    #[arg(long)]
    pub sources: PathBuf,

    /// Output multichannel file (WAV, auto-escalated to RF64 past 4 GiB).
    #[arg(long)]
    pub out: PathBuf,

    #[arg(long, value_enum, default_value_t = SpatializerArg::Dbap)]
    pub spatializer: SpatializerArg,

    #[arg(long)]
    pub dbap_focus: Option<f64>,

    #[arg(long)]
    pub lbap_dispersion: Option<f64>,

    #[arg(long, default_value_t = 0.5)]
    pub master_gain: f32,

    /// Render only this source id, silencing every other source.
    #[arg(long)]
    pub solo_source: Option<String>,

    /// Window start, in seconds. Defaults to the start of the scene.
    #[arg(long)]
    pub t0: Option<f64>,

    /// Window end, in seconds. Defaults to the scene's declared duration.
    #[arg(long)]
    pub t1: Option<f64>,

    #[arg(long, value_enum, default_value_t = RenderResolutionArg::Block)]
    pub render_resolution: RenderResolutionArg,

    #[arg(long, default_value_t = 64)]
    pub block_size: usize,

    #[arg(long, value_enum, default_value_t = ElevationModeArg::AtmosUp)]
    pub elevation_mode: ElevationModeArg,

    /// Equivalent to `--elevation_mode clamp`; takes priority when both are given.
    #[arg(long)]
    pub no_vertical_compensation: bool,

    /// Zero every sanitised elevation, rendering onto the layout's horizontal plane only.
    #[arg(long)]
    pub force_2d: bool,

    /// Write `render_stats.json` and `block_stats.log` here.
    #[arg(long)]
    pub debug_dir: Option<PathBuf>,
}
