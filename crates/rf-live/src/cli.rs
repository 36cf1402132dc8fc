//! Command-line surface for the real-time engine.

use std::path::PathBuf;

use clap::Parser;

/// Streams one ADM scene through the real-time spatial render engine to an
/// audio device, until interrupted.
#[derive(Parser, Debug)]
#[command(name = "rf-live", version, about)]
pub struct Args {
    /// Speaker-layout document.
    #[arg(long)]
    pub layout: PathBuf,

    /// Scene document.
    #[arg(long)]
    pub scene: PathBuf,

    /// Folder of per-source mono WAV files. Mutually exclusive with `--adm`.
    #[arg(long, conflicts_with = "adm")]
    pub sources: Option<PathBuf>,

    /// Single interleaved multichannel file in ADM channel order. Mutually exclusive with `--sources`.
    #[arg(long)]
    pub adm: Option<PathBuf>,

    #[arg(long, default_value_t = 48_000)]
    pub samplerate: u32,

    #[arg(long, default_value_t = 512)]
    pub buffersize: usize,

    /// Initial master gain (linear). Defaults to the engine's own default.
    #[arg(long)]
    pub gain: Option<f64>,

    /// Output channel remap CSV.
    #[arg(long)]
    pub remap: Option<PathBuf>,
}
