//! Offline multichannel spatial render driver.
//!
//! A single-threaded staged pipeline: load sources, render block by block,
//! write the finished multichannel buffer to disk. See DESIGN.md for the
//! dependency drops this single-threaded shape allows.

pub mod audio_source;
pub mod diagnostics;
pub mod driver;
pub mod error;
pub mod remap;
pub mod writer;

pub use audio_source::{load_mono_sources, SourceAudio};
pub use diagnostics::{BlockStatsRow, DiagnosticsWriter};
pub use driver::{render, MultichannelBuffer};
pub use error::{OfflineError, OfflineResult};
pub use remap::{ChannelRemap, RemapEntry};
pub use writer::{read_multichannel, write_multichannel, ContainerFormat};
