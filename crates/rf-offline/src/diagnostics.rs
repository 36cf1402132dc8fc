//! Debug diagnostics output.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use rf_spatial::RenderStats;

use crate::error::OfflineResult;

/// One sampled block's summary line for `block_stats.log`.
#[derive(Debug, Clone, Copy)]
pub struct BlockStatsRow {
    pub block: usize,
    pub time_sec: f64,
    pub peak: f32,
    pub nonfinite_count: usize,
    pub active_speakers: usize,
}

/// Writes `render_stats.json` and `block_stats.log` into `debug_dir`,
/// creating the directory if needed.
pub struct DiagnosticsWriter {
    block_log: BufWriter<File>,
}

impl DiagnosticsWriter {
    pub fn create(debug_dir: &Path) -> OfflineResult<Self> {
        std::fs::create_dir_all(debug_dir)?;
        let block_log = BufWriter::new(File::create(debug_dir.join("block_stats.log"))?);
        Ok(Self { block_log })
    }

    pub fn write_block(&mut self, row: BlockStatsRow) -> OfflineResult<()> {
        writeln!(
            self.block_log,
            "{},{:.6},{:.6},{},{}",
            row.block, row.time_sec, row.peak, row.nonfinite_count, row.active_speakers
        )?;
        Ok(())
    }

    pub fn finish(mut self, debug_dir: &Path, stats: &RenderStats) -> OfflineResult<()> {
        self.block_log.flush()?;
        let json = serde_json::to_string_pretty(stats)
            .map_err(|e| crate::error::OfflineError::InvalidConfig(e.to_string()))?;
        std::fs::write(debug_dir.join("render_stats.json"), json)?;
        Ok(())
    }
}
