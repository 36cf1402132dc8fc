//! Render statistics.
//!
//! Accumulates per-channel peak/RMS alongside direction-sanitisation and
//! panner-robustness counters across a render.

use rf_core::{linear_to_dbfs, peak, rms};
use serde::Serialize;

use crate::robustness::RobustnessTally;

/// Per-channel summary, serialised verbatim into `render_stats.json`.
#[derive(Debug, Clone, Serialize)]
pub struct ChannelStats {
    pub channel: usize,
    pub rms_dbfs: f32,
    pub peak_linear: f32,
    pub near_silent: bool,
    pub clipping: bool,
    pub has_nonfinite: bool,
}

/// `< -85 dBFS` is treated as effectively silent for reporting purposes.
const NEAR_SILENT_THRESHOLD_DBFS: f32 = -85.0;

#[derive(Debug, Clone, Default, Serialize)]
pub struct SanitisationCounters {
    pub clamped: u64,
    pub rescaled: u64,
    pub invalid: u64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RobustnessCounters {
    pub zero_blocks: u64,
    pub retargets: u64,
    pub sub_stepped_blocks: u64,
}

impl From<RobustnessTally> for RobustnessCounters {
    fn from(t: RobustnessTally) -> Self {
        Self {
            zero_blocks: t.zero_blocks,
            retargets: t.retargets,
            sub_stepped_blocks: t.sub_stepped_blocks,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RenderStats {
    pub channels: Vec<ChannelStats>,
    pub sanitisation: SanitisationCounters,
    pub robustness: RobustnessCounters,
}

/// Accumulates channel-level peak/RMS across a render; finalised once at
/// the end into [`RenderStats`].
#[derive(Debug, Default)]
pub struct StatsAccumulator {
    sum_squares: Vec<f64>,
    sample_counts: Vec<u64>,
    peaks: Vec<f32>,
    has_nonfinite: Vec<bool>,
    pub sanitisation: SanitisationCounters,
    pub robustness: RobustnessTally,
}

impl StatsAccumulator {
    pub fn new(num_channels: usize) -> Self {
        Self {
            sum_squares: vec![0.0; num_channels],
            sample_counts: vec![0; num_channels],
            peaks: vec![0.0; num_channels],
            has_nonfinite: vec![false; num_channels],
            sanitisation: SanitisationCounters::default(),
            robustness: RobustnessTally::default(),
        }
    }

    /// Fold one channel's block of already-written output samples into the
    /// running per-channel accumulators.
    pub fn observe_channel_block(&mut self, channel: usize, samples: &[f32]) {
        if channel >= self.sum_squares.len() {
            return;
        }
        for &s in samples {
            if !s.is_finite() {
                self.has_nonfinite[channel] = true;
                continue;
            }
            self.sum_squares[channel] += (s as f64) * (s as f64);
            self.sample_counts[channel] += 1;
            if s.abs() > self.peaks[channel] {
                self.peaks[channel] = s.abs();
            }
        }
    }

    pub fn finish(self) -> RenderStats {
        let channels = (0..self.sum_squares.len())
            .map(|c| {
                let count = self.sample_counts[c].max(1) as f64;
                let rms_linear = (self.sum_squares[c] / count).sqrt();
                let rms_dbfs = linear_to_dbfs(rms_linear) as f32;
                let peak_linear = self.peaks[c];
                ChannelStats {
                    channel: c,
                    rms_dbfs,
                    peak_linear,
                    near_silent: rms_dbfs < NEAR_SILENT_THRESHOLD_DBFS,
                    clipping: peak_linear > 1.0,
                    has_nonfinite: self.has_nonfinite[c],
                }
            })
            .collect();

        RenderStats {
            channels,
            sanitisation: self.sanitisation,
            robustness: self.robustness.into(),
        }
    }
}

/// Compute RMS (dBFS) and peak directly from a full channel buffer, used by
/// callers that already hold the complete render in memory (offline driver
/// diagnostics) rather than folding block-by-block.
pub fn summarize_channel(channel: usize, samples: &[f32]) -> ChannelStats {
    let rms_linear = rms(samples);
    let rms_dbfs = linear_to_dbfs(rms_linear) as f32;
    let peak_linear = peak(samples);
    let has_nonfinite = samples.iter().any(|s| !s.is_finite());
    ChannelStats {
        channel,
        rms_dbfs,
        peak_linear,
        near_silent: rms_dbfs < NEAR_SILENT_THRESHOLD_DBFS,
        clipping: peak_linear > 1.0,
        has_nonfinite,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finish_reports_clipping_above_unity_peak() {
        let mut acc = StatsAccumulator::new(1);
        acc.observe_channel_block(0, &[1.5, -0.2, 0.3]);
        let stats = acc.finish();
        assert!(stats.channels[0].clipping);
    }

    #[test]
    fn finish_flags_nonfinite_samples() {
        let mut acc = StatsAccumulator::new(1);
        acc.observe_channel_block(0, &[f32::NAN, 0.1]);
        let stats = acc.finish();
        assert!(stats.channels[0].has_nonfinite);
    }

    #[test]
    fn silence_is_near_silent() {
        let mut acc = StatsAccumulator::new(1);
        acc.observe_channel_block(0, &[0.0; 100]);
        let stats = acc.finish();
        assert!(stats.channels[0].near_silent);
    }
}
