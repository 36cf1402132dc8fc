//! Amplitude panners.
//!
//! Every panner operates purely in "speaker-consecutive-index" space: gains
//! are indexed by [`Speaker::index`](crate::layout::Speaker), never by
//! device channel. The render driver owns the index → device-channel
//! placement, so panners never need to know
//! about output-buffer gaps.

mod dbap;
mod lbap;
mod vbap;

pub use dbap::Dbap;
pub use lbap::Lbap;
pub use vbap::Vbap;

use rf_core::Vec3;

use crate::layout::Layout;

/// Per-speaker gain vector for one direction, computed fresh each call.
/// Panners are allowed to allocate at `prepare()` time but never inside
/// `gains_for`, since that runs on the audio thread in the real-time driver.
pub trait Panner: Send {
    /// (Re)build any layout-derived state. Called once after construction
    /// and whenever the layout changes; never on the per-block hot path.
    fn prepare(&mut self, layout: &Layout);

    /// Compute per-speaker gains for unit `direction`, writing into `out`
    /// (length `layout.num_speakers()`, zeroed by the caller beforehand).
    /// Implementations must not allocate.
    fn gains_for(&self, direction: Vec3, out: &mut [f32]);
}

/// Accumulate one mono block into a speaker-indexed output buffer using a
/// precomputed gain vector. Shared by all three panners' block path.
pub(crate) fn accumulate_block(
    input: &[f32],
    gains: &[f32],
    output: &mut [f32],
    num_speakers: usize,
) {
    let n = input.len();
    debug_assert_eq!(gains.len(), num_speakers);
    debug_assert_eq!(output.len(), num_speakers * n);
    for (s, &g) in gains.iter().enumerate() {
        if g == 0.0 {
            continue;
        }
        let base = s * n;
        for i in 0..n {
            output[base + i] += input[i] * g;
        }
    }
}

/// Construct a panner per `config.panner`, already `prepare()`d against
/// `layout` and carrying `config.dbap_focus`/`config.lbap_dispersion`.
pub fn build(config: &crate::config::RenderConfig, layout: &Layout) -> Box<dyn Panner> {
    use crate::config::PannerKind;
    let mut panner: Box<dyn Panner> = match config.panner {
        PannerKind::Dbap => Box::new(Dbap::new(config.dbap_focus)),
        PannerKind::Vbap => Box::new(Vbap::new()),
        PannerKind::Lbap => Box::new(Lbap::new(config.lbap_dispersion)),
    };
    panner.prepare(layout);
    panner
}
