//! Panner robustness layer: zero-block retargeting and fast-mover
//! sub-stepping.
//!
//! A reusable post-panner pass shared by every panner kind: detect an
//! all-zero output block and retarget to the nearest speaker, and detect a
//! fast-moving source and sub-step its render to avoid an audible jump.

use rf_core::Vec3;

use crate::layout::Layout;
use crate::panners::{accumulate_block, Panner};

/// Per-sample energy below which an input block is considered silent —
/// below this, producing no output is expected, not a coverage gap.
const INPUT_ENERGY_THRESHOLD: f32 = 1e-4;

/// Accumulated output magnitude below which a panner is deemed to have
/// failed to place an audible input anywhere.
const ZERO_OUTPUT_THRESHOLD: f32 = 1e-6;

/// Angular change (radians) between a block's 25%/75% direction samples
/// above which the block is re-rendered in finer sub-steps.
const FAST_MOVER_THRESHOLD_RAD: f64 = 0.25;

/// Sub-step length used when a block is flagged as fast-moving.
const SUB_STEP_LEN: usize = 16;

/// Fraction of the way to retarget a direction toward the nearest speaker
/// when a panner produces a zero block despite audible input.
const RETARGET_BLEND: f64 = 0.9;

/// Tallies emitted by the robustness layer; the caller folds these into
/// [`crate::stats::RenderStats`].
#[derive(Debug, Default, Clone, Copy)]
pub struct RobustnessTally {
    pub zero_blocks: u64,
    pub retargets: u64,
    pub sub_stepped_blocks: u64,
}

/// Pre-allocated scratch space reused across calls so the real-time driver
/// never allocates on the hot path.
pub struct Robustness {
    scratch_gains: Vec<f32>,
}

impl Robustness {
    pub fn new(num_speakers: usize) -> Self {
        Self {
            scratch_gains: vec![0.0; num_speakers],
        }
    }

    /// Re-allocate scratch space if the speaker count changes (layout
    /// reload only; never called from the audio thread mid-stream).
    pub fn resize(&mut self, num_speakers: usize) {
        self.scratch_gains.clear();
        self.scratch_gains.resize(num_speakers, 0.0);
    }

    /// Run `panner` for `direction` against `input`, accumulating into the
    /// speaker-indexed `output` buffer, and retarget once if the panner
    /// produced silence despite audible input.
    pub fn pan_with_recovery(
        &mut self,
        panner: &dyn Panner,
        layout: &Layout,
        direction: Vec3,
        input: &[f32],
        output: &mut [f32],
        tally: &mut RobustnessTally,
    ) {
        let num_speakers = layout.num_speakers();
        let n = input.len();
        debug_assert_eq!(output.len(), num_speakers * n);

        let input_energy: f32 = input.iter().map(|s| s.abs()).sum();

        panner.gains_for(direction, &mut self.scratch_gains);
        accumulate_block(input, &self.scratch_gains, output, num_speakers);

        if input_energy <= INPUT_ENERGY_THRESHOLD {
            return;
        }

        let output_energy: f32 = output.iter().map(|s| s.abs()).sum();
        if output_energy > ZERO_OUTPUT_THRESHOLD {
            return;
        }

        tally.zero_blocks += 1;

        if let Some(retargeted) = retarget(direction, layout) {
            tally.retargets += 1;
            panner.gains_for(retargeted, &mut self.scratch_gains);
            accumulate_block(input, &self.scratch_gains, output, num_speakers);
        }
    }

    /// True when the 25%/75% direction samples diverge enough that the
    /// caller should re-render this block in [`SUB_STEP_LEN`]-sample
    /// sub-steps instead of one pose for the whole block.
    pub fn needs_substepping(dir_25: Vec3, dir_75: Vec3) -> bool {
        let dot = dir_25.dot(dir_75).clamp(-1.0, 1.0);
        dot.acos() > FAST_MOVER_THRESHOLD_RAD
    }

    pub fn substep_len() -> usize {
        SUB_STEP_LEN
    }
}

/// Retarget `direction` 90% of the way toward the layout speaker whose unit
/// vector best matches it.
fn retarget(direction: Vec3, layout: &Layout) -> Option<Vec3> {
    let best = layout
        .speakers
        .iter()
        .map(|s| (s, s.unit_direction().dot(direction)))
        .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap())?;

    let target = best.0.unit_direction();
    direction.lerp(target, RETARGET_BLEND).normalized()
}
