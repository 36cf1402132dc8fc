//! Distance-based amplitude panning.
//!
//! Inverse-square distance law with a focus parameter controlling how
//! sharply gain falls off away from the nearest speakers, energy-normalised
//! across the active set.

use rf_core::Vec3;

use crate::layout::Layout;
use crate::panners::{accumulate_block, Panner};

/// Minimum effective distance, avoiding a division blow-up for a speaker
/// placed exactly at the virtual source position.
const MIN_DISTANCE: f64 = 1e-3;

/// The panner's internal coordinate convention, fixed by:
/// canonical (x=right, y=front, z=up) rewritten to (x, -z, y). Applied
/// identically to speaker positions and the virtual source position, so it
/// is a distance-preserving relabelling — but it is applied literally, not
/// optimised away, because presets are calibrated against this convention.
fn to_panner_convention(v: Vec3) -> Vec3 {
    Vec3::new(v.x, -v.z, v.y)
}

pub struct Dbap {
    focus: f64,
    layout_radius: f64,
    /// Speaker positions in the panner's internal convention.
    speaker_positions: Vec<Vec3>,
}

impl Dbap {
    pub fn new(focus: f64) -> Self {
        Self {
            focus,
            layout_radius: 1.0,
            speaker_positions: Vec::new(),
        }
    }

    pub fn set_focus(&mut self, focus: f64) {
        self.focus = focus.clamp(0.2, 5.0);
    }
}

impl Panner for Dbap {
    fn prepare(&mut self, layout: &Layout) {
        self.layout_radius = layout.layout_radius;
        self.speaker_positions = layout
            .speakers
            .iter()
            .map(|s| to_panner_convention(s.position()))
            .collect();
    }

    fn gains_for(&self, direction: Vec3, out: &mut [f32]) {
        debug_assert_eq!(out.len(), self.speaker_positions.len());

        let source_pos = to_panner_convention(direction.scale(self.layout_radius));

        let mut raw: Vec<f64> = Vec::with_capacity(self.speaker_positions.len());
        for pos in &self.speaker_positions {
            let d = pos.distance_to(source_pos).max(MIN_DISTANCE);
            raw.push(1.0 / d.powf(self.focus));
        }

        let sum_sq: f64 = raw.iter().map(|w| w * w).sum();
        let norm = if sum_sq > 0.0 { sum_sq.sqrt() } else { 1.0 };

        for (o, w) in out.iter_mut().zip(raw.iter()) {
            *o = (w / norm) as f32;
        }
    }
}

/// Accumulate one mono block through a precomputed DBAP gain vector.
pub fn pan_block(gains: &[f32], input: &[f32], output: &mut [f32], num_speakers: usize) {
    accumulate_block(input, gains, output, num_speakers);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::Speaker;
    use approx::assert_relative_eq;

    fn quad() -> Layout {
        Layout::from_parts(
            vec![
                Speaker { index: 0, azimuth_rad: 0.0, elevation_rad: 0.0, radius_m: 2.0, device_channel: 0 },
                Speaker { index: 1, azimuth_rad: std::f64::consts::FRAC_PI_2, elevation_rad: 0.0, radius_m: 2.0, device_channel: 1 },
                Speaker { index: 2, azimuth_rad: std::f64::consts::PI, elevation_rad: 0.0, radius_m: 2.0, device_channel: 2 },
                Speaker { index: 3, azimuth_rad: -std::f64::consts::FRAC_PI_2, elevation_rad: 0.0, radius_m: 2.0, device_channel: 3 },
            ],
            vec![],
        )
    }

    #[test]
    fn gains_sum_of_squares_is_normalised() {
        let layout = quad();
        let mut panner = Dbap::new(1.0);
        panner.prepare(&layout);
        let mut gains = vec![0.0f32; 4];
        panner.gains_for(Vec3::front(), &mut gains);
        let sum_sq: f32 = gains.iter().map(|g| g * g).sum();
        assert_relative_eq!(sum_sq, 1.0, epsilon = 1e-5);
    }

    #[test]
    fn direction_at_speaker_favours_that_speaker() {
        let layout = quad();
        let mut panner = Dbap::new(3.0);
        panner.prepare(&layout);
        let mut gains = vec![0.0f32; 4];
        panner.gains_for(Vec3::front(), &mut gains);
        assert!(gains[0] > gains[1]);
        assert!(gains[0] > gains[2]);
        assert!(gains[0] > gains[3]);
    }

    #[test]
    fn higher_focus_sharpens_the_dominant_weight() {
        let layout = quad();
        let mut loose = Dbap::new(0.2);
        let mut tight = Dbap::new(5.0);
        loose.prepare(&layout);
        tight.prepare(&layout);
        let mut g_loose = vec![0.0f32; 4];
        let mut g_tight = vec![0.0f32; 4];
        loose.gains_for(Vec3::front(), &mut g_loose);
        tight.gains_for(Vec3::front(), &mut g_tight);
        assert!(g_tight[0] > g_loose[0]);
    }

    #[test]
    fn accumulate_adds_into_existing_output() {
        let layout = quad();
        let mut panner = Dbap::new(1.0);
        panner.prepare(&layout);
        let mut gains = vec![0.0f32; 4];
        panner.gains_for(Vec3::front(), &mut gains);

        let input = vec![1.0f32; 4];
        let mut output = vec![0.0f32; 4 * 4];
        pan_block(&gains, &input, &mut output, 4);
        pan_block(&gains, &input, &mut output, 4);

        assert_relative_eq!(output[0], 2.0 * gains[0], epsilon = 1e-6);
    }
}
