//! Layer-based amplitude panning.
//!
//! Speakers are grouped into elevation-clustered layers derived from the
//! layout, then gain is blended across a source's neighbouring layers and
//! panned within each layer by azimuth.

use rf_core::Vec3;

use crate::layout::Layout;
use crate::panners::{accumulate_block, Panner};

/// Elevation delta (radians) below which two speakers are folded into the
/// same layer — loosely "same height tier".
const LAYER_EPSILON_RAD: f64 = 2.0 * std::f64::consts::PI / 180.0;

/// One speaker's position inside its layer's azimuth ring.
#[derive(Clone, Copy)]
struct RingMember {
    speaker_index: usize,
    azimuth_rad: f64,
}

struct Layer {
    elevation_rad: f64,
    /// Ring members sorted by azimuth.
    ring: Vec<RingMember>,
}

pub struct Lbap {
    dispersion: f64,
    layers: Vec<Layer>,
}

impl Lbap {
    pub fn new(dispersion: f64) -> Self {
        Self {
            dispersion: dispersion.clamp(0.0, 1.0),
            layers: Vec::new(),
        }
    }

    pub fn set_dispersion(&mut self, dispersion: f64) {
        self.dispersion = dispersion.clamp(0.0, 1.0);
    }

    /// Azimuthal equal-power pan weights for `azimuth` within one layer's
    /// speaker ring, accumulated (scaled by `layer_weight`) into `out`.
    fn pan_ring(ring: &[RingMember], azimuth: f64, layer_weight: f32, out: &mut [f32]) {
        if layer_weight <= 0.0 {
            return;
        }
        if ring.len() == 1 {
            out[ring[0].speaker_index] += layer_weight;
            return;
        }

        let n = ring.len();
        for idx in 0..n {
            let a = ring[idx].azimuth_rad;
            let b_idx = (idx + 1) % n;
            let b = ring[b_idx].azimuth_rad;

            let span = angular_span(a, b);
            let pos = angular_span(a, azimuth);
            if pos > span + 1e-9 {
                continue;
            }
            let t = if span.abs() < 1e-9 {
                0.0
            } else {
                (pos / span).clamp(0.0, 1.0)
            };
            let w0 = (t * std::f64::consts::FRAC_PI_2).cos() as f32;
            let w1 = (t * std::f64::consts::FRAC_PI_2).sin() as f32;
            out[ring[idx].speaker_index] += w0 * layer_weight;
            out[ring[b_idx].speaker_index] += w1 * layer_weight;
            return;
        }
    }

    /// Blend factor toward the upper bracketing layer,:
    /// `dispersion` widens the cross-fade zone around the layer boundary
    /// (0 = hard switch at the midpoint, 1 = linear blend across the full
    /// gap between layers).
    fn blend_weight(&self, t: f64) -> f64 {
        if self.dispersion <= 1e-6 {
            return if t < 0.5 { 0.0 } else { 1.0 };
        }
        let lo = 0.5 - self.dispersion / 2.0;
        ((t - lo) / self.dispersion).clamp(0.0, 1.0)
    }
}

/// Non-negative angular distance travelling counter-clockwise from `from` to
/// `to`, in `[0, 2*pi)`.
fn angular_span(from: f64, to: f64) -> f64 {
    let two_pi = 2.0 * std::f64::consts::PI;
    let mut d = (to - from) % two_pi;
    if d < 0.0 {
        d += two_pi;
    }
    d
}

impl Panner for Lbap {
    fn prepare(&mut self, layout: &Layout) {
        let mut members: Vec<(usize, f64, f64)> = layout
            .speakers
            .iter()
            .map(|s| (s.index, s.elevation_rad, s.azimuth_rad))
            .collect();
        members.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap());

        let mut layers: Vec<Layer> = Vec::new();
        for (index, elevation, azimuth) in &members {
            match layers.last_mut() {
                Some(layer) if (elevation - layer.elevation_rad).abs() < LAYER_EPSILON_RAD => {
                    layer.ring.push(RingMember {
                        speaker_index: *index,
                        azimuth_rad: *azimuth,
                    });
                }
                _ => layers.push(Layer {
                    elevation_rad: *elevation,
                    ring: vec![RingMember {
                        speaker_index: *index,
                        azimuth_rad: *azimuth,
                    }],
                }),
            }
        }

        for layer in &mut layers {
            layer
                .ring
                .sort_by(|a, b| a.azimuth_rad.partial_cmp(&b.azimuth_rad).unwrap());
        }

        self.layers = layers;
    }

    fn gains_for(&self, direction: Vec3, out: &mut [f32]) {
        out.iter_mut().for_each(|g| *g = 0.0);
        if self.layers.is_empty() {
            return;
        }

        let (azimuth, elevation) = direction.to_azimuth_elevation();

        if self.layers.len() == 1 {
            Self::pan_ring(&self.layers[0].ring, azimuth, 1.0, out);
            return;
        }

        if elevation <= self.layers[0].elevation_rad {
            Self::pan_ring(&self.layers[0].ring, azimuth, 1.0, out);
            return;
        }
        let last = self.layers.len() - 1;
        if elevation >= self.layers[last].elevation_rad {
            Self::pan_ring(&self.layers[last].ring, azimuth, 1.0, out);
            return;
        }

        let upper_idx = self
            .layers
            .iter()
            .position(|l| l.elevation_rad >= elevation)
            .unwrap_or(last);
        let lower_idx = upper_idx.saturating_sub(1);
        let lower = &self.layers[lower_idx];
        let upper = &self.layers[upper_idx];

        let span = upper.elevation_rad - lower.elevation_rad;
        let t = if span.abs() < 1e-9 {
            0.0
        } else {
            ((elevation - lower.elevation_rad) / span).clamp(0.0, 1.0)
        };
        let upper_weight = self.blend_weight(t) as f32;
        let lower_weight = 1.0 - upper_weight;

        Self::pan_ring(&lower.ring, azimuth, lower_weight, out);
        Self::pan_ring(&upper.ring, azimuth, upper_weight, out);
    }
}

/// Accumulate one mono block through a precomputed LBAP gain vector.
pub fn pan_block(gains: &[f32], input: &[f32], output: &mut [f32], num_speakers: usize) {
    accumulate_block(input, gains, output, num_speakers);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::Speaker;
    use approx::assert_relative_eq;

    fn two_layer_layout() -> Layout {
        Layout::from_parts(
            vec![
                Speaker { index: 0, azimuth_rad: 0.0, elevation_rad: -0.3, radius_m: 1.0, device_channel: 0 },
                Speaker { index: 1, azimuth_rad: std::f64::consts::PI, elevation_rad: -0.3, radius_m: 1.0, device_channel: 1 },
                Speaker { index: 2, azimuth_rad: 0.0, elevation_rad: 0.9, radius_m: 1.0, device_channel: 2 },
                Speaker { index: 3, azimuth_rad: std::f64::consts::PI, elevation_rad: 0.9, radius_m: 1.0, device_channel: 3 },
            ],
            vec![],
        )
    }

    #[test]
    fn below_lowest_layer_uses_only_that_layer() {
        let layout = two_layer_layout();
        let mut panner = Lbap::new(0.5);
        panner.prepare(&layout);
        let dir = Vec3::from_azimuth_elevation(0.0, -1.2);
        let mut gains = vec![0.0f32; 4];
        panner.gains_for(dir, &mut gains);
        assert!(gains[2] == 0.0 && gains[3] == 0.0);
        assert!(gains[0] > 0.0);
    }

    #[test]
    fn zero_dispersion_hard_switches_at_midpoint() {
        let layout = two_layer_layout();
        let mut panner = Lbap::new(0.0);
        panner.prepare(&layout);
        let mid_elevation = (layout.min_elevation_rad + layout.max_elevation_rad) / 2.0 - 0.01;
        let dir = Vec3::from_azimuth_elevation(0.0, mid_elevation);
        let mut gains = vec![0.0f32; 4];
        panner.gains_for(dir, &mut gains);
        assert!(gains[2] == 0.0 && gains[3] == 0.0);
    }

    #[test]
    fn full_dispersion_blends_both_layers_at_midpoint() {
        let layout = two_layer_layout();
        let mut panner = Lbap::new(1.0);
        panner.prepare(&layout);
        let mid_elevation = (layout.min_elevation_rad + layout.max_elevation_rad) / 2.0;
        let dir = Vec3::from_azimuth_elevation(0.0, mid_elevation);
        let mut gains = vec![0.0f32; 4];
        panner.gains_for(dir, &mut gains);
        assert!(gains[0] > 0.0 && gains[2] > 0.0);
    }

    #[test]
    fn azimuth_at_speaker_is_pure_single_channel_within_layer() {
        let layout = two_layer_layout();
        let mut panner = Lbap::new(0.5);
        panner.prepare(&layout);
        let dir = Vec3::from_azimuth_elevation(0.0, -0.3);
        let mut gains = vec![0.0f32; 4];
        panner.gains_for(dir, &mut gains);
        assert_relative_eq!(gains[0], 1.0, epsilon = 1e-4);
        assert_relative_eq!(gains[1], 0.0, epsilon = 1e-4);
    }
}
