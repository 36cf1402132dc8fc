//! Direction engine: keyframe interpolation, SLERP, and elevation
//! sanitisation.
//!
//! Interpolates a per-source keyframe timeline at an arbitrary query time,
//! falling back to the last good direction when interpolation is degenerate
//! (near-parallel or antipodal endpoints).

use rf_core::Vec3;

use crate::config::ElevationMode;
use crate::layout::Layout;
use crate::scene::Keyframe;

/// Dot-product threshold above which two directions are "near parallel":
/// linear interpolation is numerically safer than SLERP's `1/sin(theta)`
/// term, which blows up as theta -> 0.
const NEAR_PARALLEL_DOT: f64 = 0.9995;

/// Symmetric threshold for "near antipodal": SLERP's great-circle path is
/// ill-defined here because any perpendicular axis is equally valid.
const NEAR_ANTIPODAL_DOT: f64 = -0.9995;

/// Magnitude below which an interpolated direction is treated as degenerate.
const DEGENERATE_MAGNITUDE: f64 = 1e-4;

/// Tracks per-source interpolation state that must persist across blocks:
/// the last direction that passed the degeneracy check, and whether the
/// one-time fallback warning has already been recorded.
#[derive(Debug, Clone, Copy)]
pub struct DirectionState {
    last_good: Vec3,
    pub fallback_recorded: bool,
}

impl Default for DirectionState {
    fn default() -> Self {
        Self {
            last_good: Vec3::front(),
            fallback_recorded: false,
        }
    }
}

/// Interpolate a source's trajectory at time `t`, applying the safe-direction
/// fallback and updating `state.last_good` on success.
///
/// `tally_fallback` is invoked at most once per source.
pub fn interpolate(
    keyframes: &[Keyframe],
    t: f64,
    state: &mut DirectionState,
    mut tally_fallback: impl FnMut(),
) -> Vec3 {
    let raw = raw_interpolate(keyframes, t);

    let safe = match raw.normalized() {
        Some(v) if v.magnitude() >= DEGENERATE_MAGNITUDE => v,
        _ => {
            if !state.fallback_recorded {
                tally_fallback();
                state.fallback_recorded = true;
            }
            if state.last_good.magnitude() >= DEGENERATE_MAGNITUDE {
                state.last_good
            } else {
                nearest_keyframe_direction(keyframes, t).unwrap_or(Vec3::front())
            }
        }
    };

    state.last_good = safe;
    safe
}

fn nearest_keyframe_direction(keyframes: &[Keyframe], t: f64) -> Option<Vec3> {
    keyframes
        .iter()
        .min_by(|a, b| {
            (a.time_sec - t)
                .abs()
                .partial_cmp(&(b.time_sec - t).abs())
                .unwrap()
        })
        .map(|k| k.direction)
}

fn raw_interpolate(keyframes: &[Keyframe], t: f64) -> Vec3 {
    match keyframes {
        [] => Vec3::front(),
        [only] => only.direction.normalized().unwrap_or(Vec3::front()),
        _ => {
            let first = keyframes.first().unwrap();
            let last = keyframes.last().unwrap();
            if t <= first.time_sec {
                return first.direction.normalized().unwrap_or(Vec3::front());
            }
            if t >= last.time_sec {
                return last.direction.normalized().unwrap_or(Vec3::front());
            }

            let idx = match keyframes.binary_search_by(|k| k.time_sec.partial_cmp(&t).unwrap()) {
                Ok(i) => i,
                Err(i) => i - 1,
            };
            let a = keyframes[idx];
            let b = keyframes[idx + 1];
            let dt = b.time_sec - a.time_sec;
            if dt < 1e-9 {
                return b.direction;
            }
            let u = ((t - a.time_sec) / dt).clamp(0.0, 1.0);
            slerp(a.direction, b.direction, u)
        }
    }
}

/// Spherical linear interpolation between two unit vectors.
pub fn slerp(a: Vec3, b: Vec3, u: f64) -> Vec3 {
    let dot = a.dot(b).clamp(-1.0, 1.0);

    if dot > NEAR_PARALLEL_DOT {
        return a.lerp(b, u).normalized().unwrap_or(a);
    }

    if dot < NEAR_ANTIPODAL_DOT {
        let axis = arbitrary_perpendicular(a);
        return rotate_about_axis(a, axis, std::f64::consts::PI * u);
    }

    let theta = dot.acos();
    let sin_theta = theta.sin();
    let wa = ((1.0 - u) * theta).sin() / sin_theta;
    let wb = (u * theta).sin() / sin_theta;
    a.scale(wa).add(b.scale(wb))
}

/// Any unit vector perpendicular to `v` — used only in the near-antipodal
/// branch where the exact axis choice doesn't matter by symmetry.
fn arbitrary_perpendicular(v: Vec3) -> Vec3 {
    let reference = if v.x.abs() < 0.9 {
        Vec3::new(1.0, 0.0, 0.0)
    } else {
        Vec3::new(0.0, 1.0, 0.0)
    };
    v.cross(reference).normalized().unwrap_or(Vec3::new(0.0, 0.0, 1.0))
}

/// Rotate `v` about unit `axis` by `angle` radians (Rodrigues' formula).
fn rotate_about_axis(v: Vec3, axis: Vec3, angle: f64) -> Vec3 {
    let cos_t = angle.cos();
    let sin_t = angle.sin();
    v.scale(cos_t)
        .add(axis.cross(v).scale(sin_t))
        .add(axis.scale(axis.dot(v) * (1.0 - cos_t)))
}

/// Per-block elevation sanitisation: remap a normalised
/// direction's elevation into the layout's declared range, according to
/// `mode`, and renormalise.
pub fn sanitize_elevation(direction: Vec3, layout: &Layout, mode: ElevationMode) -> Vec3 {
    if layout.is_2d {
        let flattened = Vec3::new(direction.x, direction.y, 0.0);
        return flattened.normalized().unwrap_or(Vec3::front());
    }

    let (azimuth, elevation) = direction.to_azimuth_elevation();
    let remapped = remap_elevation(elevation, layout, mode);
    let reconstructed = Vec3::from_azimuth_elevation(azimuth, remapped);
    reconstructed.normalized().unwrap_or(Vec3::front())
}

fn remap_elevation(elevation_rad: f64, layout: &Layout, mode: ElevationMode) -> f64 {
    let min_el = layout.min_elevation_rad;
    let max_el = layout.max_elevation_rad;

    match mode {
        ElevationMode::Clamp => elevation_rad.clamp(min_el, max_el),
        ElevationMode::RescaleAtmosUp => {
            rescale(elevation_rad, 0.0, std::f64::consts::FRAC_PI_2, min_el, max_el)
        }
        ElevationMode::RescaleFullSphere => rescale(
            elevation_rad,
            -std::f64::consts::FRAC_PI_2,
            std::f64::consts::FRAC_PI_2,
            min_el,
            max_el,
        ),
    }
}

/// Linearly map `value` from `[src_lo, src_hi]` to `[dst_lo, dst_hi]`,
/// clamping `value` to the source range first.
fn rescale(value: f64, src_lo: f64, src_hi: f64, dst_lo: f64, dst_hi: f64) -> f64 {
    let clamped = value.clamp(src_lo, src_hi);
    let t = (clamped - src_lo) / (src_hi - src_lo);
    dst_lo + t * (dst_hi - dst_lo)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{Layout, Speaker};

    fn layout_3d() -> Layout {
        Layout::from_parts(
            vec![
                Speaker {
                    index: 0,
                    azimuth_rad: 0.0,
                    elevation_rad: -0.3,
                    radius_m: 1.0,
                    device_channel: 0,
                },
                Speaker {
                    index: 1,
                    azimuth_rad: 0.0,
                    elevation_rad: 0.9,
                    radius_m: 1.0,
                    device_channel: 1,
                },
            ],
            vec![],
        )
    }

    #[test]
    fn slerp_endpoints_match_inputs() {
        let a = Vec3::new(1.0, 0.0, 0.0);
        let b = Vec3::new(0.0, 1.0, 0.0);
        assert!(slerp(a, b, 0.0).distance_to(a) < 1e-9);
        assert!(slerp(a, b, 1.0).distance_to(b) < 1e-9);
    }

    #[test]
    fn slerp_midpoint_is_equidistant() {
        let a = Vec3::new(1.0, 0.0, 0.0);
        let b = Vec3::new(0.0, 1.0, 0.0);
        let mid = slerp(a, b, 0.5);
        assert!((mid.distance_to(a) - mid.distance_to(b)).abs() < 1e-9);
        assert!((mid.magnitude() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn slerp_near_antipodal_stays_unit_length() {
        let a = Vec3::new(1.0, 0.0, 0.0);
        let b = Vec3::new(-1.0, 0.0, 0.0);
        let mid = slerp(a, b, 0.5);
        assert!((mid.magnitude() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn slerp_near_parallel_uses_lerp_path() {
        let a = Vec3::new(1.0, 0.0, 0.0);
        let b = Vec3::new(0.9999, 0.01, 0.0).normalized().unwrap();
        let mid = slerp(a, b, 0.5);
        assert!((mid.magnitude() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn interpolate_empty_keyframes_falls_back_to_front() {
        let mut state = DirectionState::default();
        let mut tallied = 0;
        let v = interpolate(&[], 1.0, &mut state, || tallied += 1);
        assert_eq!(v, Vec3::front());
        assert_eq!(tallied, 1);
    }

    #[test]
    fn interpolate_before_first_keyframe_clamps() {
        let kfs = [
            Keyframe { time_sec: 1.0, direction: Vec3::new(1.0, 0.0, 0.0) },
            Keyframe { time_sec: 2.0, direction: Vec3::new(0.0, 1.0, 0.0) },
        ];
        let mut state = DirectionState::default();
        let v = interpolate(&kfs, 0.0, &mut state, || {});
        assert!(v.distance_to(Vec3::new(1.0, 0.0, 0.0)) < 1e-9);
    }

    #[test]
    fn interpolate_after_last_keyframe_clamps() {
        let kfs = [
            Keyframe { time_sec: 1.0, direction: Vec3::new(1.0, 0.0, 0.0) },
            Keyframe { time_sec: 2.0, direction: Vec3::new(0.0, 1.0, 0.0) },
        ];
        let mut state = DirectionState::default();
        let v = interpolate(&kfs, 5.0, &mut state, || {});
        assert!(v.distance_to(Vec3::new(0.0, 1.0, 0.0)) < 1e-9);
    }

    #[test]
    fn sanitize_elevation_clamp_mode_bounds_output() {
        let layout = layout_3d();
        let steep = Vec3::from_azimuth_elevation(0.0, 1.4);
        let sanitized = sanitize_elevation(steep, &layout, ElevationMode::Clamp);
        let (_, el) = sanitized.to_azimuth_elevation();
        assert!(el <= layout.max_elevation_rad + 1e-9);
    }

    #[test]
    fn sanitize_elevation_2d_layout_zeroes_z() {
        let layout = Layout::from_parts(
            vec![
                Speaker { index: 0, azimuth_rad: 0.0, elevation_rad: 0.0, radius_m: 1.0, device_channel: 0 },
                Speaker { index: 1, azimuth_rad: 1.0, elevation_rad: 0.0, radius_m: 1.0, device_channel: 1 },
            ],
            vec![],
        );
        let steep = Vec3::from_azimuth_elevation(0.2, 0.8);
        let sanitized = sanitize_elevation(steep, &layout, ElevationMode::Clamp);
        assert!(sanitized.z.abs() < 1e-9);
    }
}
