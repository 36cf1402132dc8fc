//! Vector-base amplitude panning.
//!
//! Pulkki's inverse-matrix VBAP formulation: a triangulated speaker mesh
//! with per-triangle gain solving via a precomputed inverse matrix.

use rf_core::Vec3;

use crate::layout::Layout;
use crate::panners::{accumulate_block, Panner};

/// A triangular facet of the speaker mesh's convex hull, with a precomputed
/// inverse of the matrix whose columns are the three speakers' unit
/// directions — so each `gains_for` call is a single matrix-vector product.
struct Face {
    speakers: [usize; 3],
    /// Row-major inverse of `[a b c]` (columns = speaker unit vectors).
    inverse: [[f64; 3]; 3],
}

/// A 2D arc between two adjacent (by azimuth) speakers, with a precomputed
/// inverse of the 2x2 (x, y) matrix.
struct Arc {
    speakers: [usize; 2],
    inverse: [[f64; 2]; 2],
}

pub struct Vbap {
    is_2d: bool,
    faces: Vec<Face>,
    arcs: Vec<Arc>,
}

impl Vbap {
    pub fn new() -> Self {
        Self {
            is_2d: false,
            faces: Vec::new(),
            arcs: Vec::new(),
        }
    }

    fn build_faces(layout: &Layout) -> Vec<Face> {
        let dirs: Vec<Vec3> = layout.speakers.iter().map(|s| s.unit_direction()).collect();
        let n = dirs.len();
        let mut faces = Vec::new();

        if n < 3 {
            return faces;
        }

        for i in 0..n {
            for j in (i + 1)..n {
                for k in (j + 1)..n {
                    let (a, b, c) = (dirs[i], dirs[j], dirs[k]);
                    let mut normal = b.sub(a).cross(c.sub(a));
                    if normal.magnitude() < 1e-9 {
                        continue;
                    }
                    if normal.dot(a) < 0.0 {
                        normal = normal.scale(-1.0);
                    }

                    let is_hull_face = (0..n).all(|p| {
                        if p == i || p == j || p == k {
                            return true;
                        }
                        normal.dot(dirs[p].sub(a)) <= 1e-6
                    });

                    if !is_hull_face {
                        continue;
                    }

                    if let Some(inverse) = invert3(a, b, c) {
                        faces.push(Face {
                            speakers: [i, j, k],
                            inverse,
                        });
                    }
                }
            }
        }

        faces
    }

    fn build_arcs(layout: &Layout) -> Vec<Arc> {
        let mut order: Vec<usize> = (0..layout.speakers.len()).collect();
        order.sort_by(|&a, &b| {
            layout.speakers[a]
                .azimuth_rad
                .partial_cmp(&layout.speakers[b].azimuth_rad)
                .unwrap()
        });

        let n = order.len();
        let mut arcs = Vec::new();
        if n < 2 {
            return arcs;
        }

        for idx in 0..n {
            let i = order[idx];
            let j = order[(idx + 1) % n];
            let a = layout.speakers[i].unit_direction();
            let b = layout.speakers[j].unit_direction();
            if let Some(inverse) = invert2(a, b) {
                arcs.push(Arc { speakers: [i, j], inverse });
            }
        }
        arcs
    }
}

impl Panner for Vbap {
    fn prepare(&mut self, layout: &Layout) {
        self.is_2d = layout.is_2d;
        if self.is_2d {
            self.arcs = Self::build_arcs(layout);
            self.faces.clear();
        } else {
            self.faces = Self::build_faces(layout);
            self.arcs.clear();
        }
    }

    fn gains_for(&self, direction: Vec3, out: &mut [f32]) {
        out.iter_mut().for_each(|g| *g = 0.0);

        if self.is_2d {
            for arc in &self.arcs {
                let g0 = arc.inverse[0][0] * direction.x + arc.inverse[0][1] * direction.y;
                let g1 = arc.inverse[1][0] * direction.x + arc.inverse[1][1] * direction.y;
                if g0 >= -1e-6 && g1 >= -1e-6 {
                    write_normalised(out, &arc.speakers, &[g0.max(0.0), g1.max(0.0)]);
                    return;
                }
            }
            return;
        }

        for face in &self.faces {
            let g0 = face.inverse[0][0] * direction.x
                + face.inverse[0][1] * direction.y
                + face.inverse[0][2] * direction.z;
            let g1 = face.inverse[1][0] * direction.x
                + face.inverse[1][1] * direction.y
                + face.inverse[1][2] * direction.z;
            let g2 = face.inverse[2][0] * direction.x
                + face.inverse[2][1] * direction.y
                + face.inverse[2][2] * direction.z;

            if g0 >= -1e-6 && g1 >= -1e-6 && g2 >= -1e-6 {
                write_normalised(out, &face.speakers, &[g0.max(0.0), g1.max(0.0), g2.max(0.0)]);
                return;
            }
        }
        // No covering triangle/arc: leave `out` zeroed, the robustness
        // layer retargets toward the nearest speaker.
    }
}

fn write_normalised(out: &mut [f32], speakers: &[usize], raw_gains: &[f64]) {
    let sum_sq: f64 = raw_gains.iter().map(|g| g * g).sum();
    let norm = if sum_sq > 0.0 { sum_sq.sqrt() } else { 1.0 };
    for (&s, &g) in speakers.iter().zip(raw_gains.iter()) {
        out[s] = (g / norm) as f32;
    }
}

/// Invert the 3x3 matrix with columns `a, b, c`. Returns `None` if singular.
fn invert3(a: Vec3, b: Vec3, c: Vec3) -> Option<[[f64; 3]; 3]> {
    let m = [
        [a.x, b.x, c.x],
        [a.y, b.y, c.y],
        [a.z, b.z, c.z],
    ];
    let det = m[0][0] * (m[1][1] * m[2][2] - m[1][2] * m[2][1])
        - m[0][1] * (m[1][0] * m[2][2] - m[1][2] * m[2][0])
        + m[0][2] * (m[1][0] * m[2][1] - m[1][1] * m[2][0]);
    if det.abs() < 1e-12 {
        return None;
    }
    let inv_det = 1.0 / det;

    let cof = |r0: usize, r1: usize, c0: usize, c1: usize| {
        m[r0][c0] * m[r1][c1] - m[r0][c1] * m[r1][c0]
    };

    // Adjugate-transpose / det, yielding the inverse's rows directly (so
    // `gains_for` computes inverse * direction without a further transpose).
    Some([
        [
            cof(1, 2, 1, 2) * inv_det,
            -cof(0, 2, 1, 2) * inv_det,
            cof(0, 1, 1, 2) * inv_det,
        ],
        [
            -cof(1, 2, 0, 2) * inv_det,
            cof(0, 2, 0, 2) * inv_det,
            -cof(0, 1, 0, 2) * inv_det,
        ],
        [
            cof(1, 2, 0, 1) * inv_det,
            -cof(0, 2, 0, 1) * inv_det,
            cof(0, 1, 0, 1) * inv_det,
        ],
    ])
}

/// Invert the 2x2 matrix with columns `a, b` (using only x, y components).
fn invert2(a: Vec3, b: Vec3) -> Option<[[f64; 2]; 2]> {
    let det = a.x * b.y - a.y * b.x;
    if det.abs() < 1e-12 {
        return None;
    }
    let inv_det = 1.0 / det;
    Some([[b.y * inv_det, -b.x * inv_det], [-a.y * inv_det, a.x * inv_det]])
}

/// Accumulate one mono block through a precomputed VBAP gain vector.
pub fn pan_block(gains: &[f32], input: &[f32], output: &mut [f32], num_speakers: usize) {
    accumulate_block(input, gains, output, num_speakers);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::Speaker;
    use approx::assert_relative_eq;

    fn quad_3d() -> Layout {
        // Slight elevation perturbation on two speakers so the layout is
        // not flagged is_2d, exercising the tetrahedral-hull path.
        Layout::from_parts(
            vec![
                Speaker { index: 0, azimuth_rad: 0.0, elevation_rad: 0.2, radius_m: 1.0, device_channel: 0 },
                Speaker { index: 1, azimuth_rad: std::f64::consts::FRAC_PI_2, elevation_rad: -0.2, radius_m: 1.0, device_channel: 1 },
                Speaker { index: 2, azimuth_rad: std::f64::consts::PI, elevation_rad: 0.2, radius_m: 1.0, device_channel: 2 },
                Speaker { index: 3, azimuth_rad: -std::f64::consts::FRAC_PI_2, elevation_rad: -0.2, radius_m: 1.0, device_channel: 3 },
            ],
            vec![],
        )
    }

    #[test]
    fn direction_at_speaker_is_pure_single_channel() {
        let layout = quad_3d();
        let mut panner = Vbap::new();
        panner.prepare(&layout);
        let dir = layout.speakers[0].unit_direction();
        let mut gains = vec![0.0f32; 4];
        panner.gains_for(dir, &mut gains);
        assert_relative_eq!(gains[0], 1.0, epsilon = 1e-4);
    }

    #[test]
    fn two_d_layout_uses_arc_path_and_sums_energy_to_one() {
        let layout = Layout::from_parts(
            vec![
                Speaker { index: 0, azimuth_rad: 0.0, elevation_rad: 0.0, radius_m: 1.0, device_channel: 0 },
                Speaker { index: 1, azimuth_rad: std::f64::consts::FRAC_PI_2, elevation_rad: 0.0, radius_m: 1.0, device_channel: 1 },
                Speaker { index: 2, azimuth_rad: std::f64::consts::PI, elevation_rad: 0.0, radius_m: 1.0, device_channel: 2 },
                Speaker { index: 3, azimuth_rad: -std::f64::consts::FRAC_PI_2, elevation_rad: 0.0, radius_m: 1.0, device_channel: 3 },
            ],
            vec![],
        );
        let mut panner = Vbap::new();
        panner.prepare(&layout);
        let dir = Vec3::from_azimuth_elevation(std::f64::consts::FRAC_PI_4, 0.0);
        let mut gains = vec![0.0f32; 4];
        panner.gains_for(dir, &mut gains);
        let sum_sq: f32 = gains.iter().map(|g| g * g).sum();
        assert_relative_eq!(sum_sq, 1.0, epsilon = 1e-4);
    }
}
