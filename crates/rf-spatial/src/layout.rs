//! Speaker layout model.
//!
//! An arbitrary array of speakers and subwoofers parsed from a layout
//! document, with device channel assignment and output channel counting.

use rf_core::Vec3;
use serde::Deserialize;

use crate::error::{SpatialError, SpatialResult};

/// One loudspeaker. Owned by [`Layout`] for its lifetime.
#[derive(Debug, Clone, Copy)]
pub struct Speaker {
    /// Consecutive 0-based index in declaration order — the index every
    /// panner uses internally.
    pub index: usize,
    pub azimuth_rad: f64,
    pub elevation_rad: f64,
    pub radius_m: f64,
    /// Index into the final output buffer. May have gaps relative to `index`.
    pub device_channel: usize,
}

impl Speaker {
    /// Unit direction vector for this speaker in the canonical
    /// (x=right, y=front, z=up) convention.
    pub fn unit_direction(&self) -> Vec3 {
        Vec3::from_azimuth_elevation(self.azimuth_rad, self.elevation_rad)
            .normalized()
            .unwrap_or(Vec3::front())
    }

    pub fn position(&self) -> Vec3 {
        self.unit_direction().scale(self.radius_m)
    }
}

/// A subwoofer / LFE output channel. Owned by [`Layout`].
#[derive(Debug, Clone, Copy)]
pub struct Subwoofer {
    pub device_channel: usize,
}

/// Immutable speaker layout, derived once at load time.
#[derive(Debug, Clone)]
pub struct Layout {
    pub speakers: Vec<Speaker>,
    pub subwoofers: Vec<Subwoofer>,
    pub layout_radius: f64,
    pub min_elevation_rad: f64,
    pub max_elevation_rad: f64,
    pub is_2d: bool,
    pub output_channel_count: usize,
}

#[derive(Debug, Deserialize)]
struct SpeakerDoc {
    azimuth: f64,
    elevation: f64,
    #[serde(default)]
    radius: Option<f64>,
    #[serde(rename = "deviceChannel")]
    device_channel: usize,
}

#[derive(Debug, Deserialize)]
struct SubwooferDoc {
    channel: usize,
}

#[derive(Debug, Deserialize)]
struct LayoutDoc {
    speakers: Vec<SpeakerDoc>,
    #[serde(default)]
    subwoofers: Vec<SubwooferDoc>,
}

/// Elevation span (radians) below which a layout is considered 2D.
const TWO_D_THRESHOLD_RAD: f64 = 3.0 * std::f64::consts::PI / 180.0;

impl Layout {
    /// Parse a layout document into a [`Layout`].
    pub fn load(source: &str) -> SpatialResult<Self> {
        let doc: LayoutDoc = serde_json::from_str(source)?;
        if doc.speakers.is_empty() {
            return Err(SpatialError::InvalidLayout(
                "layout must declare at least one speaker".into(),
            ));
        }

        let speakers: Vec<Speaker> = doc
            .speakers
            .into_iter()
            .enumerate()
            .map(|(index, s)| {
                let radius = match s.radius {
                    Some(r) if r > 0.0 => r,
                    _ => 1.0,
                };
                Speaker {
                    index,
                    azimuth_rad: s.azimuth,
                    elevation_rad: s.elevation,
                    radius_m: radius,
                    device_channel: s.device_channel,
                }
            })
            .collect();

        let subwoofers: Vec<Subwoofer> = doc
            .subwoofers
            .into_iter()
            .map(|s| Subwoofer {
                device_channel: s.channel,
            })
            .collect();

        Ok(Self::from_parts(speakers, subwoofers))
    }

    /// Build a layout directly from already-parsed speakers/subwoofers
    /// (used by tests and callers that construct layouts programmatically).
    pub fn from_parts(speakers: Vec<Speaker>, subwoofers: Vec<Subwoofer>) -> Self {
        let layout_radius = median(&speakers.iter().map(|s| s.radius_m).collect::<Vec<_>>());

        let min_elevation_rad = speakers
            .iter()
            .map(|s| s.elevation_rad)
            .fold(f64::INFINITY, f64::min);
        let max_elevation_rad = speakers
            .iter()
            .map(|s| s.elevation_rad)
            .fold(f64::NEG_INFINITY, f64::max);

        let is_2d = (max_elevation_rad - min_elevation_rad) < TWO_D_THRESHOLD_RAD;

        let num_speakers = speakers.len() as i64;
        let max_sub_channel = subwoofers
            .iter()
            .map(|s| s.device_channel as i64)
            .max()
            .unwrap_or(-1);
        let output_channel_count = (num_speakers - 1).max(max_sub_channel) as usize + 1;

        Self {
            speakers,
            subwoofers,
            layout_radius,
            min_elevation_rad,
            max_elevation_rad,
            is_2d,
            output_channel_count,
        }
    }

    pub fn num_speakers(&self) -> usize {
        self.speakers.len()
    }
}

fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 1.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quad_layout_json() -> &'static str {
        r#"{
            "speakers": [
                { "azimuth": 0.0, "elevation": 0.0, "radius": 5.0, "deviceChannel": 0 },
                { "azimuth": 1.5707963267948966, "elevation": 0.0, "radius": 5.0, "deviceChannel": 1 },
                { "azimuth": 3.141592653589793, "elevation": 0.0, "radius": 5.0, "deviceChannel": 2 },
                { "azimuth": -1.5707963267948966, "elevation": 0.0, "radius": 5.0, "deviceChannel": 3 }
            ]
        }"#
    }

    #[test]
    fn output_channel_count_no_subs() {
        let layout = Layout::load(quad_layout_json()).unwrap();
        assert_eq!(layout.output_channel_count, 4);
        assert!(layout.is_2d);
    }

    #[test]
    fn output_channel_count_with_gapped_subwoofers() {
        let json = r#"{
            "speakers": [
                { "azimuth": 0.0, "elevation": 0.0, "radius": 1.0, "deviceChannel": 0 },
                { "azimuth": 1.0, "elevation": 0.0, "radius": 1.0, "deviceChannel": 1 }
            ],
            "subwoofers": [ { "channel": 4 }, { "channel": 5 } ]
        }"#;
        let layout = Layout::load(json).unwrap();
        assert_eq!(layout.output_channel_count, 6);
    }

    #[test]
    fn radius_non_positive_replaced_with_one() {
        let json = r#"{
            "speakers": [ { "azimuth": 0.0, "elevation": 0.0, "radius": -2.0, "deviceChannel": 0 } ]
        }"#;
        let layout = Layout::load(json).unwrap();
        assert_eq!(layout.speakers[0].radius_m, 1.0);
    }

    #[test]
    fn missing_subwoofers_is_empty() {
        let layout = Layout::load(quad_layout_json()).unwrap();
        assert!(layout.subwoofers.is_empty());
    }

    #[test]
    fn malformed_layout_fails_loudly() {
        assert!(Layout::load("{ not json").is_err());
    }

    #[test]
    fn is_2d_false_for_height_layer() {
        let json = r#"{
            "speakers": [
                { "azimuth": 0.0, "elevation": 0.0, "radius": 1.0, "deviceChannel": 0 },
                { "azimuth": 0.0, "elevation": 0.7853981633974483, "radius": 1.0, "deviceChannel": 1 }
            ]
        }"#;
        let layout = Layout::load(json).unwrap();
        assert!(!layout.is_2d);
    }
}
