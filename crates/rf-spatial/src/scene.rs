//! Scene model: sources, keyframes, and the scene document parser.
//!
//! Nodes are grouped by id across frames into per-source keyframe
//! timelines, each carrying a direction normalised to a unit vector.

use std::collections::HashMap;

use log::warn;
use rf_core::{TimeUnit, Vec3};
use serde::Deserialize;

use crate::error::{SpatialError, SpatialResult};

/// A single timed direction sample for one source.
#[derive(Debug, Clone, Copy)]
pub struct Keyframe {
    pub time_sec: f64,
    pub direction: Vec3,
}

/// One audio-bearing entity in the scene: a stable id, a sorted trajectory,
/// and whether it routes through the LFE path instead of the panner.
#[derive(Debug, Clone)]
pub struct Source {
    pub id: String,
    pub keyframes: Vec<Keyframe>,
    pub is_lfe: bool,
}

/// An immutable, fully-sanitised scene: one authoritative duration and a
/// fixed map of sources, ready for either render driver to consume.
#[derive(Debug, Clone)]
pub struct Scene {
    pub sample_rate_hz: u32,
    pub duration_sec: f64,
    pub sources: HashMap<String, Source>,
}

#[derive(Debug, Deserialize)]
struct KeyframeDoc {
    time: f64,
    x: f64,
    y: f64,
    z: f64,
}

/// One node within one frame. `cart` is absent for `LFE` and for any
/// unrecognised type; `audio_object` and `direct_speaker` always carry it.
#[derive(Debug, Deserialize)]
struct NodeDoc {
    id: String,
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    cart: Option<[f64; 3]>,
}

#[derive(Debug, Deserialize)]
struct FrameDoc {
    time: f64,
    #[serde(default)]
    nodes: Vec<NodeDoc>,
}

#[derive(Debug, Deserialize)]
struct SceneDoc {
    #[serde(rename = "sampleRate")]
    sample_rate: u32,
    #[serde(rename = "timeUnit", default)]
    time_unit: Option<TimeUnit>,
    duration: f64,
    frames: Vec<FrameDoc>,
}

fn is_lfe_node(id: &str, kind: &str) -> bool {
    kind == "LFE" || id.eq_ignore_ascii_case("lfe")
}

impl Scene {
    /// Parse a scene document into a [`Scene`], applying every
    /// per-source sanitisation pass described in
    ///
    /// The document groups direction samples by *frame* (one timestamp, many
    /// nodes); this transposes that into one sorted keyframe trajectory per
    /// node id, which is the shape the direction engine and panners consume.
    /// `spectral_features` and `agent_state` nodes carry no direction and are
    /// dropped; `LFE` nodes need no `cart` and default to the front direction
    /// since the LFE router never reads it.
    pub fn load(source: &str) -> SpatialResult<Self> {
        let doc: SceneDoc = serde_json::from_str(source)?;
        if doc.sample_rate == 0 {
            return Err(SpatialError::InvalidScene("sampleRate must be > 0".into()));
        }

        let time_unit = doc.time_unit.unwrap_or(TimeUnit::Seconds);

        let mut docs_by_id: HashMap<String, Vec<KeyframeDoc>> = HashMap::new();
        let mut is_lfe_by_id: HashMap<String, bool> = HashMap::new();

        for frame in &doc.frames {
            for node in &frame.nodes {
                match node.kind.as_str() {
                    "audio_object" | "direct_speaker" | "LFE" => {}
                    _ => continue,
                }
                let lfe = is_lfe_node(&node.id, &node.kind);
                is_lfe_by_id.entry(node.id.clone()).or_insert(lfe);
                let [x, y, z] = node.cart.unwrap_or([0.0, 0.0, 0.0]);
                docs_by_id.entry(node.id.clone()).or_default().push(KeyframeDoc {
                    time: frame.time,
                    x,
                    y,
                    z,
                });
            }
        }

        let mut sources = HashMap::with_capacity(docs_by_id.len());
        for (id, kf_docs) in docs_by_id {
            let keyframes = sanitize_keyframes(&id, kf_docs, time_unit, doc.sample_rate);
            let is_lfe = is_lfe_by_id.get(&id).copied().unwrap_or(false);
            sources.insert(id.clone(), Source { id, keyframes, is_lfe });
        }

        Ok(Self {
            sample_rate_hz: doc.sample_rate,
            duration_sec: doc.duration,
            sources,
        })
    }

    pub fn source(&self, id: &str) -> Option<&Source> {
        self.sources.get(id)
    }

    /// True when `id` should route through the LFE path: the explicit tag,
    /// or the conventional id "LFE".
    pub fn is_lfe_source(&self, id: &str) -> bool {
        self.sources
            .get(id)
            .map(|s| s.is_lfe || s.id.eq_ignore_ascii_case("lfe"))
            .unwrap_or(false)
    }
}

/// Sort, dedupe, and drop invalid entries from one source's declared
/// keyframes, and §4.B.
fn sanitize_keyframes(
    source_id: &str,
    docs: Vec<KeyframeDoc>,
    time_unit: TimeUnit,
    sample_rate: u32,
) -> Vec<Keyframe> {
    let mut keyframes: Vec<Keyframe> = Vec::with_capacity(docs.len());

    for doc in docs {
        let time_sec = time_unit.to_seconds(doc.time, sample_rate);
        if !time_sec.is_finite() || !doc.x.is_finite() || !doc.y.is_finite() || !doc.z.is_finite() {
            warn!(
                "scene: source '{source_id}' dropped a non-finite keyframe at declared time {:?}",
                doc.time
            );
            continue;
        }

        let raw = Vec3::new(doc.x, doc.y, doc.z);
        let direction = raw.normalized().unwrap_or(Vec3::front());

        keyframes.push(Keyframe { time_sec, direction });
    }

    // Sort ascending by time; a stable sort preserves declaration order for
    // equal times so the "collapse to the latest-declared" pass below keeps
    // the last one seen in the input.
    keyframes.sort_by(|a, b| a.time_sec.partial_cmp(&b.time_sec).unwrap());

    let mut deduped: Vec<Keyframe> = Vec::with_capacity(keyframes.len());
    for kf in keyframes {
        match deduped.last_mut() {
            Some(last) if (last.time_sec - kf.time_sec).abs() < f64::EPSILON => {
                *last = kf;
            }
            _ => deduped.push(kf),
        }
    }

    deduped
}
