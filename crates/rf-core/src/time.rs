//! Scene time-unit resolution.

use serde::{Deserialize, Serialize};

/// The time unit a scene document declares for its keyframe times.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeUnit {
    Seconds,
    Samples,
    Milliseconds,
}

impl Default for TimeUnit {
    fn default() -> Self {
        Self::Seconds
    }
}

impl TimeUnit {
    /// Resolve a raw time value (as declared in the scene document) to seconds.
    pub fn to_seconds(self, value: f64, sample_rate: u32) -> f64 {
        match self {
            TimeUnit::Seconds => value,
            TimeUnit::Samples => value / sample_rate as f64,
            TimeUnit::Milliseconds => value / 1000.0,
        }
    }
}
