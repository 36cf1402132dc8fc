//! rf-spatial: the spatial rendering core shared by the offline and
//! real-time drivers — layout, scene, direction interpolation, panners,
//! robustness, and LFE routing.

pub mod config;
pub mod direction;
pub mod error;
pub mod layout;
pub mod lfe;
pub mod panners;
pub mod remap;
pub mod robustness;
pub mod scene;
pub mod stats;

pub use config::{ElevationMode, PannerKind, RenderConfig, RenderResolution};
pub use error::{SpatialError, SpatialResult};
pub use layout::{Layout, Speaker, Subwoofer};
pub use remap::{ChannelRemap, RemapEntry};
pub use scene::{Keyframe, Scene, Source};
pub use stats::RenderStats;
