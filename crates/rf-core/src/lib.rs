//! rf-core: shared primitives for the spatial rendering workspace.
//!
//! Sample/time types, the workspace error convention, and a handful of math
//! helpers reused by `rf-spatial`, `rf-offline` and `rf-realtime`.

mod error;
mod sample;
mod time;
mod vec3;
mod warn_once;

pub use error::{CoreError, CoreResult};
pub use sample::{lerp, linear_to_dbfs, peak, rms, Sample};
pub use time::TimeUnit;
pub use vec3::Vec3;
pub use warn_once::WarnOnce;
