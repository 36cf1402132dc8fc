//! rf-realtime: the streaming subsystem and real-time render driver.

pub mod control;
pub mod device;
pub mod engine;
pub mod error;
pub mod stats;
pub mod streaming;

pub use control::{AtomicControls, ControlSnapshot, SmoothedControls};
pub use engine::RealtimeEngine;
pub use error::{RealtimeError, RealtimeResult};
pub use stats::EngineStats;
pub use streaming::{adm_channel_index, load_adm_channels, AudioSource};
