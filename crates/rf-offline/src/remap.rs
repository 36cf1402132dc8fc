//! Output channel remap table.
//!
//! Shared with `rf-realtime` (the real-time callback applies the same
//! remap at step 8), so the type and parser live in `rf-spatial`; this
//! module just re-exports them for callers that already `use
//! rf_offline::remap::*`.

pub use rf_spatial::remap::{identity, parse, ChannelRemap, RemapEntry};
