//! Error types for the real-time engine.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RealtimeError {
    #[error("audio device error: {0}")]
    Device(String),

    #[error("stream build error: {0}")]
    StreamBuild(String),

    #[error("stream error: {0}")]
    Stream(String),

    #[error("invalid source file: {0}")]
    InvalidSource(String),

    #[error("spatial core error: {0}")]
    Spatial(#[from] rf_spatial::SpatialError),
}

pub type RealtimeResult<T> = Result<T, RealtimeError>;
