//! Error types for spatial rendering.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SpatialError {
    #[error("invalid layout: {0}")]
    InvalidLayout(String),

    #[error("invalid scene: {0}")]
    InvalidScene(String),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type SpatialResult<T> = Result<T, SpatialError>;
