//! Error types for the offline render driver.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum OfflineError {
    #[error("invalid render config: {0}")]
    InvalidConfig(String),

    #[error("failed to write output file: {0}")]
    WriteError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("spatial core error: {0}")]
    Spatial(#[from] rf_spatial::SpatialError),
}

pub type OfflineResult<T> = Result<T, OfflineError>;
