//! Shared error convention: each crate defines its own error enum (see
//! `rf-spatial::SpatialError`, `rf-offline::OfflineError`,
//! `rf-realtime::RealtimeError`) but all of them wrap this crate's IO error
//! the same way, so I/O failures read consistently across the workspace.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid parameter: {0}")]
    InvalidParam(String),
}

pub type CoreResult<T> = Result<T, CoreError>;
