use std::path::PathBuf;

use thiserror::Error;

use crate::sys::window_system::WindowId;

/// Errors raised by the zone core. None of these are fatal to the process:
/// the store recovers from corrupt data and drag failures cancel the snap.
#[derive(Debug, Error)]
pub enum ZoneError {
    #[error("layout data at {path:?} is corrupt: {reason}")]
    CorruptLayoutData { path: PathBuf, reason: String },
    #[error("index {index} is out of range for {len} entries")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("window {0} disappeared")]
    WindowGone(WindowId),
    #[error("window system rejected geometry for window {window}: {reason}")]
    GeometryApplyFailed { window: WindowId, reason: String },
    #[error("invalid zone {index} in layout {layout:?}: {reason}")]
    InvalidZone { layout: String, index: usize, reason: String },
    #[error("i/o error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ZoneError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ZoneError::Io { path: path.into(), source }
    }
}

pub type Result<T, E = ZoneError> = std::result::Result<T, E>;
