//! Error types for battlog
//!
//! Library code returns `BattlogError`; the binaries wrap it in `anyhow` with
//! context at the call site.

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, BattlogError>;

#[derive(Error, Debug)]
pub enum BattlogError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config {path}: {message}")]
    ConfigParse { path: PathBuf, message: String },

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("CSV header in {path} is missing column '{column}'")]
    CsvHeader { path: PathBuf, column: &'static str },

    #[error("No battery found under {0}")]
    BatteryNotFound(PathBuf),

    #[error("Lock {path} is held by pid {pid}")]
    LockHeld { path: PathBuf, pid: u32 },
}

impl BattlogError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        BattlogError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Chart could not be drawn on the given surface
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderError {
    #[error("Needs more space ({width}x{height})")]
    NeedsMoreSpace { width: u16, height: u16 },
}
