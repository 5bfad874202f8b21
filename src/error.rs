//! ### Error
//! Startup failures while building the base tables. Anything that goes
//! wrong after load is handled in place by the selection reducer.

use std::path::{Path, PathBuf};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// Input file missing, unreadable, or holding values we can't use.
    #[error("failed to load {}: {reason}", .path.display())]
    DataLoad { path: PathBuf, reason: String },

    /// An expected column or region key is absent.
    #[error("schema error: {0}")]
    Schema(String),
}

/// A load region and a boundary that fail to join on name. Reported as a
/// warning, never returned as an error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JoinMismatch {
    #[error("region {0:?} has load data but no boundary geometry")]
    MissingGeometry(String),

    #[error("boundary {0:?} has no matching load region")]
    MissingLoad(String),
}

impl Error {
    pub fn data_load(path: &Path, reason: impl Into<String>) -> Self {
        Error::DataLoad {
            path: path.to_path_buf(),
            reason: reason.into(),
        }
    }

    /// Same as `data_load` but prefixes the 1-based CSV line.
    pub fn at_line(path: &Path, line: usize, reason: impl std::fmt::Display) -> Self {
        Self::data_load(path, format!("line {line}: {reason}"))
    }
}
