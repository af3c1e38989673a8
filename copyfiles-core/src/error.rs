//! Error types for copyfiles-core.

use std::path::PathBuf;

use thiserror::Error;

/// Failures while loading the settings file. Every variant is fatal to the
/// service: there is no defaulting and no partial recovery.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// The settings file could not be read (missing, permission denied, ...).
    #[error("failed to read settings at {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid JSON or does not match the settings schema.
    #[error("failed to parse settings at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}
