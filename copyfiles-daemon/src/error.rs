use std::path::PathBuf;

use thiserror::Error;

/// Error surface for the daemon runtime and service registration.
#[derive(Debug, Error)]
pub enum DaemonError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("notify error: {0}")]
    Notify(#[from] notify::Error),

    #[error("failed to watch {path}: {source}")]
    Subscribe {
        path: PathBuf,
        #[source]
        source: notify::Error,
    },

    #[error("settings error: {0}")]
    Settings(#[from] copyfiles_core::SettingsError),

    #[error("{task} task join failure: {message}")]
    Join { task: &'static str, message: String },

    #[error("service manager error: {0}")]
    Service(String),
}

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> DaemonError {
    DaemonError::Io {
        path: path.into(),
        source,
    }
}
