//! Watch-event to file-copy pipeline.
//!
//! The pipeline owns the receiving ends of two streams fed by the directory
//! watcher: filesystem events and watcher errors. Each event is logged, write
//! events get an extra "modified file" record, and every path named by the
//! event is copied into the destination directory under its base name.
//!
//! Per-path failures (open, create, copy) are logged and never stop the loop.
//! The loop ends when either stream closes.

use std::fmt;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use notify::event::{AccessKind, AccessMode, ModifyKind};
use notify::{Event, EventKind};
use tokio::sync::mpsc::UnboundedReceiver;

use copyfiles_core::{CopyFilter, Settings};

use crate::error::DaemonError;

/// Step of a single copy that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Opening the source for reading.
    Open,
    /// Deriving the destination file name from the source path.
    Resolve,
    /// Creating or truncating the destination.
    Create,
    /// Streaming bytes from source to destination.
    Copy,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Stage::Open => "open",
            Stage::Resolve => "resolve",
            Stage::Create => "create",
            Stage::Copy => "copy",
        };
        f.write_str(label)
    }
}

/// Result of copying one source path into the destination directory.
#[derive(Debug)]
pub enum CopyOutcome {
    Copied {
        source: PathBuf,
        destination: PathBuf,
        bytes: u64,
    },
    /// `path` is the source for `Open`/`Resolve` and the destination for
    /// `Create`/`Copy`.
    Failed {
        stage: Stage,
        path: PathBuf,
        error: io::Error,
    },
}

/// One observable pipeline record.
#[derive(Debug, Clone, PartialEq)]
pub enum LogEntry {
    Event {
        kind: EventKind,
        paths: Vec<PathBuf>,
    },
    Modified {
        path: PathBuf,
    },
    Skipped {
        kind: EventKind,
        path: PathBuf,
    },
    Copied {
        source: PathBuf,
        destination: PathBuf,
        bytes: u64,
    },
    Error {
        stage: Stage,
        path: PathBuf,
        message: String,
    },
    WatchError {
        message: String,
    },
}

/// Sink for pipeline records, injected into [`CopyPipeline`].
pub trait PipelineLog: Send + Sync {
    fn record(&self, entry: LogEntry);
}

/// Production sink: forwards every record to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLog;

impl PipelineLog for TracingLog {
    fn record(&self, entry: LogEntry) {
        match entry {
            LogEntry::Event { kind, paths } => {
                tracing::info!(kind = ?kind, paths = ?paths, "event");
            }
            LogEntry::Modified { path } => {
                tracing::info!(path = %path.display(), "modified file");
            }
            LogEntry::Skipped { kind, path } => {
                tracing::debug!(kind = ?kind, path = %path.display(), "not a write, copy skipped");
            }
            LogEntry::Copied {
                source,
                destination,
                bytes,
            } => {
                tracing::info!(
                    source = %source.display(),
                    destination = %destination.display(),
                    bytes,
                    "copied file",
                );
            }
            LogEntry::Error {
                stage,
                path,
                message,
            } => {
                tracing::error!(stage = %stage, path = %path.display(), error = %message, "copy failed");
            }
            LogEntry::WatchError { message } => {
                tracing::error!(error = %message, "watcher error");
            }
        }
    }
}

impl From<CopyOutcome> for LogEntry {
    fn from(outcome: CopyOutcome) -> Self {
        match outcome {
            CopyOutcome::Copied {
                source,
                destination,
                bytes,
            } => LogEntry::Copied {
                source,
                destination,
                bytes,
            },
            CopyOutcome::Failed { stage, path, error } => LogEntry::Error {
                stage,
                path,
                message: error.to_string(),
            },
        }
    }
}

/// Consumes watcher streams and copies affected files into `dest_dir`.
pub struct CopyPipeline<L = TracingLog> {
    settings: Settings,
    log: L,
}

impl<L: PipelineLog> CopyPipeline<L> {
    pub fn new(settings: Settings, log: L) -> Self {
        Self { settings, log }
    }

    /// Process events until either stream is closed.
    ///
    /// Events are handled one at a time; the next event is not dequeued until
    /// every copy for the current one has finished.
    pub async fn run(
        self,
        mut events: UnboundedReceiver<Event>,
        mut errors: UnboundedReceiver<notify::Error>,
    ) -> Result<(), DaemonError> {
        loop {
            tokio::select! {
                event = events.recv() => {
                    let Some(event) = event else { break };
                    self.process(event).await?;
                }
                error = errors.recv() => {
                    let Some(error) = error else { break };
                    self.log.record(LogEntry::WatchError { message: error.to_string() });
                }
            }
        }
        tracing::debug!("watch streams closed, copy pipeline exiting");
        Ok(())
    }

    async fn process(&self, event: Event) -> Result<(), DaemonError> {
        self.log.record(LogEntry::Event {
            kind: event.kind,
            paths: event.paths.clone(),
        });

        let write = is_write(&event.kind);
        if write {
            for path in &event.paths {
                self.log.record(LogEntry::Modified { path: path.clone() });
            }
        }

        for source in event.paths {
            if !write && self.settings.copy_on == CopyFilter::Write {
                self.log.record(LogEntry::Skipped {
                    kind: event.kind,
                    path: source,
                });
                continue;
            }

            let dest_dir = self.settings.dest_dir.clone();
            let outcome = tokio::task::spawn_blocking(move || copy_into(&source, &dest_dir))
                .await
                .map_err(|err| DaemonError::Join {
                    task: "copy",
                    message: err.to_string(),
                })?;
            self.log.record(outcome.into());
        }
        Ok(())
    }
}

/// Content writes: in-place data changes and writers closing the file.
pub fn is_write(kind: &EventKind) -> bool {
    matches!(
        kind,
        EventKind::Modify(ModifyKind::Data(_))
            | EventKind::Modify(ModifyKind::Any)
            | EventKind::Access(AccessKind::Close(AccessMode::Write))
    )
}

/// Copy `source` to `dest_dir/<base name of source>`, truncating any existing
/// destination file. Both handles are closed before returning.
pub fn copy_into(source: &Path, dest_dir: &Path) -> CopyOutcome {
    let failed = |stage, path: &Path, error| CopyOutcome::Failed {
        stage,
        path: path.to_path_buf(),
        error,
    };

    let mut reader = match File::open(source) {
        Ok(file) => file,
        Err(err) => return failed(Stage::Open, source, err),
    };
    match reader.metadata() {
        Ok(meta) if meta.is_dir() => {
            return failed(Stage::Open, source, io::Error::other("source is a directory"));
        }
        Ok(_) => {}
        Err(err) => return failed(Stage::Open, source, err),
    }

    let Some(name) = source.file_name() else {
        return failed(
            Stage::Resolve,
            source,
            io::Error::new(io::ErrorKind::InvalidInput, "source path has no file name"),
        );
    };
    let destination = dest_dir.join(name);

    let mut writer = match File::create(&destination) {
        Ok(file) => file,
        Err(err) => return failed(Stage::Create, &destination, err),
    };

    match io::copy(&mut reader, &mut writer) {
        Ok(bytes) => CopyOutcome::Copied {
            source: source.to_path_buf(),
            destination,
            bytes,
        },
        Err(err) => failed(Stage::Copy, &destination, err),
    }
}
