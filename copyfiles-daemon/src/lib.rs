//! copyfiles daemon: directory watcher, copy pipeline and service host.

mod error;
pub mod paths;
pub mod pipeline;
mod runtime;
pub mod service;

pub use error::DaemonError;
pub use pipeline::{
    copy_into, CopyOutcome, CopyPipeline, LogEntry, PipelineLog, Stage, TracingLog,
};
pub use runtime::{init_tracing, run, start, start_blocking, subscribe, ServiceHandle};
pub use service::{install, uninstall, ServiceConfig};
