use std::path::{Path, PathBuf};

use notify::{recommended_watcher, Event, RecursiveMode, Watcher};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use copyfiles_core::Settings;

use crate::error::{io_err, DaemonError};
use crate::pipeline::{CopyPipeline, TracingLog};

/// Running background task started by [`start`].
pub struct ServiceHandle {
    task: JoinHandle<Result<(), DaemonError>>,
    /// Resolves (sent or dropped) once the copy pipeline task has ended.
    pipeline_done: oneshot::Receiver<()>,
}

impl ServiceHandle {
    /// Cancel the background task. Dropping it releases the watcher, which
    /// closes both streams; returns once the copy pipeline has drained and
    /// exited, so no copy happens after this resolves.
    pub async fn stop(self) -> Result<(), DaemonError> {
        self.task.abort();
        let result = match self.task.await {
            Err(err) if err.is_cancelled() => Ok(()),
            result => handle_join("service", result),
        };
        let _ = self.pipeline_done.await;
        tracing::info!("service stopped");
        result
    }

    /// Wait for the background task to finish. In normal operation it never
    /// does; setup failures are returned here.
    pub async fn wait(self) -> Result<(), DaemonError> {
        handle_join("service", self.task.await)
    }
}

/// Service start hook: spawn the background task and return immediately.
///
/// Must be called from within a tokio runtime.
pub fn start(settings_path: PathBuf) -> ServiceHandle {
    let (done_tx, pipeline_done) = oneshot::channel();
    ServiceHandle {
        task: tokio::spawn(background(settings_path, done_tx)),
        pipeline_done,
    }
}

/// Run the service until it fails or ctrl-c is received.
pub async fn run(settings_path: PathBuf) -> Result<(), DaemonError> {
    let mut handle = start(settings_path);

    let result = tokio::select! {
        result = &mut handle.task => handle_join("service", result),
        signal = tokio::signal::ctrl_c() => {
            match signal {
                Ok(()) => {
                    tracing::info!("received ctrl-c, shutting down");
                    handle.stop().await
                }
                Err(err) => Err(io_err("ctrl-c handler", err)),
            }
        }
    };

    if let Err(err) = &result {
        tracing::error!(error = %err, "service stopped");
    }
    result
}

/// Build a runtime and block the current thread on [`run`].
pub fn start_blocking(settings_path: &Path) -> Result<(), DaemonError> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| io_err("tokio-runtime", e))?;
    runtime.block_on(run(settings_path.to_path_buf()))
}

/// Register `source_dir` with the watcher, non-recursively.
pub fn subscribe<W: Watcher>(watcher: &mut W, source_dir: &Path) -> Result<(), DaemonError> {
    watcher
        .watch(source_dir, RecursiveMode::NonRecursive)
        .map_err(|source| DaemonError::Subscribe {
            path: source_dir.to_path_buf(),
            source,
        })?;
    tracing::info!(path = %source_dir.display(), "watching directory");
    Ok(())
}

async fn background(
    settings_path: PathBuf,
    done_tx: oneshot::Sender<()>,
) -> Result<(), DaemonError> {
    let settings = Settings::load(&settings_path)?;
    tracing::info!(
        settings = %settings_path.display(),
        source = %settings.source_dir.display(),
        destination = %settings.dest_dir.display(),
        copy_on = %settings.copy_on,
        "settings loaded",
    );

    let (event_tx, event_rx) = mpsc::unbounded_channel::<Event>();
    let (error_tx, error_rx) = mpsc::unbounded_channel::<notify::Error>();
    let mut watcher = recommended_watcher(move |res: notify::Result<Event>| {
        match res {
            Ok(event) => {
                let _ = event_tx.send(event);
            }
            Err(err) => {
                let _ = error_tx.send(err);
            }
        }
    })?;

    let source_dir = settings.source_dir.clone();
    let pipeline = CopyPipeline::new(settings, TracingLog);
    let pipeline_handle = tokio::spawn(async move {
        let result = pipeline.run(event_rx, error_rx).await;
        let _ = done_tx.send(());
        result
    });

    if let Err(err) = subscribe(&mut watcher, &source_dir) {
        pipeline_handle.abort();
        return Err(err);
    }

    // The watcher owns both senders; the pipeline only ends once it is dropped.
    let result = pipeline_handle.await;
    drop(watcher);
    handle_join("copy_pipeline", result)
}

fn handle_join(
    task: &'static str,
    result: Result<Result<(), DaemonError>, tokio::task::JoinError>,
) -> Result<(), DaemonError> {
    match result {
        Ok(inner) => inner,
        Err(err) => Err(DaemonError::Join {
            task,
            message: err.to_string(),
        }),
    }
}

/// Install the global `tracing` subscriber. `RUST_LOG` sets the filter
/// (default `info`); `COPYFILES_LOG_FORMAT=json` switches to JSON lines.
pub fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("COPYFILES_LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);
    if json {
        let _ = fmt()
            .json()
            .with_env_filter(filter)
            .with_target(false)
            .try_init();
    } else {
        let _ = fmt().with_env_filter(filter).with_target(false).try_init();
    }
}
