//! copyfiles — copy every file written into a watched directory.
//!
//! # Usage
//!
//! ```text
//! copyfiles [--settings <path>]   run the watch loop (foreground or under a service manager)
//! copyfiles [--settings <path>] install
//!                                 register as a background service
//! copyfiles uninstall             remove the service registration
//! ```

mod commands;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use copyfiles_core::SETTINGS_FILE_NAME;
use copyfiles_daemon::{init_tracing, start_blocking};

#[derive(Parser, Debug)]
#[command(
    name = "copyfiles",
    version,
    about = "Copy files written into a watched directory to a destination directory",
    long_about = None,
)]
struct Cli {
    /// Settings file with `SourceDir` and `DestDir`.
    #[arg(long, default_value = SETTINGS_FILE_NAME)]
    settings: PathBuf,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Register copyfiles with the OS service manager (launchd or systemd).
    Install,

    /// Stop and remove the service registration.
    Uninstall,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing();

    match cli.command {
        None => start_blocking(&cli.settings).with_context(|| {
            format!(
                "copy service exited with error (settings: {})",
                cli.settings.display()
            )
        }),
        Some(Commands::Install) => commands::service::install(settings_override(&cli.settings)),
        Some(Commands::Uninstall) => commands::service::uninstall(),
    }
}

/// The settings path to bake into the service definition, if not the default.
fn settings_override(settings: &Path) -> Option<&Path> {
    (settings != Path::new(SETTINGS_FILE_NAME)).then_some(settings)
}
