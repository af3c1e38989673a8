//! `copyfiles install|uninstall` — OS service registration.

use std::path::Path;

use anyhow::{Context, Result};

use copyfiles_daemon::{install as install_service, uninstall as uninstall_service, ServiceConfig};

/// Install failures are logged, not returned: the process exits normally.
///
/// `settings` is written into the service command line; `None` leaves the
/// service reading `copyfiles_settings.json` from the install directory.
pub fn install(settings: Option<&Path>) -> Result<()> {
    let home = dirs::home_dir().context("could not determine home directory")?;
    let config = ServiceConfig::default();

    match install_service(&home, &config, settings) {
        Ok(path) => println!("installed {} service: {}", config.display_name, path.display()),
        Err(err) => tracing::error!(error = %err, "service install failed"),
    }
    Ok(())
}

pub fn uninstall() -> Result<()> {
    let home = dirs::home_dir().context("could not determine home directory")?;
    let config = ServiceConfig::default();

    uninstall_service(&home, &config).context("failed to uninstall service")?;
    println!("uninstalled {} service", config.display_name);
    Ok(())
}
