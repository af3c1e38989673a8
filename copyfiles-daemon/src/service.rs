//! Registration with the OS service manager.
//!
//! macOS uses a per-user launchd agent, Linux a systemd user unit. Both run
//! the binary from the directory `install` was called in, so the service
//! picks up `copyfiles_settings.json` from there unless an explicit
//! `--settings <path>` is written into the command line.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{io_err, DaemonError};
use crate::paths::{logs_dir, stderr_log_path, stdout_log_path};

/// Identity of the registered service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    /// Short machine name; the launchd label and systemd unit derive from it.
    pub name: String,
    pub display_name: String,
    pub description: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: "copyfiles".to_string(),
            display_name: "CopyFilesWinService".to_string(),
            description: "CopyFilesWinService.".to_string(),
        }
    }
}

impl ServiceConfig {
    pub fn launchd_label(&self) -> String {
        format!("dev.{}", self.name)
    }

    pub fn systemd_unit(&self) -> String {
        format!("{}.service", self.name)
    }
}

/// Generate a launchd agent plist.
pub fn generate_plist(
    config: &ServiceConfig,
    binary_path: &Path,
    settings: Option<&Path>,
    working_dir: &Path,
    log_dir: &Path,
) -> String {
    let settings_args = settings
        .map(|path| {
            format!(
                "\n    <string>--settings</string>\n    <string>{}</string>",
                xml_escape(&path.display().to_string())
            )
        })
        .unwrap_or_default();
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE plist PUBLIC "-//Apple//DTD PLIST 1.0//EN" "http://www.apple.com/DTDs/PropertyList-1.0.dtd">
<plist version="1.0">
<dict>
  <key>Label</key>
  <string>{label}</string>
  <key>ProgramArguments</key>
  <array>
    <string>{binary}</string>{settings_args}
  </array>
  <key>WorkingDirectory</key>
  <string>{working_dir}</string>
  <key>RunAtLoad</key>
  <true/>
  <key>KeepAlive</key>
  <true/>
  <key>StandardOutPath</key>
  <string>{stdout}</string>
  <key>StandardErrorPath</key>
  <string>{stderr}</string>
</dict>
</plist>
"#,
        label = xml_escape(&config.launchd_label()),
        binary = xml_escape(&binary_path.display().to_string()),
        working_dir = xml_escape(&working_dir.display().to_string()),
        stdout = xml_escape(&stdout_log_path(log_dir).display().to_string()),
        stderr = xml_escape(&stderr_log_path(log_dir).display().to_string()),
    )
}

/// Generate a systemd user unit. `%` is doubled everywhere so paths are not
/// read as specifiers; `ExecStart` arguments are quoted.
pub fn generate_unit(
    config: &ServiceConfig,
    binary_path: &Path,
    settings: Option<&Path>,
    working_dir: &Path,
    log_dir: &Path,
) -> String {
    let mut exec = exec_quote(&binary_path.display().to_string());
    if let Some(path) = settings {
        exec.push_str(" --settings ");
        exec.push_str(&exec_quote(&path.display().to_string()));
    }
    format!(
        r#"[Unit]
Description={display_name}: {description}

[Service]
Type=simple
ExecStart={exec}
WorkingDirectory={working_dir}
Restart=on-failure
StandardOutput=append:{stdout}
StandardError=append:{stderr}

[Install]
WantedBy=default.target
"#,
        display_name = unit_escape(&config.display_name),
        description = unit_escape(&config.description),
        working_dir = unit_escape(&working_dir.display().to_string()),
        stdout = unit_escape(&stdout_log_path(log_dir).display().to_string()),
        stderr = unit_escape(&stderr_log_path(log_dir).display().to_string()),
    )
}

/// Register the current executable with the platform service manager.
///
/// A relative `settings` path is resolved against the current directory
/// before it is written into the definition. Returns the path of the service
/// definition that was written.
pub fn install(
    home: &Path,
    config: &ServiceConfig,
    settings: Option<&Path>,
) -> Result<PathBuf, DaemonError> {
    let binary = std::env::current_exe().map_err(|e| io_err("current executable", e))?;
    let working_dir = std::env::current_dir().map_err(|e| io_err("current directory", e))?;
    let settings = settings.map(|path| working_dir.join(path));

    let definition =
        write_definition(home, config, &binary, settings.as_deref(), &working_dir)?;
    register(config, &definition)?;
    tracing::info!(
        service = %config.display_name,
        definition = %definition.display(),
        "service installed",
    );
    Ok(definition)
}

/// Stop and remove the service registration. Missing registrations are ignored.
pub fn uninstall(home: &Path, config: &ServiceConfig) -> Result<(), DaemonError> {
    let definition = definition_path(home, config)?;
    if definition.exists() {
        deregister(config, &definition);
        fs::remove_file(&definition).map_err(|e| io_err(&definition, e))?;
        tracing::info!(service = %config.display_name, "service uninstalled");
    }
    Ok(())
}

/// Write the platform service definition under `home`.
pub fn write_definition(
    home: &Path,
    config: &ServiceConfig,
    binary: &Path,
    settings: Option<&Path>,
    working_dir: &Path,
) -> Result<PathBuf, DaemonError> {
    let definition = definition_path(home, config)?;
    let logs = logs_dir(home);
    for dir in [definition.parent(), Some(logs.as_path())].into_iter().flatten() {
        if !dir.exists() {
            fs::create_dir_all(dir).map_err(|e| io_err(dir, e))?;
        }
    }

    let contents = if cfg!(target_os = "macos") {
        generate_plist(config, binary, settings, working_dir, &logs)
    } else {
        generate_unit(config, binary, settings, working_dir, &logs)
    };
    fs::write(&definition, contents).map_err(|e| io_err(&definition, e))?;
    Ok(definition)
}

#[cfg(target_os = "macos")]
fn definition_path(home: &Path, config: &ServiceConfig) -> Result<PathBuf, DaemonError> {
    Ok(crate::paths::launchd_plist_path(home, &config.launchd_label()))
}

#[cfg(target_os = "linux")]
fn definition_path(home: &Path, config: &ServiceConfig) -> Result<PathBuf, DaemonError> {
    Ok(crate::paths::systemd_unit_path(home, &config.systemd_unit()))
}

#[cfg(not(any(target_os = "macos", target_os = "linux")))]
fn definition_path(_home: &Path, _config: &ServiceConfig) -> Result<PathBuf, DaemonError> {
    Err(DaemonError::Service(
        "service registration is only supported on macOS and Linux".to_string(),
    ))
}

#[cfg(target_os = "macos")]
fn register(config: &ServiceConfig, definition: &Path) -> Result<(), DaemonError> {
    let domain = launchctl_domain()?;
    let service = format!("{domain}/{}", config.launchd_label());

    let _ = run_manager("launchctl", &["bootout", &service], true);
    run_manager(
        "launchctl",
        &["bootstrap", &domain, &definition.display().to_string()],
        false,
    )?;
    run_manager("launchctl", &["kickstart", "-k", &service], false)
}

#[cfg(target_os = "macos")]
fn deregister(config: &ServiceConfig, _definition: &Path) {
    if let Ok(domain) = launchctl_domain() {
        let service = format!("{domain}/{}", config.launchd_label());
        let _ = run_manager("launchctl", &["bootout", &service], true);
    }
}

#[cfg(target_os = "linux")]
fn register(config: &ServiceConfig, _definition: &Path) -> Result<(), DaemonError> {
    run_manager("systemctl", &["--user", "daemon-reload"], false)?;
    run_manager(
        "systemctl",
        &["--user", "enable", "--now", &config.systemd_unit()],
        false,
    )
}

#[cfg(target_os = "linux")]
fn deregister(config: &ServiceConfig, _definition: &Path) {
    let _ = run_manager(
        "systemctl",
        &["--user", "disable", "--now", &config.systemd_unit()],
        true,
    );
    let _ = run_manager("systemctl", &["--user", "daemon-reload"], true);
}

#[cfg(not(any(target_os = "macos", target_os = "linux")))]
fn register(_config: &ServiceConfig, _definition: &Path) -> Result<(), DaemonError> {
    Err(DaemonError::Service(
        "service registration is only supported on macOS and Linux".to_string(),
    ))
}

#[cfg(not(any(target_os = "macos", target_os = "linux")))]
fn deregister(_config: &ServiceConfig, _definition: &Path) {}

#[cfg(any(target_os = "macos", target_os = "linux"))]
fn run_manager(program: &str, args: &[&str], ignore_failure: bool) -> Result<(), DaemonError> {
    let output = std::process::Command::new(program)
        .args(args)
        .output()
        .map_err(|e| io_err(program, e))?;

    if output.status.success() || ignore_failure {
        return Ok(());
    }

    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
    let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
    Err(DaemonError::Service(format!(
        "{program} {} failed (status {}): {} {}",
        args.join(" "),
        output.status,
        stdout,
        stderr
    )))
}

#[cfg(target_os = "macos")]
fn launchctl_domain() -> Result<String, DaemonError> {
    let output = std::process::Command::new("id")
        .arg("-u")
        .output()
        .map_err(|e| io_err("id -u", e))?;
    if !output.status.success() {
        return Err(DaemonError::Service(format!(
            "failed to resolve current uid (status {})",
            output.status
        )));
    }

    let uid = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if uid.is_empty() {
        return Err(DaemonError::Service(
            "current uid from `id -u` was empty".to_string(),
        ));
    }
    Ok(format!("gui/{uid}"))
}

fn xml_escape(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

fn unit_escape(raw: &str) -> String {
    raw.replace('%', "%%")
}

fn exec_quote(raw: &str) -> String {
    let escaped = raw
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('$', "$$");
    format!("\"{}\"", unit_escape(&escaped))
}
