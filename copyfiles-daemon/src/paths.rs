use std::path::{Path, PathBuf};

pub const SERVICE_STDOUT_LOG: &str = "service.log";
pub const SERVICE_STDERR_LOG: &str = "service-err.log";

pub fn copyfiles_root(home: &Path) -> PathBuf {
    home.join(".copyfiles")
}

pub fn logs_dir(home: &Path) -> PathBuf {
    copyfiles_root(home).join("logs")
}

pub fn stdout_log_path(log_dir: &Path) -> PathBuf {
    log_dir.join(SERVICE_STDOUT_LOG)
}

pub fn stderr_log_path(log_dir: &Path) -> PathBuf {
    log_dir.join(SERVICE_STDERR_LOG)
}

pub fn launch_agents_dir(home: &Path) -> PathBuf {
    home.join("Library").join("LaunchAgents")
}

pub fn launchd_plist_path(home: &Path, label: &str) -> PathBuf {
    launch_agents_dir(home).join(format!("{label}.plist"))
}

pub fn systemd_user_dir(home: &Path) -> PathBuf {
    home.join(".config").join("systemd").join("user")
}

pub fn systemd_unit_path(home: &Path, unit: &str) -> PathBuf {
    systemd_user_dir(home).join(unit)
}
