//! Host system-proxy backends.
//!
//! A [`ProxyBackend`] writes a [`ProxyConfig`] into whatever the host uses for
//! its proxy settings. Selection happens once at startup via [`select`].

mod env_file;
#[cfg(target_os = "linux")]
mod gsettings;
#[cfg(target_os = "macos")]
mod networksetup;

use std::path::Path;
use std::process::{Command, Stdio};
use std::sync::Arc;

use crate::config::AppConfig;
use crate::core::applier::ProxyConfig;

pub use env_file::EnvFileProxy;

/// Host API for the system proxy.
pub trait ProxyBackend: Send + Sync {
    fn name(&self) -> &str;
    /// Configures `config` as the single system proxy.
    fn set(&self, config: &ProxyConfig) -> Result<(), String>;
    /// Returns the system to a direct connection.
    fn clear(&self) -> Result<(), String>;
}

/// Picks the backend named by `proxy_backend` in the config.
///
/// `auto` prefers the platform backend when the desktop supports it and
/// falls back to the env file.
pub fn select(config: &AppConfig, config_dir: &Path) -> Arc<dyn ProxyBackend> {
    let env_file = || -> Arc<dyn ProxyBackend> { Arc::new(EnvFileProxy::in_dir(config_dir)) };

    match config.proxy_backend.trim().to_ascii_lowercase().as_str() {
        "env-file" | "env" => env_file(),
        #[cfg(target_os = "linux")]
        "gsettings" => Arc::new(gsettings::GnomeProxy),
        #[cfg(target_os = "macos")]
        "networksetup" => Arc::new(networksetup::NetworkSetupProxy::new(
            config.network_service.clone(),
        )),
        "auto" => detect(config).unwrap_or_else(|| {
            log::info!("[proxy] No desktop proxy backend detected, using env file");
            env_file()
        }),
        other => {
            log::warn!("[proxy] Unknown proxy backend '{other}', using env file");
            env_file()
        }
    }
}

#[cfg(target_os = "linux")]
fn detect(_config: &AppConfig) -> Option<Arc<dyn ProxyBackend>> {
    if gsettings::GnomeProxy::is_available() {
        log::info!("[proxy] Detected backend: GSettings (GNOME-based)");
        return Some(Arc::new(gsettings::GnomeProxy));
    }
    None
}

#[cfg(target_os = "macos")]
fn detect(config: &AppConfig) -> Option<Arc<dyn ProxyBackend>> {
    log::info!(
        "[proxy] Detected backend: networksetup ({})",
        config.network_service
    );
    Some(Arc::new(networksetup::NetworkSetupProxy::new(
        config.network_service.clone(),
    )))
}

#[cfg(not(any(target_os = "linux", target_os = "macos")))]
fn detect(_config: &AppConfig) -> Option<Arc<dyn ProxyBackend>> {
    None
}

/// Runs a command without a terminal, returning its stdout or a failure description.
#[cfg_attr(not(any(target_os = "linux", target_os = "macos")), allow(dead_code))]
pub(crate) fn run_command(program: &str, arguments: &[&str]) -> Result<String, String> {
    log::debug!("[cmd] {} {}", program, arguments.join(" "));
    let output = Command::new(program)
        .args(arguments)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .map_err(|e| format!("failed to run {program}: {e}"))?;

    if output.status.success() {
        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    } else {
        let stderr = String::from_utf8_lossy(&output.stderr);
        Err(format!(
            "{program} {} exited with {}: {}",
            arguments.first().unwrap_or(&""),
            output.status.code().unwrap_or(-1),
            stderr.trim()
        ))
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_env_file_explicitly() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig {
            proxy_backend: "env-file".to_string(),
            ..AppConfig::default()
        };
        assert_eq!(select(&config, dir.path()).name(), "env-file");
    }

    #[test]
    fn test_select_unknown_falls_back_to_env_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig {
            proxy_backend: "pac-script".to_string(),
            ..AppConfig::default()
        };
        assert_eq!(select(&config, dir.path()).name(), "env-file");
    }

    #[test]
    fn test_run_command_reports_missing_program() {
        let err = run_command("proxyflow-definitely-missing-binary", &["--help"]).unwrap_err();
        assert!(err.contains("failed to run"));
    }
}
