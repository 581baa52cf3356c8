//! Application configuration management.
//!
//! Handles config directory resolution (CLI flag / env > XDG > default) and
//! loading `config.toml`. Every key is optional; missing keys use defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::constants;

/// User-configurable application settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    /// UI refresh rate in milliseconds.
    pub tick_rate: u64,
    /// Endpoint probed for connectivity.
    pub probe_url: String,
    /// Probe timeout in milliseconds.
    pub probe_timeout_ms: u64,
    /// Delay between activating a profile and probing it, in milliseconds.
    pub activation_probe_delay_ms: u64,
    /// Interval between health checks of a connected profile, in seconds.
    pub health_interval_secs: u64,
    /// System proxy backend: `auto`, `gsettings`, `networksetup` or `env-file`.
    pub proxy_backend: String,
    /// macOS network service configured by `networksetup`.
    pub network_service: String,
    /// Minimum log level (`"debug"`, `"info"`, `"warning"`, `"error"`).
    pub log_level: String,
    /// Maximum number of log entries kept for the activity panel.
    pub max_log_entries: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            tick_rate: constants::DEFAULT_TICK_RATE,
            probe_url: constants::DEFAULT_PROBE_URL.to_string(),
            probe_timeout_ms: constants::DEFAULT_PROBE_TIMEOUT_MS,
            activation_probe_delay_ms: constants::DEFAULT_ACTIVATION_PROBE_DELAY_MS,
            health_interval_secs: constants::DEFAULT_HEALTH_INTERVAL_SECS,
            proxy_backend: constants::DEFAULT_PROXY_BACKEND.to_string(),
            network_service: constants::DEFAULT_NETWORK_SERVICE.to_string(),
            log_level: constants::DEFAULT_LOG_LEVEL.to_string(),
            max_log_entries: constants::DEFAULT_MAX_LOG_ENTRIES,
        }
    }
}

/// Resolves the config directory path, creating it if needed.
///
/// Precedence: CLI flag / `PROXYFLOW_CONFIG_DIR` > `XDG_CONFIG_HOME` > `~/.config/proxyflow`.
///
/// # Errors
///
/// Returns an error if the home directory is unknown or the directory cannot be created.
pub fn resolve_config_dir(cli_override: Option<&PathBuf>) -> std::io::Result<PathBuf> {
    let path = match cli_override {
        // Relative paths are anchored to the working directory at startup.
        Some(dir) if dir.is_relative() => std::env::current_dir()?.join(dir),
        Some(dir) => dir.clone(),
        None => default_config_dir()?,
    };

    std::fs::create_dir_all(&path)?;
    std::fs::canonicalize(&path)
}

fn default_config_dir() -> std::io::Result<PathBuf> {
    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        let xdg_path = PathBuf::from(xdg);
        if xdg_path.is_absolute() {
            return Ok(xdg_path.join(constants::APP_NAME));
        }
    }

    let home = dirs::home_dir().ok_or_else(|| {
        std::io::Error::new(std::io::ErrorKind::NotFound, "Home directory not found")
    })?;
    Ok(home.join(".config").join(constants::APP_NAME))
}

/// Loads `AppConfig` from `config.toml` in the given directory.
///
/// Returns defaults if the file doesn't exist.
///
/// # Errors
///
/// Returns an error naming the file if it exists but cannot be read or parsed.
pub fn load_config(config_dir: &Path) -> Result<AppConfig, String> {
    let config_path = config_dir.join(constants::CONFIG_FILE_NAME);

    if !config_path.exists() {
        return Ok(AppConfig::default());
    }

    let content = std::fs::read_to_string(&config_path)
        .map_err(|e| format!("Failed to read {}: {e}", config_path.display()))?;

    toml::from_str(&content)
        .map_err(|e| format!("Invalid config at {}: {e}", config_path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(load_config(dir.path()).unwrap(), AppConfig::default());
    }

    #[test]
    fn test_partial_file_overrides_only_given_keys() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("config.toml"),
            "probe_timeout_ms = 2000\nproxy_backend = \"env-file\"\n",
        )
        .unwrap();

        let config = load_config(dir.path()).unwrap();
        assert_eq!(config.probe_timeout_ms, 2000);
        assert_eq!(config.proxy_backend, "env-file");
        assert_eq!(config.health_interval_secs, 30);
        assert_eq!(config.probe_url, "https://www.gstatic.com/generate_204");
    }

    #[test]
    fn test_unknown_key_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("config.toml"), "pac_url = \"x\"\n").unwrap();

        let err = load_config(dir.path()).unwrap_err();
        assert!(err.contains("config.toml"), "{err}");
    }

    #[test]
    fn test_cli_override_is_created_and_canonical() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("nested").join("proxyflow");

        let resolved = resolve_config_dir(Some(&target)).unwrap();
        assert!(resolved.is_dir());
        assert!(resolved.is_absolute());
        assert_eq!(resolved, std::fs::canonicalize(&target).unwrap());
    }
}
