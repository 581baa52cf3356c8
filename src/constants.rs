//! Application-wide constants and configuration defaults.
//!
//! This module defines the static values used throughout proxyflow,
//! including timing intervals, the probe endpoint, storage keys and UI messages.

use std::time::Duration;

// === Application Metadata ===

/// Application name used in logging and directories.
pub const APP_NAME: &str = "proxyflow";
/// Current application version from Cargo.toml.
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

// === Timing Configuration ===

/// UI refresh rate in milliseconds.
pub const DEFAULT_TICK_RATE: u64 = 250;
/// Connectivity probe timeout in milliseconds.
pub const DEFAULT_PROBE_TIMEOUT_MS: u64 = 5000;
/// Delay between a successful activation and its connectivity probe.
pub const DEFAULT_ACTIVATION_PROBE_DELAY_MS: u64 = 1500;
/// Interval between health checks of the active profile, in seconds.
pub const DEFAULT_HEALTH_INTERVAL_SECS: u64 = 30;
/// How long a toast stays on screen.
pub const TOAST_DURATION: Duration = Duration::from_secs(3);

// === Storage ===

/// Storage key holding the persisted application state.
pub const PROXY_STORAGE_KEY: &str = "proxyFlowData";
/// File backing the key-value storage inside the config directory.
pub const STORAGE_FILE_NAME: &str = "storage.json";
/// User configuration file inside the config directory.
pub const CONFIG_FILE_NAME: &str = "config.toml";
/// Log mirror file inside the config directory.
pub const LOG_FILE_NAME: &str = "proxyflow.log";
/// Shell-sourceable proxy environment written by the env-file backend.
pub const PROXY_ENV_FILE_NAME: &str = "proxy.env";
/// Environment variable overriding the config directory.
pub const CONFIG_DIR_ENV: &str = "PROXYFLOW_CONFIG_DIR";

// === Proxy ===

/// Endpoint used for connectivity probes (empty 204 response).
pub const DEFAULT_PROBE_URL: &str = "https://www.gstatic.com/generate_204";
/// Scheme of the configured upstream proxy.
pub const PROXY_SCHEME: &str = "http";
/// Bypass marker for local and loopback addresses.
pub const BYPASS_LOCAL: &str = "<local>";
/// Hosts the `<local>` marker expands to for backends without native support.
pub const LOCAL_BYPASS_HOSTS: &[&str] = &["localhost", "127.0.0.0/8", "::1"];
/// Default proxy backend selection.
pub const DEFAULT_PROXY_BACKEND: &str = "auto";
/// Default macOS network service for `networksetup`.
pub const DEFAULT_NETWORK_SERVICE: &str = "Wi-Fi";

// === Logging ===

/// Default minimum log level.
pub const DEFAULT_LOG_LEVEL: &str = "info";
/// Default number of log entries kept in memory.
pub const DEFAULT_MAX_LOG_ENTRIES: usize = 1000;

// === User-facing Messages ===

/// Returned when a profile cannot be activated.
pub const MSG_ACTIVATION_FAILED: &str = "Failed to connect. Check proxy settings.";
/// Returned when the system proxy cannot be cleared.
pub const MSG_DEACTIVATION_FAILED: &str = "Failed to disconnect proxy";
/// Returned when a request references an unknown profile.
pub const MSG_PROFILE_NOT_FOUND: &str = "Profile not found";
/// Returned when the worker task is gone.
pub const MSG_WORKER_UNAVAILABLE: &str = "Background worker is not running";
/// Placeholder for a missing latency value.
pub const MSG_NO_PING: &str = "- ms";
/// Editor: blank profile name.
pub const MSG_NAME_REQUIRED: &str = "Name is required";
/// Editor: blank host.
pub const MSG_HOST_REQUIRED: &str = "Host is required";
/// Editor: port outside 1-65535 or not a number.
pub const MSG_PORT_INVALID: &str = "Port must be between 1 and 65535";
/// Global toggle with nothing to toggle.
pub const MSG_SELECT_PROFILE: &str = "Please select a profile first";
