//! The persisted application state and its connection status machine.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::profile::ProxyProfile;

/// Connection status of the active profile.
///
/// `Disconnected` iff no profile is active; the other states only occur while
/// a profile is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    /// No profile is active.
    #[default]
    Disconnected,
    /// A profile was applied and its connectivity probe is pending.
    Connecting,
    /// The last probe through the active profile succeeded.
    Connected,
    /// The activation probe through the active profile failed.
    Error,
}

impl ConnectionStatus {
    /// Status text shown by the list view.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Disconnected => "Disconnected",
            Self::Connecting => "Connecting...",
            Self::Connected => "Connected",
            Self::Error => "Connection failed",
        }
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Error => "error",
        };
        f.write_str(text)
    }
}

/// Singleton state persisted under the storage key.
///
/// Missing fields deserialize from the defaults, which makes loading a
/// merge of the stored record over [`ApplicationState::default`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ApplicationState {
    /// Profiles in insertion order.
    pub profiles: Vec<ProxyProfile>,
    /// Id of the profile currently applied to the system proxy.
    pub active_profile_id: Option<String>,
    /// Status of the active profile.
    pub connection_status: ConnectionStatus,
    /// Round-trip time of the last successful probe, only while connected.
    #[serde(alias = "lastPing")]
    pub last_ping_ms: Option<u64>,
}

impl ApplicationState {
    /// Looks up a profile by id.
    pub fn profile(&self, id: &str) -> Option<&ProxyProfile> {
        self.profiles.iter().find(|p| p.id == id)
    }

    /// Returns the active profile, if any.
    pub fn active_profile(&self) -> Option<&ProxyProfile> {
        self.active_profile_id
            .as_deref()
            .and_then(|id| self.profile(id))
    }

    /// Whether `id` is the active profile.
    pub fn is_active(&self, id: &str) -> bool {
        self.active_profile_id.as_deref() == Some(id)
    }

    /// Marks `id` active with status `connecting`.
    pub fn activate(&mut self, id: &str) {
        self.active_profile_id = Some(id.to_string());
        self.connection_status = ConnectionStatus::Connecting;
        self.last_ping_ms = None;
    }

    /// Clears the active profile, its status and its ping in one step.
    pub fn deactivate(&mut self) {
        self.active_profile_id = None;
        self.connection_status = ConnectionStatus::Disconnected;
        self.last_ping_ms = None;
    }

    /// Records a successful probe.
    pub fn mark_connected(&mut self, rtt_ms: u64) {
        self.connection_status = ConnectionStatus::Connected;
        self.last_ping_ms = Some(rtt_ms);
    }

    /// Records a failed activation probe.
    pub fn mark_error(&mut self) {
        self.connection_status = ConnectionStatus::Error;
        self.last_ping_ms = None;
    }

    /// Repairs invariant violations in a state read from storage.
    ///
    /// Returns a description of every repair made; empty when the state was
    /// already consistent.
    pub fn repair(&mut self) -> Vec<String> {
        let mut repairs = Vec::new();

        let mut seen = HashSet::new();
        let before = self.profiles.len();
        self.profiles.retain(|p| seen.insert(p.id.clone()));
        if self.profiles.len() != before {
            repairs.push(format!(
                "dropped {} profile(s) with duplicate ids",
                before - self.profiles.len()
            ));
        }

        for profile in &mut self.profiles {
            if profile.username.as_deref().is_some_and(str::is_empty) {
                profile.username = None;
            }
            if profile.password.as_deref().is_some_and(str::is_empty) {
                profile.password = None;
            }
        }

        if let Some(id) = self.active_profile_id.clone() {
            if self.profile(&id).is_none() {
                repairs.push(format!("active profile '{id}' no longer exists"));
                self.deactivate();
            } else if self.connection_status == ConnectionStatus::Disconnected {
                repairs.push(format!("active profile '{id}' had no status"));
                self.connection_status = ConnectionStatus::Connecting;
            }
        } else if self.connection_status != ConnectionStatus::Disconnected {
            repairs.push(format!(
                "status '{}' without an active profile",
                self.connection_status
            ));
            self.deactivate();
        }

        if self.last_ping_ms.is_some() && self.connection_status != ConnectionStatus::Connected {
            repairs.push("ping recorded while not connected".to_string());
            self.last_ping_ms = None;
        }

        repairs
    }
}
