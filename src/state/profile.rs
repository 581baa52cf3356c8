//! Proxy profile records and the editor draft they are validated from.

use std::fmt;
use std::num::NonZeroU16;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Validation failures for a profile draft. Shown to the user verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field is blank.
    #[error("Name, host and port are required")]
    MissingField(&'static str),
    /// The port is not an integer in `1..=65535`.
    #[error("invalid port")]
    InvalidPort,
}

/// TCP port of a proxy server, always in `1..=65535`.
///
/// Serialized as a decimal string (`"8080"`); accepts strings or numbers on input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Port(NonZeroU16);

impl Port {
    /// Parses a port from user input, trimming whitespace.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidPort`] for non-numeric input or values
    /// outside `1..=65535`.
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        input
            .trim()
            .parse::<u32>()
            .ok()
            .and_then(|n| u16::try_from(n).ok())
            .and_then(NonZeroU16::new)
            .map(Self)
            .ok_or(ValidationError::InvalidPort)
    }

    /// Returns the port number.
    pub fn get(self) -> u16 {
        self.0.get()
    }
}

impl fmt::Display for Port {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for Port {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Port {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = PortInput::deserialize(deserializer)?;
        Port::parse(&raw.as_text()).map_err(serde::de::Error::custom)
    }
}

/// Port as it arrives from a caller: free text or a JSON number.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum PortInput {
    /// Numeric form (`8080`).
    Number(i64),
    /// Text form (`"8080"`).
    Text(String),
}

impl PortInput {
    fn as_text(&self) -> String {
        match self {
            Self::Number(n) => n.to_string(),
            Self::Text(s) => s.clone(),
        }
    }
}

impl Default for PortInput {
    fn default() -> Self {
        Self::Text(String::new())
    }
}

/// A saved proxy endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxyProfile {
    /// Unique identifier, immutable once assigned.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Proxy host name or address.
    pub host: String,
    /// Proxy port.
    pub port: Port,
    /// Optional user name for proxy authentication.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// Optional password for proxy authentication.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

impl ProxyProfile {
    /// Returns `(username, password)` when both are present.
    pub fn credentials(&self) -> Option<(&str, &str)> {
        match (self.username.as_deref(), self.password.as_deref()) {
            (Some(user), Some(pass)) => Some((user, pass)),
            _ => None,
        }
    }

    /// One-line `host:port (user)` summary used by the list view and CLI.
    pub fn endpoint_summary(&self) -> String {
        match &self.username {
            Some(user) => format!("{}:{} ({user})", self.host, self.port),
            None => format!("{}:{}", self.host, self.port),
        }
    }
}

/// Unvalidated profile fields submitted by a UI view.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileDraft {
    /// Id of the profile being edited, absent for a new profile.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub host: String,
    #[serde(default)]
    pub port: PortInput,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

impl ProfileDraft {
    /// Validates the draft and builds a profile carrying `id`.
    ///
    /// Name and host are trimmed; blank credentials become `None`.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] if a required field is blank or the port
    /// is out of range.
    pub fn validate(&self, id: String) -> Result<ProxyProfile, ValidationError> {
        let name = self.name.trim();
        let host = self.host.trim();
        let port_text = self.port.as_text();

        if name.is_empty() {
            return Err(ValidationError::MissingField("name"));
        }
        if host.is_empty() {
            return Err(ValidationError::MissingField("host"));
        }
        if port_text.trim().is_empty() {
            return Err(ValidationError::MissingField("port"));
        }
        let port = Port::parse(&port_text)?;

        Ok(ProxyProfile {
            id,
            name: name.to_string(),
            host: host.to_string(),
            port,
            username: non_blank(self.username.as_deref()),
            password: non_blank(self.password.as_deref()),
        })
    }
}

impl From<&ProxyProfile> for ProfileDraft {
    fn from(profile: &ProxyProfile) -> Self {
        Self {
            id: Some(profile.id.clone()),
            name: profile.name.clone(),
            host: profile.host.clone(),
            port: PortInput::Text(profile.port.to_string()),
            username: profile.username.clone(),
            password: profile.password.clone(),
        }
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
