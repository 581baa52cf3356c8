//! Message router.
//!
//! Requests and responses are the JSON message protocol shared by every
//! client: the terminal UI, the CLI and the stdio bridge. Dispatch is keyed on
//! the [`Request`] variant; each variant has one [`Response`] shape.

use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::manager::{ProfileManager, ToggleStatus};
use super::prober::ProbeOutcome;
use crate::state::{ApplicationState, ProfileDraft};

/// Inbound request, tagged by `type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Request {
    ToggleProxy {
        #[serde(rename = "profileId")]
        profile_id: String,
    },
    SaveProfile {
        profile: ProfileDraft,
    },
    DeleteProfile {
        #[serde(rename = "profileId")]
        profile_id: String,
    },
    TestConnection,
    GetProxyData,
}

/// Result of `TEST_CONNECTION`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ConnectionReport {
    Connected { ping: u64 },
    Error { error: String },
}

impl From<ProbeOutcome> for ConnectionReport {
    fn from(outcome: ProbeOutcome) -> Self {
        match outcome {
            ProbeOutcome::Reachable { rtt_ms } => Self::Connected { ping: rtt_ms },
            ProbeOutcome::Unreachable { reason } => Self::Error { error: reason },
        }
    }
}

/// Reply to a [`Request`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Response {
    Toggled {
        status: ToggleStatus,
    },
    Saved {
        success: bool,
        #[serde(rename = "profileId")]
        profile_id: String,
    },
    Deleted {
        success: bool,
    },
    Connection(ConnectionReport),
    State(ApplicationState),
    Error {
        error: String,
    },
}

impl Response {
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            error: message.into(),
        }
    }

    /// Error text, if this is an error reply.
    pub fn error_message(&self) -> Option<&str> {
        match self {
            Self::Error { error } => Some(error),
            _ => None,
        }
    }
}

/// Unsolicited message pushed to every client.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Broadcast {
    ProxyDataUpdated { data: ApplicationState },
}

/// How a routed request completes.
pub enum Routed {
    /// Answered while the manager was borrowed.
    Done(Response),
    /// Needs network I/O; resolve off the worker so other requests proceed.
    Probe(Pin<Box<dyn Future<Output = Response> + Send>>),
}

/// Dispatches `request` against the manager.
pub async fn route(manager: &mut ProfileManager, request: Request) -> Routed {
    let response = match request {
        Request::ToggleProxy { profile_id } => match manager.toggle(&profile_id).await {
            Ok(status) => Response::Toggled { status },
            Err(e) => Response::error(e.to_string()),
        },
        Request::SaveProfile { profile } => match manager.save_profile(profile).await {
            Ok(profile_id) => Response::Saved {
                success: true,
                profile_id,
            },
            Err(e) => Response::error(e.to_string()),
        },
        Request::DeleteProfile { profile_id } => {
            manager.delete_profile(&profile_id).await;
            Response::Deleted { success: true }
        }
        Request::GetProxyData => Response::State(manager.state().clone()),
        Request::TestConnection => {
            let probe = manager.connection_test();
            return Routed::Probe(Box::pin(async move {
                Response::Connection(probe.await.into())
            }));
        }
    };
    Routed::Done(response)
}

/// A decoded bridge line: the caller's correlation id and the request.
#[derive(Debug)]
pub struct Envelope {
    pub id: Option<Value>,
    pub request: Result<Request, String>,
}

/// Decodes one JSON line. Malformed requests keep their id so the error can
/// be correlated.
pub fn decode(line: &str) -> Envelope {
    let mut value: Value = match serde_json::from_str(line) {
        Ok(value) => value,
        Err(e) => {
            return Envelope {
                id: None,
                request: Err(format!("invalid JSON: {e}")),
            }
        }
    };

    let Some(object) = value.as_object_mut() else {
        return Envelope {
            id: None,
            request: Err("request must be a JSON object".to_string()),
        };
    };
    let id = object.remove("id");
    let request = serde_json::from_value(value).map_err(|e| format!("invalid request: {e}"));
    Envelope { id, request }
}

/// Encodes a response line, echoing `id` when present.
pub fn encode(id: Option<Value>, response: &Response) -> String {
    let mut value = serde_json::to_value(response)
        .unwrap_or_else(|e| serde_json::json!({ "error": e.to_string() }));
    if let (Some(id), Some(object)) = (id, value.as_object_mut()) {
        object.insert("id".to_string(), id);
    }
    value.to_string()
}

/// Encodes a broadcast line.
pub fn encode_broadcast(state: ApplicationState) -> String {
    serde_json::to_string(&Broadcast::ProxyDataUpdated { data: state })
        .unwrap_or_else(|e| serde_json::json!({ "error": e.to_string() }).to_string())
}
