//! Domain state types for proxyflow.
//!
//! - `profile`: proxy profile records, ports and editor drafts
//! - `app_state`: the persisted application state and connection status
//! - `ui`: terminal UI state like focus, input mode, editor form and toasts

mod app_state;
mod profile;
mod ui;

pub use app_state::{ApplicationState, ConnectionStatus};
pub use profile::{Port, PortInput, ProfileDraft, ProxyProfile, ValidationError};
pub use ui::{EditorField, EditorForm, FocusedPanel, InputMode, Toast, ToastType};
