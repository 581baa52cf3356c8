//! UI state types.

use std::time::Instant;

use super::{Port, PortInput, ProfileDraft, ProxyProfile};
use crate::constants;

/// Currently focused panel of the list view.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum FocusedPanel {
    /// Profile list.
    #[default]
    Profiles,
    /// Activity log panel.
    Logs,
}

/// Field of the profile editor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum EditorField {
    #[default]
    Name,
    Host,
    Port,
    Username,
    Password,
}

impl EditorField {
    pub const ALL: [Self; 5] = [
        Self::Name,
        Self::Host,
        Self::Port,
        Self::Username,
        Self::Password,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            Self::Name => "Profile name",
            Self::Host => "Host",
            Self::Port => "Port",
            Self::Username => "Username (optional)",
            Self::Password => "Password (optional)",
        }
    }

    pub const fn is_secret(self) -> bool {
        matches!(self, Self::Password)
    }

    #[must_use]
    pub const fn next(self) -> Self {
        match self {
            Self::Name => Self::Host,
            Self::Host => Self::Port,
            Self::Port => Self::Username,
            Self::Username => Self::Password,
            Self::Password => Self::Name,
        }
    }

    #[must_use]
    pub const fn previous(self) -> Self {
        match self {
            Self::Name => Self::Password,
            Self::Host => Self::Name,
            Self::Port => Self::Host,
            Self::Username => Self::Port,
            Self::Password => Self::Username,
        }
    }
}

/// Profile editor form.
///
/// Field errors mirror the worker's validation; they show once a field was
/// edited or a save was attempted.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct EditorForm {
    /// Id of the profile being edited, `None` for a new profile.
    pub id: Option<String>,
    pub name: String,
    pub host: String,
    pub port: String,
    pub username: String,
    pub password: String,
    pub focused: EditorField,
    /// Fields the user has typed into.
    pub touched: Vec<EditorField>,
    /// Set by the first save attempt.
    pub submitted: bool,
    /// Save request in flight.
    pub saving: bool,
}

impl EditorForm {
    /// Form pre-filled from a saved profile.
    pub fn from_profile(profile: &ProxyProfile) -> Self {
        Self {
            id: Some(profile.id.clone()),
            name: profile.name.clone(),
            host: profile.host.clone(),
            port: profile.port.to_string(),
            username: profile.username.clone().unwrap_or_default(),
            password: profile.password.clone().unwrap_or_default(),
            ..Self::default()
        }
    }

    pub fn value(&self, field: EditorField) -> &str {
        match field {
            EditorField::Name => &self.name,
            EditorField::Host => &self.host,
            EditorField::Port => &self.port,
            EditorField::Username => &self.username,
            EditorField::Password => &self.password,
        }
    }

    fn value_mut(&mut self, field: EditorField) -> &mut String {
        match field {
            EditorField::Name => &mut self.name,
            EditorField::Host => &mut self.host,
            EditorField::Port => &mut self.port,
            EditorField::Username => &mut self.username,
            EditorField::Password => &mut self.password,
        }
    }

    pub fn push_char(&mut self, c: char) {
        let field = self.focused;
        self.value_mut(field).push(c);
        self.touch(field);
    }

    pub fn pop_char(&mut self) {
        let field = self.focused;
        self.value_mut(field).pop();
        self.touch(field);
    }

    fn touch(&mut self, field: EditorField) {
        if !self.touched.contains(&field) {
            self.touched.push(field);
        }
    }

    /// Validation message for `field`, regardless of whether it is shown.
    pub fn field_error(&self, field: EditorField) -> Option<&'static str> {
        match field {
            EditorField::Name if self.name.trim().is_empty() => {
                Some(constants::MSG_NAME_REQUIRED)
            }
            EditorField::Host if self.host.trim().is_empty() => {
                Some(constants::MSG_HOST_REQUIRED)
            }
            EditorField::Port if Port::parse(&self.port).is_err() => {
                Some(constants::MSG_PORT_INVALID)
            }
            _ => None,
        }
    }

    /// Validation message for `field` if it should be displayed.
    pub fn visible_error(&self, field: EditorField) -> Option<&'static str> {
        if self.submitted || self.touched.contains(&field) {
            self.field_error(field)
        } else {
            None
        }
    }

    pub fn is_valid(&self) -> bool {
        EditorField::ALL
            .iter()
            .all(|field| self.field_error(*field).is_none())
    }

    /// Trimmed draft sent with `SAVE_PROFILE`.
    pub fn to_draft(&self) -> ProfileDraft {
        ProfileDraft {
            id: self.id.clone(),
            name: self.name.trim().to_string(),
            host: self.host.trim().to_string(),
            port: PortInput::Text(self.port.trim().to_string()),
            username: Some(self.username.trim().to_string()),
            password: Some(self.password.trim().to_string()),
        }
    }
}

/// Current input mode determining keyboard behavior.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub enum InputMode {
    /// Profile list navigation.
    #[default]
    Normal,
    /// Profile editor view.
    Editor(EditorForm),
    /// Delete confirmation dialog.
    ConfirmDelete {
        /// Id of the profile to delete.
        id: String,
        /// Name shown in the dialog.
        name: String,
    },
}

/// Types of toast notifications for color coding.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ToastType {
    #[default]
    Info,
    Success,
    Error,
}

/// Toast notification for temporary messages.
#[derive(Clone, Debug)]
pub struct Toast {
    pub message: String,
    #[allow(clippy::struct_field_names)]
    pub toast_type: ToastType,
    /// When the toast should disappear.
    pub expires: Instant,
}

impl Toast {
    pub fn new(message: impl Into<String>, toast_type: ToastType) -> Self {
        Self {
            message: message.into(),
            toast_type,
            expires: Instant::now() + constants::TOAST_DURATION,
        }
    }

    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.expires
    }
}
