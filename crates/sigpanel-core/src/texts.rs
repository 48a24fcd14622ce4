//! User-facing texts
//!
//! English defaults for every message the settings panel shows, with
//! per-key overrides from the configuration.

use serde::Serialize;
use std::collections::HashMap;

/// Message ids of the settings panel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Text {
    Signature,
    ChangeSignature,
    Enabled,
    PlaintextSignature,
    HtmlSignature,
    Save,
    SuccessfullyUpdated,
    LoadError,
    LoadConnectError,
    UpdateError,
    UpdateConnectError,
    InternalError,
    Username,
    Password,
    Login,
    Logout,
}

impl Text {
    pub const ALL: [Text; 16] = [
        Text::Signature,
        Text::ChangeSignature,
        Text::Enabled,
        Text::PlaintextSignature,
        Text::HtmlSignature,
        Text::Save,
        Text::SuccessfullyUpdated,
        Text::LoadError,
        Text::LoadConnectError,
        Text::UpdateError,
        Text::UpdateConnectError,
        Text::InternalError,
        Text::Username,
        Text::Password,
        Text::Login,
        Text::Logout,
    ];

    /// Configuration and template key
    pub fn key(self) -> &'static str {
        match self {
            Text::Signature => "signature",
            Text::ChangeSignature => "changesignature",
            Text::Enabled => "enabled",
            Text::PlaintextSignature => "plaintextsignature",
            Text::HtmlSignature => "htmlsignature",
            Text::Save => "save",
            Text::SuccessfullyUpdated => "successfullyupdated",
            Text::LoadError => "loaderror",
            Text::LoadConnectError => "loadconnecterror",
            Text::UpdateError => "updateerror",
            Text::UpdateConnectError => "updateconnecterror",
            Text::InternalError => "internalerror",
            Text::Username => "username",
            Text::Password => "password",
            Text::Login => "login",
            Text::Logout => "logout",
        }
    }

    fn default_text(self) -> &'static str {
        match self {
            Text::Signature => "Signature",
            Text::ChangeSignature => "Change signature",
            Text::Enabled => "Enabled",
            Text::PlaintextSignature => "Plain text signature",
            Text::HtmlSignature => "HTML signature",
            Text::Save => "Save",
            Text::SuccessfullyUpdated => "Signature successfully updated.",
            Text::LoadError => "Could not load the signature.",
            Text::LoadConnectError => {
                "Could not load the signature: the mail server is not reachable."
            }
            Text::UpdateError => "Could not save the signature.",
            Text::UpdateConnectError => {
                "Could not save the signature: the mail server is not reachable."
            }
            Text::InternalError => "Internal error. Please contact your administrator.",
            Text::Username => "Username",
            Text::Password => "Password",
            Text::Login => "Log in",
            Text::Logout => "Log out",
        }
    }
}

/// Text catalogue with configured overrides
#[derive(Debug, Clone, Default)]
pub struct Texts {
    overrides: HashMap<String, String>,
}

impl Texts {
    /// Create a catalogue; unknown override keys are ignored
    pub fn new(overrides: HashMap<String, String>) -> Self {
        let known: Vec<&str> = Text::ALL.iter().map(|t| t.key()).collect();
        for key in overrides.keys() {
            if !known.contains(&key.as_str()) {
                tracing::warn!("Ignoring override for unknown text '{}'", key);
            }
        }
        Self { overrides }
    }

    /// Text for a message id
    pub fn get(&self, text: Text) -> &str {
        self.overrides
            .get(text.key())
            .map(String::as_str)
            .unwrap_or_else(|| text.default_text())
    }

    /// All texts keyed by message id, for templates
    pub fn labels(&self) -> HashMap<&'static str, &str> {
        Text::ALL.iter().map(|&t| (t.key(), self.get(t))).collect()
    }
}
