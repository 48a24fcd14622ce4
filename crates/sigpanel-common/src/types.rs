//! Common types for Sigpanel

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Signature state of one mail account
///
/// The mail server is the system of record; a record only lives for the
/// duration of a single load or save.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureRecord {
    pub enabled: bool,
    pub html: String,
    pub plaintext: String,
}

impl SignatureRecord {
    /// Create a new record
    pub fn new(enabled: bool, html: impl Into<String>, plaintext: impl Into<String>) -> Self {
        Self {
            enabled,
            html: html.into(),
            plaintext: plaintext.into(),
        }
    }
}

/// Outcome code of a driver call
///
/// The integer values are stable and part of the external interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum OperationResult {
    Success = 0,
    GenericError = 1,
    ConnectError = 2,
}

impl OperationResult {
    /// Numeric result code
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Parse a numeric result code
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::Success),
            1 => Some(Self::GenericError),
            2 => Some(Self::ConnectError),
            _ => None,
        }
    }

    pub fn is_success(self) -> bool {
        self == Self::Success
    }
}

/// Credentials of the authenticated session user
///
/// Owned by the host session and handed to the driver explicitly with
/// every request.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// What a driver request asks for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DriverAction {
    /// Read the current signature
    Load,
    /// Replace the signature with the given record
    Save(SignatureRecord),
}

impl DriverAction {
    pub fn name(&self) -> &'static str {
        match self {
            DriverAction::Load => "signature_load",
            DriverAction::Save(_) => "signature_save",
        }
    }
}

/// A single request to a backend driver
#[derive(Debug, Clone)]
pub struct DriverRequest {
    pub credentials: Credentials,
    pub action: DriverAction,
}

impl DriverRequest {
    /// Build a load request
    pub fn load(credentials: Credentials) -> Self {
        Self {
            credentials,
            action: DriverAction::Load,
        }
    }

    /// Build a save request
    pub fn save(credentials: Credentials, record: SignatureRecord) -> Self {
        Self {
            credentials,
            action: DriverAction::Save(record),
        }
    }
}

/// Failure to derive a mail identity from a username
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentityError {
    #[error("username is empty")]
    EmptyUsername,
    #[error("malformed address: {0}")]
    Malformed(String),
    #[error("username_domain is not defined")]
    MissingDefaultDomain,
}

/// Address-form identity of a mail account
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MailIdentity {
    pub local: String,
    pub domain: String,
}

impl MailIdentity {
    /// Create a new identity
    pub fn new(local: impl Into<String>, domain: impl Into<String>) -> Self {
        Self {
            local: local.into(),
            domain: domain.into(),
        }
    }

    /// Parse a full `local@domain` address
    pub fn parse(s: &str) -> Option<Self> {
        let (local, domain) = s.split_once('@')?;
        if local.is_empty() || domain.is_empty() || domain.contains('@') {
            return None;
        }
        Some(Self::new(local, domain))
    }

    /// Derive the identity used to authenticate against the mail server
    ///
    /// A username that already carries a domain is used as is. A bare
    /// username gets the configured default domain appended.
    pub fn resolve(username: &str, default_domain: Option<&str>) -> Result<Self, IdentityError> {
        let username = username.trim();
        if username.is_empty() {
            return Err(IdentityError::EmptyUsername);
        }

        if username.contains('@') {
            return Self::parse(username)
                .ok_or_else(|| IdentityError::Malformed(username.to_string()));
        }

        match default_domain.map(str::trim).filter(|d| !d.is_empty()) {
            Some(domain) => Ok(Self::new(username, domain.trim_start_matches('@'))),
            None => Err(IdentityError::MissingDefaultDomain),
        }
    }

    /// Full address
    pub fn address(&self) -> String {
        format!("{}@{}", self.local, self.domain)
    }
}

impl fmt::Display for MailIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.local, self.domain)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_result_codes_are_stable() {
        assert_eq!(OperationResult::Success.code(), 0);
        assert_eq!(OperationResult::GenericError.code(), 1);
        assert_eq!(OperationResult::ConnectError.code(), 2);
        assert_eq!(OperationResult::from_code(2), Some(OperationResult::ConnectError));
        assert_eq!(OperationResult::from_code(3), None);
    }

    #[test]
    fn test_bare_username_gets_default_domain() {
        let identity = MailIdentity::resolve("alice", Some("example.com")).unwrap();
        assert_eq!(identity.address(), "alice@example.com");
        assert_eq!(identity.domain, "example.com");
    }

    #[test]
    fn test_full_address_keeps_its_domain() {
        let identity = MailIdentity::resolve("bob@corp.test", Some("example.com")).unwrap();
        assert_eq!(identity.address(), "bob@corp.test");
        assert_eq!(identity.domain, "corp.test");
    }

    #[test]
    fn test_missing_default_domain() {
        assert_eq!(
            MailIdentity::resolve("alice", None),
            Err(IdentityError::MissingDefaultDomain)
        );
        assert_eq!(
            MailIdentity::resolve("alice", Some("  ")),
            Err(IdentityError::MissingDefaultDomain)
        );
    }

    #[test]
    fn test_malformed_addresses() {
        assert!(MailIdentity::resolve("alice@", Some("example.com")).is_err());
        assert!(MailIdentity::resolve("@example.com", None).is_err());
        assert!(MailIdentity::resolve("a@b@c", None).is_err());
        assert_eq!(MailIdentity::resolve("", None), Err(IdentityError::EmptyUsername));
    }

    #[test]
    fn test_credentials_debug_hides_password() {
        let creds = Credentials::new("alice", "hunter2");
        let debug = format!("{:?}", creds);
        assert!(debug.contains("alice"));
        assert!(!debug.contains("hunter2"));
    }
}
