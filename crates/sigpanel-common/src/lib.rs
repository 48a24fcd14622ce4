//! Sigpanel Common - Shared types and configuration
//!
//! This crate provides the signature data model, configuration and the
//! error type shared by the driver layer and the web panel.

pub mod config;
pub mod error;
pub mod types;

pub use config::{Config, SignatureSettings};
pub use error::{Error, Result};
pub use types::{
    Credentials, DriverAction, DriverRequest, IdentityError, MailIdentity, OperationResult,
    SignatureRecord,
};
