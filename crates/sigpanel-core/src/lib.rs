//! Sigpanel Core - signature drivers and the settings controller
//!
//! This crate provides the backend driver contract, the registry that
//! resolves a configured driver name to an implementation, the built-in
//! drivers, HTML body processing and the controller behind the settings
//! form.

pub mod controller;
pub mod driver;
pub mod html;
pub mod texts;

pub use controller::{
    DisplayOutcome, Notice, NoticeKind, SaveOutcome, SignatureController, SignatureForm,
    SignatureService,
};
pub use driver::{
    AdminChannel, AdminError, AdminSession, Driver, DriverError, DriverRegistry, DriverResult,
    HmailDriver, HttpAdminChannel, LoadError, MemoryDriver,
};
pub use html::{inline_images, sanitize_html, strip_tags, UploadStore, UploadedImage};
pub use texts::{Text, Texts};
