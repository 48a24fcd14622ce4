//! Signature Drivers
//!
//! Backend drivers read and write the signature of the authenticated
//! user's mail account through the mail server's administrative
//! interface.

mod admin;
mod hmail;
mod memory;
mod registry;
mod types;

pub use admin::{AdminChannel, AdminError, AdminSession, HttpAdminChannel, RemoteSignature};
pub use hmail::HmailDriver;
pub use memory::{MemoryDriver, MemoryStore};
pub use registry::{DriverFactory, DriverRegistry};
pub use types::{Driver, DriverError, DriverResult, LoadError};
