//! Driver Types
//!
//! Core types for the driver layer.

use async_trait::async_trait;
use sigpanel_common::{DriverRequest, OperationResult, SignatureRecord};
use thiserror::Error;

/// Failure of a driver call
///
/// Every backend failure is converted into one of these at the driver
/// boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DriverError {
    /// The backend was reachable but the operation failed
    #[error("signature operation failed")]
    Generic,
    /// The administrative channel could not be reached or opened
    #[error("could not connect to the administrative channel")]
    Connect,
}

impl From<DriverError> for OperationResult {
    fn from(err: DriverError) -> Self {
        match err {
            DriverError::Generic => OperationResult::GenericError,
            DriverError::Connect => OperationResult::ConnectError,
        }
    }
}

/// Driver result type
pub type DriverResult<T> = Result<T, DriverError>;

/// Failure to resolve a driver by name
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadError {
    #[error("no signature driver named '{0}'")]
    NotFound(String),
    #[error("broken signature driver '{name}': {reason}")]
    Broken { name: String, reason: String },
}

/// Backend driver contract
///
/// Both operations open a fresh backend session, authenticate as the
/// request's user and discard the session before returning.
#[async_trait]
pub trait Driver: Send + Sync {
    /// Registry name of the driver
    fn name(&self) -> &str;

    /// Fetch the signature of the request's account
    async fn load(&self, request: &DriverRequest) -> DriverResult<SignatureRecord>;

    /// Write the record carried by the request and commit it
    async fn save(&self, request: &DriverRequest) -> DriverResult<()>;
}
