//! In-memory driver
//!
//! Keeps signatures in process memory, keyed by the lowercased account
//! address. Useful for development setups without a mail server.

use super::types::{Driver, DriverError, DriverResult};
use async_trait::async_trait;
use sigpanel_common::config::MemorySettings;
use sigpanel_common::{DriverAction, DriverRequest, MailIdentity, SignatureRecord};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, error};

/// Shared signature storage of the in-memory driver
#[derive(Debug, Default)]
pub struct MemoryStore {
    signatures: RwLock<HashMap<String, SignatureRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stored record of an account, if any
    pub async fn get(&self, address: &str) -> Option<SignatureRecord> {
        self.signatures.read().await.get(address).cloned()
    }

    async fn put(&self, address: String, record: SignatureRecord) {
        self.signatures.write().await.insert(address, record);
    }
}

/// In-memory driver
pub struct MemoryDriver {
    store: Arc<MemoryStore>,
    username_domain: Option<String>,
    require_password: Option<String>,
    accounts: HashSet<String>,
}

impl MemoryDriver {
    pub const NAME: &'static str = "memory";

    /// Create a driver over a shared store
    pub fn new(
        store: Arc<MemoryStore>,
        username_domain: Option<String>,
        settings: &MemorySettings,
    ) -> Self {
        Self {
            store,
            username_domain,
            require_password: settings.require_password.clone().filter(|p| !p.is_empty()),
            accounts: settings
                .accounts
                .iter()
                .map(|a| a.trim().to_lowercase())
                .collect(),
        }
    }

    fn account_key(identity: &MailIdentity) -> String {
        identity.address().to_lowercase()
    }

    fn authenticate(&self, request: &DriverRequest) -> DriverResult<MailIdentity> {
        let identity = MailIdentity::resolve(
            &request.credentials.username,
            self.username_domain.as_deref(),
        )
        .map_err(|e| {
            error!(target: "sigpanel::driver", "memory driver: {}", e);
            DriverError::Generic
        })?;

        if let Some(ref expected) = self.require_password {
            if &request.credentials.password != expected {
                error!(target: "sigpanel::driver", "memory driver: authentication failed for {}", identity);
                return Err(DriverError::Generic);
            }
        }

        if !self.accounts.is_empty() && !self.accounts.contains(&Self::account_key(&identity)) {
            error!(target: "sigpanel::driver", "memory driver: unknown account {}", identity);
            return Err(DriverError::Generic);
        }

        Ok(identity)
    }
}

#[async_trait]
impl Driver for MemoryDriver {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn load(&self, request: &DriverRequest) -> DriverResult<SignatureRecord> {
        let DriverAction::Load = request.action else {
            return Err(DriverError::Generic);
        };

        let identity = self.authenticate(request)?;
        let record = self.store.get(&Self::account_key(&identity)).await.unwrap_or_default();
        debug!("Loaded signature for {} from memory", identity);
        Ok(record)
    }

    async fn save(&self, request: &DriverRequest) -> DriverResult<()> {
        let DriverAction::Save(ref record) = request.action else {
            return Err(DriverError::Generic);
        };

        let identity = self.authenticate(request)?;
        self.store.put(Self::account_key(&identity), record.clone()).await;
        debug!("Stored signature for {} in memory", identity);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use sigpanel_common::Credentials;

    fn driver(settings: MemorySettings) -> MemoryDriver {
        MemoryDriver::new(
            Arc::new(MemoryStore::new()),
            Some("example.com".to_string()),
            &settings,
        )
    }

    #[tokio::test]
    async fn test_save_then_load_round_trip() {
        let driver = driver(MemorySettings::default());
        let creds = Credentials::new("alice", "pw");
        let record = SignatureRecord::new(true, "<p>hi</p>", "hi");

        driver
            .save(&DriverRequest::save(creds.clone(), record.clone()))
            .await
            .unwrap();
        let loaded = driver.load(&DriverRequest::load(creds)).await.unwrap();

        assert_eq!(loaded, record);
    }

    #[tokio::test]
    async fn test_records_are_per_account() {
        let driver = driver(MemorySettings::default());
        let record = SignatureRecord::new(true, "", "alice");

        driver
            .save(&DriverRequest::save(Credentials::new("alice", "pw"), record))
            .await
            .unwrap();
        let bob = driver
            .load(&DriverRequest::load(Credentials::new("bob@example.com", "pw")))
            .await
            .unwrap();

        assert_eq!(bob, SignatureRecord::default());
    }

    #[tokio::test]
    async fn test_address_case_shares_one_record() {
        let driver = driver(MemorySettings {
            require_password: None,
            accounts: vec!["Alice@Example.com".to_string()],
        });
        let record = SignatureRecord::new(true, "", "regards");

        driver
            .save(&DriverRequest::save(Credentials::new("Alice", "pw"), record.clone()))
            .await
            .unwrap();
        let loaded = driver
            .load(&DriverRequest::load(Credentials::new("alice@example.com", "pw")))
            .await
            .unwrap();

        assert_eq!(loaded, record);
    }

    #[tokio::test]
    async fn test_unknown_account_is_generic_error() {
        let driver = driver(MemorySettings {
            require_password: None,
            accounts: vec!["alice@example.com".to_string()],
        });

        let result = driver
            .load(&DriverRequest::load(Credentials::new("mallory", "pw")))
            .await;
        assert_eq!(result, Err(DriverError::Generic));
    }

    #[tokio::test]
    async fn test_wrong_password_is_generic_error() {
        let driver = driver(MemorySettings {
            require_password: Some("letmein".to_string()),
            accounts: Vec::new(),
        });

        let result = driver
            .load(&DriverRequest::load(Credentials::new("alice", "nope")))
            .await;
        assert_eq!(result, Err(DriverError::Generic));
    }
}
