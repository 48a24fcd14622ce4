//! hMailServer driver
//!
//! Reads and writes the `SignatureEnabled`, `SignatureHTML` and
//! `SignaturePlainText` fields of the user's hMailServer account through
//! the administrative channel.

use super::admin::{AdminChannel, AdminError, AdminSession, HttpAdminChannel};
use super::types::{Driver, DriverError, DriverResult, LoadError};
use crate::html::strip_tags;
use async_trait::async_trait;
use sigpanel_common::config::SignatureSettings;
use sigpanel_common::{DriverAction, DriverRequest, MailIdentity, SignatureRecord};
use std::sync::Arc;
use tracing::{debug, error};

const LOG_PREFIX: &str = "hmail driver";

/// hMailServer driver
pub struct HmailDriver {
    channel: Arc<dyn AdminChannel>,
    username_domain: Option<String>,
}

impl HmailDriver {
    pub const NAME: &'static str = "hmail";

    /// Create a driver on top of an administrative channel
    pub fn new(channel: Arc<dyn AdminChannel>, username_domain: Option<String>) -> Self {
        Self {
            channel,
            username_domain,
        }
    }

    /// Create a driver talking HTTP to the configured administration bridge
    pub fn from_settings(settings: &SignatureSettings) -> Result<Self, LoadError> {
        let channel = HttpAdminChannel::from_settings(settings).map_err(|e| LoadError::Broken {
            name: Self::NAME.to_string(),
            reason: e.to_string(),
        })?;

        Ok(Self::new(
            Arc::new(channel),
            settings.username_domain.clone(),
        ))
    }

    async fn handle(&self, request: &DriverRequest) -> DriverResult<Option<SignatureRecord>> {
        let mut session = self.channel.open().await.map_err(|e| {
            log_failure(&e, "This problem is often caused by the administrative channel not being reachable or its permissions not being set.");
            DriverError::Connect
        })?;

        let result = self.run(session.as_mut(), request).await;
        session.close().await;
        result
    }

    async fn run(
        &self,
        session: &mut dyn AdminSession,
        request: &DriverRequest,
    ) -> DriverResult<Option<SignatureRecord>> {
        let identity = MailIdentity::resolve(
            &request.credentials.username,
            self.username_domain.as_deref(),
        )
        .map_err(|e| {
            error!(target: "sigpanel::driver", "{}: {}", LOG_PREFIX, e);
            DriverError::Generic
        })?;
        let address = identity.address();

        session
            .authenticate(&address, &request.credentials.password)
            .await
            .map_err(|e| match e {
                AdminError::Unreachable(_) | AdminError::InvalidEndpoint(_) => {
                    log_failure(&e, "This problem is often caused by the administrative channel not being reachable or its permissions not being set.");
                    DriverError::Connect
                }
                _ => {
                    log_failure(&e, "This problem is often caused by Authenticate permissions.");
                    DriverError::Generic
                }
            })?;

        debug!("Authenticated {} on the administrative channel", address);

        let outcome = match &request.action {
            DriverAction::Load => session
                .get_account_signature(&identity.domain, &address)
                .await
                .map(|remote| Some(remote.into_record())),
            DriverAction::Save(record) => session
                .set_account_signature(&identity.domain, &address, record)
                .await
                .map(|()| None),
        };

        outcome.map_err(|e| {
            log_failure(&e, "This problem is often caused by Authenticate permissions.");
            match e {
                AdminError::Unreachable(_) => DriverError::Connect,
                _ => DriverError::Generic,
            }
        })
    }
}

fn log_failure(err: &AdminError, hint: &str) {
    error!(target: "sigpanel::driver", "{}: {}", LOG_PREFIX, strip_tags(&err.to_string()));
    error!(target: "sigpanel::driver", "{}: {}", LOG_PREFIX, hint);
}

#[async_trait]
impl Driver for HmailDriver {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn load(&self, request: &DriverRequest) -> DriverResult<SignatureRecord> {
        if !matches!(request.action, DriverAction::Load) {
            error!(target: "sigpanel::driver", "{}: load called with action {}", LOG_PREFIX, request.action.name());
            return Err(DriverError::Generic);
        }

        self.handle(request).await?.ok_or(DriverError::Generic)
    }

    async fn save(&self, request: &DriverRequest) -> DriverResult<()> {
        if !matches!(request.action, DriverAction::Save(_)) {
            error!(target: "sigpanel::driver", "{}: save called with action {}", LOG_PREFIX, request.action.name());
            return Err(DriverError::Generic);
        }

        self.handle(request).await.map(|_| ())
    }
}
