//! Signature Controller
//!
//! Drives the two flows of the settings form: showing the current
//! signature, and saving a submitted one. A controller lives for one
//! request and resolves its driver at most once.

use crate::driver::{Driver, DriverError, DriverRegistry, LoadError};
use crate::html::{inline_images, sanitize_html, UploadStore};
use crate::texts::{Text, Texts};
use serde::{Deserialize, Serialize};
use sigpanel_common::config::SignatureSettings;
use sigpanel_common::{Credentials, DriverRequest, OperationResult, SignatureRecord};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Shared state behind every controller
pub struct SignatureService {
    registry: DriverRegistry,
    settings: SignatureSettings,
    texts: Texts,
}

impl SignatureService {
    pub fn new(registry: DriverRegistry, settings: SignatureSettings, texts: Texts) -> Self {
        Self {
            registry,
            settings,
            texts,
        }
    }

    pub fn settings(&self) -> &SignatureSettings {
        &self.settings
    }

    pub fn texts(&self) -> &Texts {
        &self.texts
    }

    pub fn registry(&self) -> &DriverRegistry {
        &self.registry
    }

    /// Controller for a single request
    pub fn controller(&self) -> SignatureController<'_> {
        SignatureController {
            service: self,
            driver: None,
        }
    }
}

/// Fields posted by the settings form
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SignatureForm {
    #[serde(rename = "_enabled", default)]
    pub enabled: Option<String>,
    #[serde(rename = "_html", default)]
    pub html: String,
    #[serde(rename = "_plaintext", default)]
    pub plaintext: String,
}

impl SignatureForm {
    /// Convert into a record; an absent or empty checkbox means disabled
    pub fn into_record(self) -> SignatureRecord {
        SignatureRecord {
            enabled: self.enabled.is_some_and(|v| !v.is_empty()),
            html: self.html,
            plaintext: self.plaintext,
        }
    }
}

/// Kind of message shown to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeKind {
    Confirmation,
    Error,
}

/// Message shown to the user
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub kind: NoticeKind,
    pub text: String,
}

impl Notice {
    fn confirmation(text: &str) -> Self {
        Self {
            kind: NoticeKind::Confirmation,
            text: text.to_string(),
        }
    }

    fn error(text: &str) -> Self {
        Self {
            kind: NoticeKind::Error,
            text: text.to_string(),
        }
    }
}

/// Result of the display flow
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisplayOutcome {
    /// Render the form pre-filled with the record
    Form(SignatureRecord),
    /// The signature could not be loaded
    Unavailable(Notice),
}

/// Result of the save flow
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveOutcome {
    /// Driver result; `None` when no driver could be resolved
    pub result: Option<OperationResult>,
    pub notice: Notice,
    /// Fresh display of the signature after the save attempt
    pub display: DisplayOutcome,
}

/// Per-request controller
pub struct SignatureController<'a> {
    service: &'a SignatureService,
    driver: Option<Result<Arc<dyn Driver>, LoadError>>,
}

impl SignatureController<'_> {
    fn driver(&mut self) -> Result<Arc<dyn Driver>, LoadError> {
        let service = self.service;
        self.driver
            .get_or_insert_with(|| {
                service
                    .registry
                    .resolve(&service.settings.driver, &service.settings)
            })
            .clone()
    }

    /// Load the current signature for display
    pub async fn display(&mut self, credentials: &Credentials) -> DisplayOutcome {
        let service = self.service;
        let texts = &service.texts;

        let driver = match self.driver() {
            Ok(driver) => driver,
            Err(_) => return DisplayOutcome::Unavailable(Notice::error(texts.get(Text::InternalError))),
        };

        match driver.load(&DriverRequest::load(credentials.clone())).await {
            Ok(record) => DisplayOutcome::Form(record),
            Err(DriverError::Connect) => {
                DisplayOutcome::Unavailable(Notice::error(texts.get(Text::LoadConnectError)))
            }
            Err(DriverError::Generic) => {
                DisplayOutcome::Unavailable(Notice::error(texts.get(Text::LoadError)))
            }
        }
    }

    /// Turn a submitted form into the record handed to the driver
    ///
    /// A non-empty HTML body gets uploaded images inlined and is then
    /// sanitized; an empty one passes through untouched.
    pub fn prepare_record(&self, form: SignatureForm, uploads: &UploadStore) -> SignatureRecord {
        let mut record = form.into_record();

        if !record.html.is_empty() {
            let inlined = inline_images(&record.html, uploads, self.service.settings.max_image_size);
            record.html = sanitize_html(&inlined);
        }

        record
    }

    /// Save a submitted signature, then load it again for display
    pub async fn save(
        &mut self,
        credentials: &Credentials,
        form: SignatureForm,
        uploads: &UploadStore,
    ) -> SaveOutcome {
        let record = self.prepare_record(form, uploads);

        let result = match self.driver() {
            Ok(driver) => {
                let request = DriverRequest::save(credentials.clone(), record);
                Some(match driver.save(&request).await {
                    Ok(()) => OperationResult::Success,
                    Err(e) => OperationResult::from(e),
                })
            }
            Err(_) => None,
        };

        let service = self.service;
        let texts = &service.texts;
        let notice = match result {
            Some(OperationResult::Success) => {
                info!("Signature updated for {}", credentials.username);
                Notice::confirmation(texts.get(Text::SuccessfullyUpdated))
            }
            Some(OperationResult::ConnectError) => {
                warn!("Signature update for {} failed to connect", credentials.username);
                Notice::error(texts.get(Text::UpdateConnectError))
            }
            Some(OperationResult::GenericError) => {
                warn!("Signature update for {} failed", credentials.username);
                Notice::error(texts.get(Text::UpdateError))
            }
            None => Notice::error(texts.get(Text::InternalError)),
        };

        debug!("Reloading signature after save attempt");
        let display = self.display(credentials).await;

        SaveOutcome {
            result,
            notice,
            display,
        }
    }
}
