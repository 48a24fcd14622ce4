//! Administrative channel client
//!
//! Narrow interface to the mail server's administration bridge. The
//! hMailServer driver only ever talks to an [`AdminChannel`]; the HTTP
//! transport below is the one used in production.
//!
//! Bridge protocol:
//! - `POST {base}/session` with `{address, password}` returns `{token}`
//! - `GET {base}/domains/{domain}/accounts/{address}/signature`
//! - `PUT {base}/domains/{domain}/accounts/{address}/signature`
//! - `DELETE {base}/session` releases the session

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode, Url};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sigpanel_common::config::SignatureSettings;
use sigpanel_common::SignatureRecord;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

/// Administrative channel errors
#[derive(Debug, Error)]
pub enum AdminError {
    #[error("administrative endpoint is not usable: {0}")]
    InvalidEndpoint(String),
    #[error("administrative channel unreachable: {0}")]
    Unreachable(String),
    #[error("authentication rejected: {0}")]
    Unauthorized(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("request rejected with status {status}: {message}")]
    Rejected { status: u16, message: String },
    #[error("malformed response: {0}")]
    Protocol(String),
}

/// Opens sessions on the administrative channel
#[async_trait]
pub trait AdminChannel: Send + Sync {
    /// Open a fresh, unauthenticated session
    async fn open(&self) -> Result<Box<dyn AdminSession>, AdminError>;
}

/// One session on the administrative channel
#[async_trait]
pub trait AdminSession: Send + Sync {
    /// Authenticate as the given mail account
    async fn authenticate(&mut self, address: &str, password: &str) -> Result<(), AdminError>;

    /// Read the signature fields of an account
    async fn get_account_signature(
        &self,
        domain: &str,
        address: &str,
    ) -> Result<RemoteSignature, AdminError>;

    /// Write the signature fields of an account and commit them
    async fn set_account_signature(
        &self,
        domain: &str,
        address: &str,
        record: &SignatureRecord,
    ) -> Result<(), AdminError>;

    /// Release the session
    async fn close(self: Box<Self>);
}

/// Signature fields as stored on the mail server
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RemoteSignature {
    #[serde(default)]
    pub enabled: Option<Value>,
    #[serde(default)]
    pub html: Option<String>,
    #[serde(default)]
    pub plaintext: Option<String>,
}

impl RemoteSignature {
    /// Convert into a record
    ///
    /// A missing, null or otherwise falsy `enabled` value means the
    /// signature is disabled.
    pub fn into_record(self) -> SignatureRecord {
        SignatureRecord {
            enabled: self.enabled.as_ref().map(is_truthy).unwrap_or(false),
            html: self.html.unwrap_or_default(),
            plaintext: self.plaintext.unwrap_or_default(),
        }
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
        Value::String(s) => !(s.is_empty() || s == "0"),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

#[derive(Debug, Serialize)]
struct SessionRequest<'a> {
    address: &'a str,
    password: &'a str,
}

#[derive(Debug, Deserialize)]
struct SessionResponse {
    token: String,
}

#[derive(Debug, Serialize)]
struct SignatureUpdate<'a> {
    enabled: bool,
    html: &'a str,
    plaintext: &'a str,
}

/// HTTP transport for the administration bridge
pub struct HttpAdminChannel {
    client: Client,
    endpoint: Result<Url, String>,
}

impl HttpAdminChannel {
    /// Create a channel from the signature settings
    ///
    /// An unusable endpoint (remote mode without a host, unparsable URL)
    /// does not fail construction; it surfaces as
    /// [`AdminError::InvalidEndpoint`] when a session is opened.
    pub fn from_settings(settings: &SignatureSettings) -> Result<Self, AdminError> {
        let client = Client::builder()
            .timeout(Duration::from_millis(settings.hmail.timeout_ms))
            .build()
            .map_err(|e| AdminError::InvalidEndpoint(format!("HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: endpoint_url(settings),
        })
    }

    /// Create a channel for a fixed base URL
    pub fn with_base_url(base_url: &str, timeout: Duration) -> Result<Self, AdminError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AdminError::InvalidEndpoint(format!("HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: Url::parse(base_url).map_err(|e| format!("{}: {}", base_url, e)),
        })
    }

    /// Base URL of the bridge, if usable
    pub fn endpoint(&self) -> Option<&Url> {
        self.endpoint.as_ref().ok()
    }
}

fn endpoint_url(settings: &SignatureSettings) -> Result<Url, String> {
    let host = if settings.remote_admin {
        settings
            .remote_server
            .as_deref()
            .map(str::trim)
            .filter(|h| !h.is_empty())
            .ok_or_else(|| "remote administration enabled but remote_server is not set".to_string())?
    } else {
        "127.0.0.1"
    };

    let base_path = settings.hmail.base_path.trim_matches('/');
    let raw = format!(
        "{}://{}:{}/{}",
        settings.hmail.scheme, host, settings.hmail.port, base_path
    );
    Url::parse(&raw).map_err(|e| format!("{}: {}", raw, e))
}

#[async_trait]
impl AdminChannel for HttpAdminChannel {
    async fn open(&self) -> Result<Box<dyn AdminSession>, AdminError> {
        let base = self
            .endpoint
            .clone()
            .map_err(AdminError::InvalidEndpoint)?;

        if base.cannot_be_a_base() {
            return Err(AdminError::InvalidEndpoint(base.to_string()));
        }

        debug!("Opening administrative session at {}", base);

        Ok(Box::new(HttpAdminSession {
            client: self.client.clone(),
            base,
            token: None,
        }))
    }
}

struct HttpAdminSession {
    client: Client,
    base: Url,
    token: Option<String>,
}

impl HttpAdminSession {
    fn url(&self, segments: &[&str]) -> Result<Url, AdminError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| AdminError::InvalidEndpoint(self.base.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn signature_url(&self, domain: &str, address: &str) -> Result<Url, AdminError> {
        self.url(&["domains", domain, "accounts", address, "signature"])
    }

    fn token(&self) -> Result<&str, AdminError> {
        self.token
            .as_deref()
            .ok_or_else(|| AdminError::Unauthorized("session is not authenticated".to_string()))
    }
}

fn transport_error(err: reqwest::Error) -> AdminError {
    warn!("Administrative bridge request failed: {}", err);
    AdminError::Unreachable(err.to_string())
}

async fn check_status(response: Response, what: &str) -> Result<Response, AdminError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => AdminError::Unauthorized(body),
        StatusCode::NOT_FOUND => AdminError::NotFound(what.to_string()),
        _ => AdminError::Rejected {
            status: status.as_u16(),
            message: body,
        },
    })
}

#[async_trait]
impl AdminSession for HttpAdminSession {
    async fn authenticate(&mut self, address: &str, password: &str) -> Result<(), AdminError> {
        let url = self.url(&["session"])?;

        let response = self
            .client
            .post(url)
            .json(&SessionRequest { address, password })
            .send()
            .await
            .map_err(transport_error)?;

        let response = check_status(response, "session").await?;
        let session: SessionResponse = response
            .json()
            .await
            .map_err(|e| AdminError::Protocol(format!("session response: {}", e)))?;

        self.token = Some(session.token);
        Ok(())
    }

    async fn get_account_signature(
        &self,
        domain: &str,
        address: &str,
    ) -> Result<RemoteSignature, AdminError> {
        let url = self.signature_url(domain, address)?;

        let response = self
            .client
            .get(url)
            .bearer_auth(self.token()?)
            .send()
            .await
            .map_err(transport_error)?;

        let response = check_status(response, &format!("account {}", address)).await?;
        response
            .json()
            .await
            .map_err(|e| AdminError::Protocol(format!("signature response: {}", e)))
    }

    async fn set_account_signature(
        &self,
        domain: &str,
        address: &str,
        record: &SignatureRecord,
    ) -> Result<(), AdminError> {
        let url = self.signature_url(domain, address)?;

        let response = self
            .client
            .put(url)
            .bearer_auth(self.token()?)
            .json(&SignatureUpdate {
                enabled: record.enabled,
                html: &record.html,
                plaintext: &record.plaintext,
            })
            .send()
            .await
            .map_err(transport_error)?;

        check_status(response, &format!("account {}", address)).await?;
        Ok(())
    }

    async fn close(self: Box<Self>) {
        let Some(token) = self.token.as_deref() else {
            return;
        };
        let Ok(url) = self.url(&["session"]) else {
            return;
        };

        if let Err(e) = self.client.delete(url).bearer_auth(token).send().await {
            debug!("Failed to release administrative session: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_local_endpoint() {
        let settings = SignatureSettings::default();
        let url = endpoint_url(&settings).unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:8089/api");
    }

    #[test]
    fn test_remote_endpoint() {
        let mut settings = SignatureSettings::default();
        settings.remote_admin = true;
        settings.remote_server = Some("mail.example.com".to_string());
        settings.hmail.base_path = "/bridge/v1/".to_string();
        let url = endpoint_url(&settings).unwrap();
        assert_eq!(url.as_str(), "http://mail.example.com:8089/bridge/v1");
    }

    #[test]
    fn test_remote_endpoint_without_host() {
        let mut settings = SignatureSettings::default();
        settings.remote_admin = true;
        assert!(endpoint_url(&settings).is_err());
    }

    #[tokio::test]
    async fn test_open_with_invalid_endpoint_fails() {
        let mut settings = SignatureSettings::default();
        settings.remote_admin = true;
        let channel = HttpAdminChannel::from_settings(&settings).unwrap();
        assert!(channel.endpoint().is_none());
        assert!(matches!(
            channel.open().await,
            Err(AdminError::InvalidEndpoint(_))
        ));
    }

    #[test]
    fn test_remote_enabled_normalization() {
        let cases = [
            (None, false),
            (Some(Value::Null), false),
            (Some(json!(false)), false),
            (Some(json!(0)), false),
            (Some(json!("")), false),
            (Some(json!("0")), false),
            (Some(json!(true)), true),
            (Some(json!(1)), true),
            (Some(json!(-1)), true),
        ];

        for (enabled, expected) in cases {
            let remote = RemoteSignature {
                enabled: enabled.clone(),
                html: None,
                plaintext: Some("hi".to_string()),
            };
            let record = remote.into_record();
            assert_eq!(record.enabled, expected, "enabled = {:?}", enabled);
            assert_eq!(record.html, "");
            assert_eq!(record.plaintext, "hi");
        }
    }

    #[test]
    fn test_signature_url_encodes_segments() {
        let session = HttpAdminSession {
            client: Client::new(),
            base: Url::parse("http://localhost:8089/api/").unwrap(),
            token: None,
        };
        let url = session
            .signature_url("example.com", "alice@example.com")
            .unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:8089/api/domains/example.com/accounts/alice@example.com/signature"
        );
    }
}
