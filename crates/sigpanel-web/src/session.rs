//! Session store
//!
//! Server-side sessions keyed by a random id carried in a cookie. A
//! session holds the credentials of the logged-in user and the images
//! uploaded while editing the signature. Sessions expire on the server
//! after the same lifetime as their cookie.

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use sigpanel_common::{Credentials, Error, Result};
use sigpanel_core::{UploadStore, UploadedImage};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::debug;
use uuid::Uuid;

/// Name of the session cookie
pub const SESSION_COOKIE: &str = "sigpanel_session";

/// Default session lifetime
pub const SESSION_TTL: Duration = Duration::from_secs(8 * 60 * 60);

/// Uploads kept per session until the signature is saved
pub const MAX_UPLOADS_PER_SESSION: usize = 16;

/// One user session
#[derive(Debug, Clone)]
pub struct Session {
    pub credentials: Credentials,
    pub uploads: UploadStore,
}

#[derive(Debug)]
struct Entry {
    session: Session,
    created: Instant,
}

impl Entry {
    fn is_expired(&self, ttl: Duration) -> bool {
        self.created.elapsed() >= ttl
    }
}

/// In-memory session store
#[derive(Debug, Clone)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<String, Entry>>>,
    ttl: Duration,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::with_ttl(SESSION_TTL)
    }
}

fn session_id(jar: &CookieJar) -> Result<String> {
    jar.get(SESSION_COOKIE)
        .map(|c| c.value().to_string())
        .ok_or_else(|| Error::Session("no session cookie".to_string()))
}

fn unknown_session() -> Error {
    Error::Session("unknown or expired session".to_string())
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            ttl,
        }
    }

    /// Start a session and return its cookie
    ///
    /// Expired sessions are purged on the way.
    pub async fn create(&self, credentials: Credentials, secure: bool) -> Cookie<'static> {
        let id = Uuid::new_v4().to_string();
        debug!("Starting session for {}", credentials.username);

        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, entry| !entry.is_expired(self.ttl));
        if sessions.len() < before {
            debug!("Purged {} expired sessions", before - sessions.len());
        }

        sessions.insert(
            id.clone(),
            Entry {
                session: Session {
                    credentials,
                    uploads: UploadStore::new(),
                },
                created: Instant::now(),
            },
        );

        Cookie::build((SESSION_COOKIE, id))
            .path("/")
            .http_only(true)
            .secure(secure)
            .same_site(SameSite::Lax)
            .max_age(self.ttl.try_into().unwrap_or(time::Duration::MAX))
            .build()
    }

    /// Session of the request
    pub async fn get(&self, jar: &CookieJar) -> Result<Session> {
        let id = session_id(jar)?;

        {
            let sessions = self.sessions.read().await;
            match sessions.get(&id) {
                None => return Err(unknown_session()),
                Some(entry) if !entry.is_expired(self.ttl) => return Ok(entry.session.clone()),
                Some(_) => {}
            }
        }

        debug!("Session expired");
        self.sessions.write().await.remove(&id);
        Err(unknown_session())
    }

    /// End the session of the request and return the jar without its cookie
    pub async fn remove(&self, jar: CookieJar) -> CookieJar {
        if let Some(cookie) = jar.get(SESSION_COOKIE) {
            self.sessions.write().await.remove(cookie.value());
        }
        jar.remove(Cookie::build(SESSION_COOKIE).path("/"))
    }

    /// Add an uploaded image to the session and return its id
    pub async fn add_upload(&self, jar: &CookieJar, image: UploadedImage) -> Result<String> {
        let id = session_id(jar)?;
        let mut sessions = self.sessions.write().await;

        let expired = match sessions.get(&id) {
            None => return Err(unknown_session()),
            Some(entry) => entry.is_expired(self.ttl),
        };
        if expired {
            sessions.remove(&id);
            return Err(unknown_session());
        }

        let Some(entry) = sessions.get_mut(&id) else {
            return Err(unknown_session());
        };
        if entry.session.uploads.len() >= MAX_UPLOADS_PER_SESSION {
            return Err(Error::Validation(format!(
                "at most {} images can be uploaded before saving",
                MAX_UPLOADS_PER_SESSION
            )));
        }

        Ok(entry.session.uploads.insert(image))
    }

    /// Uploaded image of the session
    pub async fn upload(&self, jar: &CookieJar, upload_id: &str) -> Result<UploadedImage> {
        let id = session_id(jar)?;
        let sessions = self.sessions.read().await;

        let entry = sessions
            .get(&id)
            .filter(|entry| !entry.is_expired(self.ttl))
            .ok_or_else(unknown_session)?;

        entry
            .session
            .uploads
            .get(upload_id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("upload {}", upload_id)))
    }

    /// Forget the uploads of the session once they have been saved
    pub async fn clear_uploads(&self, jar: &CookieJar) {
        let Some(cookie) = jar.get(SESSION_COOKIE) else {
            return;
        };
        if let Some(entry) = self.sessions.write().await.get_mut(cookie.value()) {
            entry.session.uploads.clear();
        }
    }

    /// Number of stored sessions
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}
