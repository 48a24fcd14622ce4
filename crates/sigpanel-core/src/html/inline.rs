//! Inline uploaded images
//!
//! Images uploaded through the settings form are referenced from the
//! HTML body by their upload URL. Before saving, each reference is
//! replaced by a `data:` URI carrying the image bytes, since the mail
//! server cannot resolve URLs of the settings panel.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use regex::{Captures, Regex};
use std::collections::HashMap;
use std::sync::LazyLock;
use tracing::{debug, warn};
use uuid::Uuid;

/// Path prefix under which uploaded images are served
pub const UPLOAD_PATH: &str = "/settings/signature/upload/";

static UPLOAD_SRC: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?i)(\ssrc\s*=\s*)(["'])[^"']*?/settings/signature/upload/([A-Za-z0-9-]+)(["'])"#,
    )
    .expect("upload reference pattern is valid")
});

/// URL an uploaded image is served under
pub fn upload_url(id: &str) -> String {
    format!("{}{}", UPLOAD_PATH, id)
}

/// An image uploaded through the settings form
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedImage {
    pub mime: String,
    pub data: Vec<u8>,
}

impl UploadedImage {
    pub fn new(mime: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            mime: mime.into(),
            data,
        }
    }

    /// Image as a `data:` URI
    pub fn to_data_uri(&self) -> String {
        format!("data:{};base64,{}", self.mime, STANDARD.encode(&self.data))
    }
}

/// Images uploaded during one user session
#[derive(Debug, Clone, Default)]
pub struct UploadStore {
    images: HashMap<String, UploadedImage>,
}

impl UploadStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store an image and return its id
    pub fn insert(&mut self, image: UploadedImage) -> String {
        let id = Uuid::new_v4().to_string();
        self.images.insert(id.clone(), image);
        id
    }

    pub fn get(&self, id: &str) -> Option<&UploadedImage> {
        self.images.get(id)
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    /// Drop all uploads
    pub fn clear(&mut self) {
        self.images.clear();
    }
}

/// Replace upload references in `html` with inlined image data
///
/// References to unknown uploads and to images larger than `max_size`
/// bytes are left untouched.
pub fn inline_images(html: &str, uploads: &UploadStore, max_size: usize) -> String {
    UPLOAD_SRC
        .replace_all(html, |caps: &Captures<'_>| {
            let id = &caps[3];
            match uploads.get(id) {
                Some(image) if image.data.len() <= max_size => {
                    debug!("Inlining uploaded image {} ({} bytes)", id, image.data.len());
                    format!("{}{}{}{}", &caps[1], &caps[2], image.to_data_uri(), &caps[4])
                }
                Some(image) => {
                    warn!(
                        "Uploaded image {} is {} bytes, above the {} byte limit",
                        id,
                        image.data.len(),
                        max_size
                    );
                    caps[0].to_string()
                }
                None => {
                    warn!("Signature references unknown upload {}", id);
                    caps[0].to_string()
                }
            }
        })
        .into_owned()
}
