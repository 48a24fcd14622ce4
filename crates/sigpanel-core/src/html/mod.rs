//! HTML body processing
//!
//! Turns the HTML signature posted by the form into something safe to
//! store on the mail server.

mod inline;
mod sanitize;

pub use inline::{inline_images, upload_url, UploadStore, UploadedImage, UPLOAD_PATH};
pub use sanitize::{sanitize_html, strip_tags};
