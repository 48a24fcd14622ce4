//! Web UI Handlers
//!
//! Request handlers for the web UI.

use crate::error::AppError;
use crate::{AppState, StaticAssets};
use axum::{
    extract::{Multipart, Path, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Redirect, Response},
    Form, Json,
};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;
use sigpanel_common::{Credentials, Error};
use sigpanel_core::html::upload_url;
use sigpanel_core::{DisplayOutcome, Notice, SignatureForm, Text, UploadedImage};
use tracing::{debug, info, warn};

/// Image types accepted for upload
const UPLOAD_IMAGE_TYPES: &[&str] = &["image/png", "image/jpeg", "image/gif", "image/webp"];

/// Health check handler
pub async fn health() -> impl IntoResponse {
    "OK"
}

/// Serve static files
pub async fn static_file(Path(path): Path<String>) -> impl IntoResponse {
    match StaticAssets::get(&path) {
        Some(content) => {
            let mime = mime_guess::from_path(&path).first_or_octet_stream();
            (
                StatusCode::OK,
                [(header::CONTENT_TYPE, mime.as_ref())],
                content.data.into_owned(),
            )
                .into_response()
        }
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

/// Index page - redirects to the signature settings
pub async fn index() -> impl IntoResponse {
    Redirect::to("/settings/signature")
}

fn render(state: &AppState, name: &str, context: serde_json::Value) -> Response {
    match state.templates.render(name, &context) {
        Ok(html) => Html(html).into_response(),
        Err(e) => AppError(Error::Template(e.to_string())).into_response(),
    }
}

/// Login page
pub async fn login_page(State(state): State<AppState>) -> impl IntoResponse {
    let texts = state.service.texts();
    let context = serde_json::json!({
        "title": texts.get(Text::Login),
        "labels": texts.labels(),
        "notices": [],
    });

    render(&state, "login.html", context)
}

/// Login form data
#[derive(Deserialize)]
pub struct LoginForm {
    pub username: String,
    #[serde(default)]
    pub password: String,
}

/// Login form submission
///
/// Credentials are checked by the mail backend on the first driver
/// call, so any non-empty username opens a session.
pub async fn login_submit(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> Response {
    let username = form.username.trim();
    if username.is_empty() {
        return Redirect::to("/login").into_response();
    }

    let cookie = state
        .sessions
        .create(
            Credentials::new(username, form.password),
            state.config.secure_cookies,
        )
        .await;
    info!("User {} logged in", username);

    (jar.add(cookie), Redirect::to("/settings/signature")).into_response()
}

/// Logout handler
pub async fn logout(State(state): State<AppState>, jar: CookieJar) -> impl IntoResponse {
    let jar = state.sessions.remove(jar).await;
    (jar, Redirect::to("/login"))
}

fn render_signature(
    state: &AppState,
    username: &str,
    notice: Option<Notice>,
    display: DisplayOutcome,
) -> Response {
    let texts = state.service.texts();
    let settings = state.service.settings();

    // A failed load adds its own notice and hides the form.
    let mut notices: Vec<Notice> = notice.into_iter().collect();
    let form = match display {
        DisplayOutcome::Form(record) => Some(record),
        DisplayOutcome::Unavailable(load_notice) => {
            notices.push(load_notice);
            None
        }
    };

    let context = serde_json::json!({
        "title": texts.get(Text::Signature),
        "labels": texts.labels(),
        "username": username,
        "notices": notices,
        "form": form,
        "html_editor": settings.html_editor,
        "max_image_size": settings.max_image_size,
        "upload_url": "/settings/signature/upload",
    });

    render(state, "signature.html", context)
}

/// Signature settings page
pub async fn signature_page(State(state): State<AppState>, jar: CookieJar) -> Response {
    let Ok(session) = state.sessions.get(&jar).await else {
        return Redirect::to("/login").into_response();
    };

    let mut controller = state.service.controller();
    let display = controller.display(&session.credentials).await;

    render_signature(&state, &session.credentials.username, None, display)
}

/// Signature settings form submission
pub async fn signature_save(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<SignatureForm>,
) -> Response {
    let Ok(session) = state.sessions.get(&jar).await else {
        return Redirect::to("/login").into_response();
    };

    let mut controller = state.service.controller();
    let outcome = controller
        .save(&session.credentials, form, &session.uploads)
        .await;

    if outcome.result.is_some_and(|r| r.is_success()) {
        state.sessions.clear_uploads(&jar).await;
    }

    render_signature(
        &state,
        &session.credentials.username,
        Some(outcome.notice),
        outcome.display,
    )
}

/// Upload response
#[derive(Debug, serde::Serialize)]
pub struct UploadResponse {
    pub id: String,
    pub url: String,
}

/// Image upload for the HTML editor
pub async fn upload_image(
    State(state): State<AppState>,
    jar: CookieJar,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    state.sessions.get(&jar).await?;

    let max_size = state.service.settings().max_image_size;

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        warn!("Malformed upload: {}", e);
        Error::Validation(format!("malformed upload: {}", e))
    })? {
        if field.name() != Some("file") {
            continue;
        }

        let mime = field
            .content_type()
            .map(str::to_string)
            .or_else(|| {
                field
                    .file_name()
                    .and_then(|name| mime_guess::from_path(name).first())
                    .map(|m| m.essence_str().to_string())
            })
            .unwrap_or_default();
        let mime = mime
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();

        if !UPLOAD_IMAGE_TYPES.contains(&mime.as_str()) {
            return Err(Error::UnsupportedMediaType(mime).into());
        }

        let data = field.bytes().await.map_err(|e| {
            warn!("Failed to read upload: {}", e);
            Error::Validation(format!("failed to read upload: {}", e))
        })?;

        if data.len() > max_size {
            return Err(Error::PayloadTooLarge {
                size: data.len(),
                limit: max_size,
            }
            .into());
        }

        let id = state
            .sessions
            .add_upload(&jar, UploadedImage::new(mime, data.to_vec()))
            .await?;
        debug!("Stored upload {} ({} bytes)", id, data.len());

        return Ok(Json(UploadResponse {
            url: upload_url(&id),
            id,
        }));
    }

    Err(Error::Validation("upload carries no file field".to_string()).into())
}

/// Serve an uploaded image back to the editor
pub async fn uploaded_image(
    State(state): State<AppState>,
    jar: CookieJar,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let image = state.sessions.upload(&jar, &id).await?;

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, image.mime),
            (header::X_CONTENT_TYPE_OPTIONS, "nosniff".to_string()),
        ],
        image.data,
    )
        .into_response())
}

#[cfg(test)]
mod tests {
    use crate::{create_router, AppState, SessionStore};
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use axum::Router;
    use pretty_assertions::assert_eq;
    use sigpanel_common::config::{MemorySettings, ServerConfig, SignatureSettings};
    use sigpanel_core::{DriverRegistry, SignatureService, Texts};
    use std::sync::Arc;
    use std::time::Duration;
    use tower::ServiceExt;

    fn settings(driver: &str) -> SignatureSettings {
        SignatureSettings {
            driver: driver.to_string(),
            username_domain: Some("example.com".to_string()),
            max_image_size: 16,
            ..Default::default()
        }
    }

    fn state_with(settings: SignatureSettings) -> AppState {
        let service = SignatureService::new(DriverRegistry::with_builtin(), settings, Texts::default());
        AppState::new(ServerConfig::default(), Arc::new(service)).unwrap()
    }

    fn app_with_driver(driver: &str) -> Router {
        create_router(state_with(settings(driver)))
    }

    async fn get_page(app: &Router, uri: &str, cookie: &str) -> axum::response::Response {
        app.clone()
            .oneshot(
                Request::get(uri)
                    .header(header::COOKIE, cookie)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap()
    }

    async fn body_text(response: axum::response::Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    async fn login(app: &Router) -> String {
        let response = app
            .clone()
            .oneshot(
                Request::post("/login")
                    .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                    .body(Body::from("username=alice&password=secret"))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        let set_cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .unwrap()
            .to_str()
            .unwrap();
        set_cookie.split(';').next().unwrap().to_string()
    }

    fn multipart_body(boundary: &str, mime: &str, data: &[u8]) -> Vec<u8> {
        let mut body = format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"logo\"\r\nContent-Type: {mime}\r\n\r\n"
        )
        .into_bytes();
        body.extend_from_slice(data);
        body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());
        body
    }

    async fn upload(app: &Router, cookie: &str, mime: &str, data: &[u8]) -> axum::response::Response {
        app.clone()
            .oneshot(
                Request::post("/settings/signature/upload")
                    .header(header::COOKIE, cookie)
                    .header(header::CONTENT_TYPE, "multipart/form-data; boundary=XBOUNDARY")
                    .body(Body::from(multipart_body("XBOUNDARY", mime, data)))
                    .unwrap(),
            )
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let app = app_with_driver("memory");
        let response = app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, "OK");
    }

    #[tokio::test]
    async fn test_missing_session_redirects_to_login() {
        let app = app_with_driver("memory");
        let response = app
            .oneshot(Request::get("/settings/signature").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers().get(header::LOCATION).unwrap(), "/login");
    }

    #[tokio::test]
    async fn test_save_and_display_round_trip() {
        let app = app_with_driver("memory");
        let cookie = login(&app).await;

        let response = app
            .clone()
            .oneshot(
                Request::post("/settings/signature")
                    .header(header::COOKIE, &cookie)
                    .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                    .body(Body::from("_enabled=1&_html=%3Cp%3Ehi%3C%2Fp%3E&_plaintext=hi"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let page = body_text(response).await;
        assert!(page.contains("Signature successfully updated."));

        let response = app
            .oneshot(
                Request::get("/settings/signature")
                    .header(header::COOKIE, &cookie)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let page = body_text(response).await;
        assert!(page.contains("&lt;p&gt;hi&lt;"));
        assert!(page.contains(" checked"));
        assert!(page.contains(">hi</textarea>"));
    }

    #[tokio::test]
    async fn test_unknown_driver_shows_internal_error() {
        let app = app_with_driver("exchange");
        let cookie = login(&app).await;

        let response = app
            .oneshot(
                Request::get("/settings/signature")
                    .header(header::COOKIE, &cookie)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let page = body_text(response).await;
        assert!(page.contains("Internal error. Please contact your administrator."));
        assert!(!page.contains("signature-form"));
    }

    #[tokio::test]
    async fn test_upload_and_fetch_image() {
        let app = app_with_driver("memory");
        let cookie = login(&app).await;

        let response = upload(&app, &cookie, "image/gif", b"GIF89a").await;
        assert_eq!(response.status(), StatusCode::OK);
        let json: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
        let url = json["url"].as_str().unwrap().to_string();
        assert!(url.starts_with("/settings/signature/upload/"));

        let response = app
            .oneshot(
                Request::get(url.as_str())
                    .header(header::COOKIE, &cookie)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers().get(header::CONTENT_TYPE).unwrap(), "image/gif");
        assert_eq!(
            response.headers().get(header::X_CONTENT_TYPE_OPTIONS).unwrap(),
            "nosniff"
        );
        assert_eq!(body_text(response).await, "GIF89a");
    }

    #[tokio::test]
    async fn test_upload_rejections() {
        let app = app_with_driver("memory");
        let cookie = login(&app).await;

        let response = upload(&app, &cookie, "text/html", b"<p>").await;
        assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);

        let response = upload(&app, &cookie, "image/svg+xml", b"<svg/>").await;
        assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);

        let response = upload(&app, &cookie, "image/png", &[0u8; 32]).await;
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);

        let response = upload(&app, "sigpanel_session=forged", "image/png", b"x").await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_logout_ends_session() {
        let app = app_with_driver("memory");
        let cookie = login(&app).await;

        let response = app
            .clone()
            .oneshot(
                Request::get("/logout")
                    .header(header::COOKIE, &cookie)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);

        let response = app
            .oneshot(
                Request::get("/settings/signature")
                    .header(header::COOKIE, &cookie)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.headers().get(header::LOCATION).unwrap(), "/login");
    }

    #[tokio::test]
    async fn test_static_assets() {
        let app = app_with_driver("memory");
        let response = app
            .clone()
            .oneshot(Request::get("/static/signature.js").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .oneshot(Request::get("/static/missing.js").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_failed_save_and_reload_show_both_notices() {
        let mut settings = settings("memory");
        settings.memory = MemorySettings {
            require_password: Some("other".to_string()),
            accounts: Vec::new(),
        };
        let app = create_router(state_with(settings));
        let cookie = login(&app).await;

        let response = app
            .oneshot(
                Request::post("/settings/signature")
                    .header(header::COOKIE, &cookie)
                    .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                    .body(Body::from("_plaintext=hi"))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let page = body_text(response).await;
        assert!(page.contains("Could not save the signature."));
        assert!(page.contains("Could not load the signature."));
        assert!(!page.contains("signature-form"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_session_redirects_to_login() {
        let mut state = state_with(settings("memory"));
        state.sessions = SessionStore::with_ttl(Duration::from_secs(60));
        let app = create_router(state);
        let cookie = login(&app).await;

        let response = get_page(&app, "/settings/signature", &cookie).await;
        assert_eq!(response.status(), StatusCode::OK);

        tokio::time::advance(Duration::from_secs(61)).await;

        let response = get_page(&app, "/settings/signature", &cookie).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers().get(header::LOCATION).unwrap(), "/login");
    }
}
