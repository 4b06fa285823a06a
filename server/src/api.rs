//! # HTTP API
//!
//! Builds the axum router for the public badge endpoints. All handlers
//! share application state through axum's `State` extractor; the core does
//! the lookups and document rendering, this layer only translates outcomes
//! into status codes, JSON, HTML, or PNG bytes.
//!
//! ## Endpoints
//!
//! | Method | Path                                     | Response                      |
//! |--------|------------------------------------------|-------------------------------|
//! | GET    | `/organization/`                         | Issuer document (JSON)        |
//! | GET    | `/organization/image`                    | Issuer logo (PNG)             |
//! | GET    | `/revoked/`                              | Revocation list (JSON)        |
//! | GET    | `/badge/:slug/`                          | BadgeClass document (JSON)    |
//! | GET    | `/badge/:slug/image`                     | Badge reference image (PNG)   |
//! | GET    | `/assertion/:uid/`                       | Assertion document, 410, 404  |
//! | GET    | `/criterion/:slug/`                      | Criterion page (HTML)         |
//! | GET    | `/user_badges/:user/`                    | Award list page (HTML)        |
//! | GET    | `/user_badge/:slug/:user/`               | Award detail page (HTML)      |
//! | GET    | `/badge_image/:slug/:user/image`         | Badge image, gated (PNG)      |
//!
//! `:user` accepts a numeric user id or an email address.

use axum::{
    extract::{Path, State},
    http::{header, Method, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::get,
    Json, Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use badgery_core::assertion::{self, AssertionLookup};
use badgery_core::catalog::{self, BadgeClassDocument};
use badgery_core::config::{ServiceConfig, PNG_CONTENT_TYPE};
use badgery_core::identity::UserRef;
use badgery_core::issuer::{self, IssuerDocument};
use badgery_core::revocation;
use badgery_core::storage::BadgeStore;
use badgery_core::BadgeError;

use crate::metrics::SharedMetrics;

// ---------------------------------------------------------------------------
// Application State
// ---------------------------------------------------------------------------

/// Shared application state available to all request handlers.
///
/// Cheap to clone — everything behind `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// Persistent storage for badges, users, awards, and revocations.
    pub store: Arc<BadgeStore>,
    /// Base URL and document URL builders.
    pub cfg: Arc<ServiceConfig>,
    /// Prometheus metric handles for in-handler recording.
    pub metrics: SharedMetrics,
}

// ---------------------------------------------------------------------------
// Error Mapping
// ---------------------------------------------------------------------------

/// Wraps [`BadgeError`] so handlers can use `?` and leave the status-code
/// mapping in one place.
pub struct ApiError(BadgeError);

impl From<BadgeError> for ApiError {
    fn from(err: BadgeError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self.0 {
            // Absent entities are a normal read outcome: empty 404.
            BadgeError::NotFound { .. } => StatusCode::NOT_FOUND.into_response(),
            BadgeError::Validation(msg) => (
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({ "error": msg })),
            )
                .into_response(),
            BadgeError::Conflict { .. } => (
                StatusCode::CONFLICT,
                Json(serde_json::json!({ "error": self.0.to_string() })),
            )
                .into_response(),
            BadgeError::NotConfigured(_) | BadgeError::Storage(_) | BadgeError::Png(_) => {
                tracing::error!(error = %self.0, "request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(serde_json::json!({ "error": "internal error" })),
                )
                    .into_response()
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Router Construction
// ---------------------------------------------------------------------------

/// Builds the full axum [`Router`] with all public routes, CORS, and
/// request tracing.
///
/// CORS is wide open on purpose: badge validators and backpack sites fetch
/// these documents from arbitrary origins.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET])
        .allow_headers(Any);

    Router::new()
        .route("/organization/", get(issuer_document))
        .route("/organization/image", get(issuer_image))
        .route("/revoked/", get(revocation_list))
        .route("/badge/:slug/", get(badge_document))
        .route("/badge/:slug/image", get(badge_reference_image))
        .route("/assertion/:uid/", get(assertion_document))
        .route("/criterion/:slug/", get(criterion_page))
        .route("/user_badges/:user/", get(user_badges_page))
        .route("/user_badge/:slug/:user/", get(user_badge_page))
        .route("/badge_image/:slug/:user/image", get(awarded_badge_image))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn png_response(bytes: Vec<u8>) -> Response {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, PNG_CONTENT_TYPE)],
        bytes,
    )
        .into_response()
}

// ---------------------------------------------------------------------------
// JSON Handlers
// ---------------------------------------------------------------------------

/// `GET /organization/` — the issuer document.
async fn issuer_document(
    State(state): State<AppState>,
) -> Result<Json<IssuerDocument>, ApiError> {
    let issuer = issuer::get_issuer(&state.store)?;
    state.metrics.documents_served_total.inc();
    Ok(Json(issuer.to_document(&state.cfg)))
}

/// `GET /organization/image` — the issuer logo. 404 when none configured.
async fn issuer_image(State(state): State<AppState>) -> Result<Response, ApiError> {
    let issuer = issuer::get_issuer(&state.store)?;
    let image = issuer
        .image
        .ok_or_else(|| BadgeError::not_found("issuer image", "organization"))?;
    state.metrics.images_served_total.inc();
    Ok(png_response(image))
}

/// `GET /revoked/` — the public revocation list.
async fn revocation_list(
    State(state): State<AppState>,
) -> Result<Json<Vec<serde_json::Value>>, ApiError> {
    let list = revocation::revocation_list(&state.store)?;
    state.metrics.documents_served_total.inc();
    Ok(Json(list))
}

/// `GET /badge/:slug/` — the BadgeClass document.
async fn badge_document(
    Path(slug): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<BadgeClassDocument>, ApiError> {
    let badge = catalog::get_badge(&state.store, &slug)?;
    state.metrics.documents_served_total.inc();
    Ok(Json(badge.to_document(&state.cfg)))
}

/// `GET /badge/:slug/image` — the badge's reference image, ungated.
/// This is the URL the BadgeClass document points at.
async fn badge_reference_image(
    Path(slug): Path<String>,
    State(state): State<AppState>,
) -> Result<Response, ApiError> {
    let badge = catalog::get_badge(&state.store, &slug)?;
    state.metrics.images_served_total.inc();
    Ok(png_response(badge.image))
}

/// `GET /assertion/:uid/` — the hosted assertion document.
///
/// The three lookup states map directly to responses: valid award -> 200
/// with the full document, revoked -> 410 Gone with `{"revoked": true}`,
/// unknown uid -> empty 404.
async fn assertion_document(
    Path(uid): Path<String>,
    State(state): State<AppState>,
) -> Result<Response, ApiError> {
    match assertion::lookup_assertion(&state.store, &state.cfg, &uid)? {
        AssertionLookup::Valid(doc) => {
            state.metrics.assertions_served_total.inc();
            Ok(Json(*doc).into_response())
        }
        AssertionLookup::Revoked => {
            state.metrics.assertions_gone_total.inc();
            Ok((
                StatusCode::GONE,
                Json(serde_json::json!({ "revoked": true })),
            )
                .into_response())
        }
        AssertionLookup::NotFound => Ok(StatusCode::NOT_FOUND.into_response()),
    }
}

/// `GET /badge_image/:slug/:user/image` — the badge's reference image for
/// a recipient, served only when an award links the two.
async fn awarded_badge_image(
    Path((slug, user)): Path<(String, String)>,
    State(state): State<AppState>,
) -> Result<Response, ApiError> {
    let user_ref = UserRef::parse(&user);
    let bytes = assertion::badge_image_for(&state.store, &slug, &user_ref)?;
    state.metrics.images_served_total.inc();
    Ok(png_response(bytes))
}

// ---------------------------------------------------------------------------
// HTML Handlers
// ---------------------------------------------------------------------------

/// Minimal HTML shell shared by the human-readable pages.
fn html_page(title: &str, body: &str) -> Html<String> {
    Html(format!(
        "<!DOCTYPE html>\n<html><head><meta charset=\"utf-8\"><title>{}</title></head>\n\
         <body>{}</body></html>\n",
        escape_html(title),
        body
    ))
}

/// Escape text interpolated into HTML. Emails and titles are user data.
fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// `GET /criterion/:slug/` — a human-readable criterion page.
async fn criterion_page(
    Path(slug): Path<String>,
    State(state): State<AppState>,
) -> Result<Html<String>, ApiError> {
    let criterion = catalog::get_criterion(&state.store, &slug)?;
    let body = format!(
        "<h1>{}</h1>\n<p>{}</p>",
        escape_html(&criterion.name),
        escape_html(&criterion.description)
    );
    Ok(html_page(&criterion.name, &body))
}

/// `GET /user_badges/:user/` — all badges held by a user.
async fn user_badges_page(
    Path(user): Path<String>,
    State(state): State<AppState>,
) -> Result<Html<String>, ApiError> {
    let user_ref = UserRef::parse(&user);
    let (user, awards) = assertion::awards_for_user(&state.store, &user_ref)?;

    let mut items = String::new();
    for award in &awards {
        items.push_str(&format!(
            "<li><a href=\"{}\">{}</a> — awarded {}</li>\n",
            escape_html(&state.cfg.base_url.join(&format!(
                "/user_badge/{}/{}/",
                award.badge_slug, user.id
            ))),
            escape_html(&award.badge_slug),
            award.awarded.format("%Y-%m-%d")
        ));
    }
    let body = format!(
        "<h1>Badges of {}</h1>\n<ul>\n{}</ul>",
        escape_html(&user.username),
        items
    );
    Ok(html_page(&format!("Badges of {}", user.username), &body))
}

/// `GET /user_badge/:slug/:user/` — one award in detail. 404 when the user
/// holds no award for the badge.
async fn user_badge_page(
    Path((slug, user)): Path<(String, String)>,
    State(state): State<AppState>,
) -> Result<Html<String>, ApiError> {
    let user_ref = UserRef::parse(&user);
    let (user, badge, award) = assertion::award_for(&state.store, &slug, &user_ref)?;

    let body = format!(
        "<h1>{}</h1>\n\
         <img src=\"{}\" alt=\"{}\">\n\
         <p>{}</p>\n\
         <p>Awarded to {} on {}.</p>\n\
         <p><a href=\"{}\">Assertion</a></p>",
        escape_html(&badge.title),
        escape_html(&state.cfg.award_image_url(&badge.slug, &user.email)),
        escape_html(&badge.title),
        escape_html(&badge.description),
        escape_html(&user.username),
        award.awarded.format("%Y-%m-%d"),
        escape_html(&award.absolute_url(&state.cfg)),
    );
    Ok(html_page(&badge.title, &body))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
