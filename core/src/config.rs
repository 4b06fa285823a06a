//! # Service Configuration & Constants
//!
//! Every magic value of the badge protocol surface lives here, together with
//! the base-URL plumbing. The Open Badges verification flow requires every
//! URL we embed in a document to be absolute and independently fetchable —
//! a validator fetches the assertion, then the badge class, then the issuer,
//! with no referrer context between hops. So the base URL is not ambient
//! state: it is validated once at startup and threaded explicitly into every
//! document-rendering call.

use serde::{Deserialize, Serialize};

use crate::error::{BadgeError, BadgeResult};

// ---------------------------------------------------------------------------
// Protocol Constants
// ---------------------------------------------------------------------------

/// Content type required for every badge, award, and issuer image.
/// The Open Badges baking spec only defines metadata embedding for PNG.
pub const PNG_CONTENT_TYPE: &str = "image/png";

/// Date format used in assertion documents (`issuedOn`, `expires`).
pub const BADGE_DATE_FORMAT: &str = "%Y-%m-%d";

/// The only verification type we issue. Signed assertions would need keys,
/// key rotation, and a public-key endpoint; hosted verification needs a URL.
pub const VERIFY_TYPE_HOSTED: &str = "hosted";

// ---------------------------------------------------------------------------
// Base URL
// ---------------------------------------------------------------------------

/// A validated absolute base URL, e.g. `https://badges.example.org`.
///
/// Construction normalizes away any trailing slash so that joining with
/// route paths (which all start with `/`) never doubles one up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaseUrl(String);

impl BaseUrl {
    /// Parse and validate a base URL string.
    ///
    /// Rejects anything that is not http(s) — a relative base would silently
    /// produce documents no external validator can fetch.
    pub fn new(raw: &str) -> BadgeResult<Self> {
        let trimmed = raw.trim_end_matches('/');
        if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
            return Err(BadgeError::Validation(format!(
                "base URL must be absolute http(s), got '{raw}'"
            )));
        }
        if trimmed.len() <= "https://".len() {
            return Err(BadgeError::Validation("base URL has no host".into()));
        }
        Ok(BaseUrl(trimmed.to_string()))
    }

    /// Join a route path (starting with `/`) onto the base.
    pub fn join(&self, path: &str) -> String {
        format!("{}{}", self.0, path)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

// ---------------------------------------------------------------------------
// Service Config
// ---------------------------------------------------------------------------

/// Configuration threaded into document rendering.
///
/// The URL builders below are the single source of truth for the public
/// route layout. Handlers and documents both go through them, so a route
/// move cannot leave stale URLs inside rendered documents.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Absolute base under which all public routes are mounted.
    pub base_url: BaseUrl,
}

impl ServiceConfig {
    pub fn new(base_url: BaseUrl) -> Self {
        ServiceConfig { base_url }
    }

    /// `/assertion/{uid}/` — the hosted assertion document.
    pub fn assertion_url(&self, uid: &str) -> String {
        self.base_url.join(&format!("/assertion/{uid}/"))
    }

    /// `/badge/{slug}/` — the BadgeClass document.
    pub fn badge_url(&self, slug: &str) -> String {
        self.base_url.join(&format!("/badge/{slug}/"))
    }

    /// `/badge/{slug}/image` — the badge's reference image, ungated.
    /// This is the URL a BadgeClass document points at.
    pub fn badge_image_url(&self, slug: &str) -> String {
        self.base_url.join(&format!("/badge/{slug}/image"))
    }

    /// `/organization/` — the issuer document.
    pub fn issuer_url(&self) -> String {
        self.base_url.join("/organization/")
    }

    /// `/organization/image` — the issuer logo.
    pub fn issuer_image_url(&self) -> String {
        self.base_url.join("/organization/image")
    }

    /// `/revoked/` — the public revocation list.
    pub fn revocation_list_url(&self) -> String {
        self.base_url.join("/revoked/")
    }

    /// `/criterion/{slug}/` — the human-readable criterion page.
    pub fn criterion_url(&self, slug: &str) -> String {
        self.base_url.join(&format!("/criterion/{slug}/"))
    }

    /// `/badge_image/{slug}/{email}/image` — a recipient's badge image,
    /// gated on an existing award. Used as the assertion document's `image`.
    pub fn award_image_url(&self, slug: &str, email: &str) -> String {
        self.base_url.join(&format!("/badge_image/{slug}/{email}/image"))
    }
}
