//! # Issuer Profile
//!
//! The single organization behind every badge this service issues. Exactly
//! one record is expected; its absence is a deployment mistake, not a
//! per-request condition, so the server checks for it at startup and
//! refuses to serve without it.

use serde::{Deserialize, Serialize};

use crate::config::ServiceConfig;
use crate::error::{BadgeError, BadgeResult};
use crate::imaging::validate_png;
use crate::storage::BadgeStore;

/// The issuing organization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issuer {
    pub name: String,
    /// The organization's own homepage, not a URL on this service.
    pub url: String,
    pub description: Option<String>,
    /// Optional PNG logo.
    pub image: Option<Vec<u8>>,
    pub email: Option<String>,
}

/// The issuer document served at `/organization/`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssuerDocument {
    pub name: String,
    /// Absolute logo URL, or empty string when no logo is configured.
    pub image: String,
    pub url: String,
    pub email: Option<String>,
    #[serde(rename = "revocationList")]
    pub revocation_list: String,
}

impl Issuer {
    /// Render the issuer document.
    pub fn to_document(&self, cfg: &ServiceConfig) -> IssuerDocument {
        IssuerDocument {
            name: self.name.clone(),
            image: match self.image {
                Some(_) => cfg.issuer_image_url(),
                None => String::new(),
            },
            url: self.url.clone(),
            email: self.email.clone(),
            revocation_list: cfg.revocation_list_url(),
        }
    }
}

/// Store the issuer profile. Overwrites any previous record — this is the
/// `init`-time deployment step, not a request path.
pub fn set_issuer(store: &BadgeStore, issuer: &Issuer) -> BadgeResult<()> {
    if let Some(image) = &issuer.image {
        validate_png(image)?;
    }
    store.set_issuer(issuer)?;
    tracing::info!(name = %issuer.name, "issuer profile stored");
    Ok(())
}

/// Fetch the issuer profile, failing with [`BadgeError::NotConfigured`]
/// when none exists.
pub fn get_issuer(store: &BadgeStore) -> BadgeResult<Issuer> {
    store
        .get_issuer()?
        .ok_or(BadgeError::NotConfigured("no issuer profile stored"))
}
