//! # Error Taxonomy
//!
//! One domain error for the whole crate. The variants map one-to-one onto
//! the conditions the HTTP layer has to distinguish:
//!
//! | Variant         | Meaning                                  | HTTP    |
//! |-----------------|------------------------------------------|---------|
//! | `NotFound`      | badge/user/award/criterion absent        | 404     |
//! | `Conflict`      | duplicate `(user, badge)` award          | 409     |
//! | `Validation`    | bad input (non-PNG upload, bad email...) | 400     |
//! | `NotConfigured` | no issuer record / bad base URL          | startup |
//! | `Storage`       | sled or serialization failure            | 500     |
//! | `Png`           | PNG decode/encode failure while baking   | 500     |
//!
//! `NotConfigured` is a deployment error. The server refuses to start on it
//! rather than discovering it one request at a time.

use crate::storage::StoreError;

/// Errors produced by the badge core.
#[derive(Debug, thiserror::Error)]
pub enum BadgeError {
    /// An entity lookup came up empty. `kind` names the entity family
    /// ("badge", "user", "award", "criterion"), `key` the lookup key.
    #[error("{kind} not found: {key}")]
    NotFound { kind: &'static str, key: String },

    /// An award already exists for this `(user, badge)` pair.
    #[error("user {user_id} already holds badge '{badge_slug}'")]
    Conflict { user_id: u64, badge_slug: String },

    /// Input rejected at write time.
    #[error("validation failed: {0}")]
    Validation(String),

    /// Required deployment state is missing (issuer record, base URL).
    #[error("not configured: {0}")]
    NotConfigured(&'static str),

    /// The storage layer failed for reasons other than "record absent".
    #[error("storage error: {0}")]
    Storage(#[from] StoreError),

    /// The PNG codec rejected an image during baking.
    #[error("png codec error: {0}")]
    Png(String),
}

impl BadgeError {
    /// Shorthand for [`BadgeError::NotFound`].
    pub fn not_found(kind: &'static str, key: impl Into<String>) -> Self {
        BadgeError::NotFound {
            kind,
            key: key.into(),
        }
    }

    /// True for conditions that are a normal part of serving reads
    /// (absent entities), as opposed to faults.
    pub fn is_not_found(&self) -> bool {
        matches!(self, BadgeError::NotFound { .. })
    }
}

impl From<png::DecodingError> for BadgeError {
    fn from(e: png::DecodingError) -> Self {
        BadgeError::Png(e.to_string())
    }
}

impl From<png::EncodingError> for BadgeError {
    fn from(e: png::EncodingError) -> Self {
        BadgeError::Png(e.to_string())
    }
}

pub type BadgeResult<T> = Result<T, BadgeError>;
