//! # User Directory
//!
//! Minimal user records: the badge service is not an identity provider, but
//! award lookups resolve recipients by numeric id *or* email, and identity
//! reconciliation has to fire at exactly two moments — registration and
//! email change. Both moments are explicit functions here rather than
//! save-hooks, so the ordering is readable in one place.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{BadgeError, BadgeResult};
use crate::identity::reconcile::sync_identity;
use crate::storage::BadgeStore;

/// A registered user. `id` is assigned by the store and never reused.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: u64,
    pub username: String,
    pub email: String,
}

/// A recipient lookup key as it appears in a URL path segment.
///
/// The public routes accept either the numeric user id or the email
/// address; a segment made of digits is an id, anything else an email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserRef {
    Id(u64),
    Email(String),
}

impl UserRef {
    /// Classify a raw path segment.
    pub fn parse(segment: &str) -> UserRef {
        if !segment.is_empty() && segment.bytes().all(|b| b.is_ascii_digit()) {
            if let Ok(id) = segment.parse::<u64>() {
                return UserRef::Id(id);
            }
        }
        UserRef::Email(segment.to_string())
    }
}

impl fmt::Display for UserRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UserRef::Id(id) => write!(f, "{id}"),
            UserRef::Email(email) => f.write_str(email),
        }
    }
}

/// Register a new user and create their identity record in the same step.
///
/// Email addresses double as lookup keys, so they must be unique.
pub fn register_user(store: &BadgeStore, username: &str, email: &str) -> BadgeResult<User> {
    validate_email(email)?;
    let user = store
        .create_user(username, email)?
        .ok_or_else(|| BadgeError::Validation(format!("email already registered: {email}")))?;
    sync_identity(store, &user)?;
    tracing::info!(user_id = user.id, username = %user.username, "user registered");
    Ok(user)
}

/// Change a user's email and reconcile their identity record.
///
/// The identity salt and hash are regenerated together by the
/// reconciliation step; the award snapshots taken before this call are
/// deliberately left untouched.
pub fn change_email(store: &BadgeStore, user_id: u64, new_email: &str) -> BadgeResult<User> {
    validate_email(new_email)?;
    let user = store
        .get_user(user_id)?
        .ok_or_else(|| BadgeError::not_found("user", user_id.to_string()))?;
    let updated = store
        .change_user_email(&user, new_email)?
        .ok_or_else(|| BadgeError::Validation(format!("email already registered: {new_email}")))?;
    let outcome = sync_identity(store, &updated)?;
    tracing::info!(user_id, outcome = ?outcome, "user email changed");
    Ok(updated)
}

/// Resolve a user by id or email.
pub fn resolve_user(store: &BadgeStore, user_ref: &UserRef) -> BadgeResult<User> {
    let found = match user_ref {
        UserRef::Id(id) => store.get_user(*id)?,
        UserRef::Email(email) => store.get_user_by_email(email)?,
    };
    found.ok_or_else(|| BadgeError::not_found("user", user_ref.to_string()))
}

fn validate_email(email: &str) -> BadgeResult<()> {
    // Full RFC 5321 parsing is someone else's problem; the store only needs
    // a non-empty key that can never be mistaken for a numeric id.
    if email.is_empty() || !email.contains('@') {
        return Err(BadgeError::Validation(format!("invalid email: '{email}'")));
    }
    Ok(())
}
