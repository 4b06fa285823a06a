//! # Identity Reconciliation
//!
//! Keeps a user's stored [`Identity`] consistent with their current email.
//! Runs at registration and after every email change — never from a save
//! hook, always as an explicit step, so there is exactly one code path that
//! can touch a salt.
//!
//! The no-op detection trick: recompute the hash with the *existing* salt
//! and the *current* email. If it matches the stored hash, the email did
//! not really change and nothing is written. If it differs, both salt and
//! hash are regenerated and persisted as one record write — a reader can
//! never observe a new hash next to an old salt.

use serde::{Deserialize, Serialize};

use crate::error::BadgeResult;
use crate::identity::hasher::{generate_salt, hash_identity};
use crate::identity::user::User;
use crate::storage::BadgeStore;

/// The kind of raw identity the hash was derived from.
///
/// Only email today. The variant exists so documents carry an explicit
/// `type` field, as the recipient format requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdentityType {
    Email,
}

impl IdentityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            IdentityType::Email => "email",
        }
    }
}

/// A user's privacy-preserving identity record.
///
/// Stored 1:1 with the user and copied (not referenced) into every award at
/// creation time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub user_id: u64,
    pub kind: IdentityType,
    /// `"sha256$" + hex(sha256(email + salt))` for the current email.
    pub hash: String,
    /// Always true in practice; carried because the recipient document
    /// format declares it.
    pub hashed: bool,
    pub salt: String,
}

/// What [`sync_identity`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// No record existed; one was created.
    Created,
    /// The email changed; salt and hash were regenerated together.
    Rotated,
    /// The stored hash already matches the current email. Nothing written.
    Unchanged,
}

/// Reconcile the stored identity with the user's current email.
///
/// Storage failures propagate. In particular, a read error is *not*
/// treated as "record absent" — silently recreating an identity on a
/// transient storage fault would fork the salt away from every assertion
/// already issued against it.
pub fn sync_identity(store: &BadgeStore, user: &User) -> BadgeResult<SyncOutcome> {
    match store.get_identity(user.id)? {
        None => {
            let salt = generate_salt();
            let identity = Identity {
                user_id: user.id,
                kind: IdentityType::Email,
                hash: hash_identity(&user.email, &salt),
                hashed: true,
                salt,
            };
            store.put_identity(&identity)?;
            tracing::debug!(user_id = user.id, "identity created");
            Ok(SyncOutcome::Created)
        }
        Some(existing) => {
            let candidate = hash_identity(&user.email, &existing.salt);
            if candidate == existing.hash {
                return Ok(SyncOutcome::Unchanged);
            }
            let salt = generate_salt();
            let rotated = Identity {
                user_id: user.id,
                kind: existing.kind,
                hash: hash_identity(&user.email, &salt),
                hashed: true,
                salt,
            };
            // One record write: salt and hash land together or not at all.
            store.put_identity(&rotated)?;
            tracing::debug!(user_id = user.id, "identity salt rotated");
            Ok(SyncOutcome::Rotated)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with_user(email: &str) -> (BadgeStore, User) {
        let store = BadgeStore::open_temporary().expect("temp store");
        let user = store
            .create_user("alice", email)
            .unwrap()
            .expect("fresh email");
        (store, user)
    }

    #[test]
    fn first_sync_creates_identity() {
        let (store, user) = store_with_user("alice@example.com");
        let outcome = sync_identity(&store, &user).unwrap();
        assert_eq!(outcome, SyncOutcome::Created);

        let identity = store.get_identity(user.id).unwrap().expect("created");
        assert_eq!(identity.kind, IdentityType::Email);
        assert!(identity.hashed);
        assert_eq!(
            identity.hash,
            hash_identity("alice@example.com", &identity.salt)
        );
    }

    #[test]
    fn resync_with_same_email_is_a_noop() {
        let (store, user) = store_with_user("alice@example.com");
        sync_identity(&store, &user).unwrap();
        let before = store.get_identity(user.id).unwrap().unwrap();

        let outcome = sync_identity(&store, &user).unwrap();
        assert_eq!(outcome, SyncOutcome::Unchanged);

        let after = store.get_identity(user.id).unwrap().unwrap();
        // Neither salt nor hash moved.
        assert_eq!(before, after);
    }

    #[test]
    fn email_change_rotates_salt_and_hash_together() {
        let (store, mut user) = store_with_user("alice@example.com");
        sync_identity(&store, &user).unwrap();
        let before = store.get_identity(user.id).unwrap().unwrap();

        user.email = "alice@new.example.com".into();
        let outcome = sync_identity(&store, &user).unwrap();
        assert_eq!(outcome, SyncOutcome::Rotated);

        let after = store.get_identity(user.id).unwrap().unwrap();
        assert_ne!(before.salt, after.salt, "salt must rotate");
        assert_ne!(before.hash, after.hash, "hash must rotate");
        // The new pair is internally consistent.
        assert_eq!(
            after.hash,
            hash_identity("alice@new.example.com", &after.salt)
        );
    }

    #[test]
    fn rotation_never_reuses_the_old_salt() {
        let (store, mut user) = store_with_user("alice@example.com");
        sync_identity(&store, &user).unwrap();

        // A handful of back-and-forth changes; every rotation draws a fresh salt.
        let mut seen_salts = vec![store.get_identity(user.id).unwrap().unwrap().salt];
        for i in 0..4 {
            user.email = format!("alice+{i}@example.com");
            assert_eq!(sync_identity(&store, &user).unwrap(), SyncOutcome::Rotated);
            seen_salts.push(store.get_identity(user.id).unwrap().unwrap().salt);
        }
        let mut unique = seen_salts.clone();
        unique.sort();
        unique.dedup();
        assert_eq!(unique.len(), seen_salts.len());
    }

    #[test]
    fn identity_type_serializes_lowercase() {
        let json = serde_json::to_string(&IdentityType::Email).unwrap();
        assert_eq!(json, "\"email\"");
        assert_eq!(IdentityType::Email.as_str(), "email");
    }
}
