//! # BadgeStore — Persistent Storage Engine
//!
//! All on-disk state flows through this module, organized into sled trees
//! (independent B+ trees with their own keyspaces):
//!
//! | Tree           | Key                      | Value                 |
//! |----------------|--------------------------|-----------------------|
//! | `users`        | `user_id` (8B BE)        | `bincode(User)`       |
//! | `user_emails`  | email (UTF-8)            | `user_id` (8B BE)     |
//! | `identities`   | `user_id` (8B BE)        | `bincode(Identity)`   |
//! | `badges`       | slug (UTF-8)             | `bincode(Badge)`      |
//! | `badge_titles` | title (UTF-8)            | slug (UTF-8)          |
//! | `awards`       | uid (UTF-8)              | `bincode(Award)`      |
//! | `award_pairs`  | `user_id` (8B BE) + slug | uid (UTF-8)           |
//! | `revocations`  | uid (UTF-8)              | reason (UTF-8)        |
//! | `criteria`     | slug (UTF-8)             | `bincode(Criterion)`  |
//! | `meta`         | key (UTF-8)              | value (bytes)         |
//!
//! User ids are stored big-endian so sled's lexicographic ordering matches
//! numeric ordering. The `award_pairs` key starts with the fixed-width id,
//! so a prefix scan over those 8 bytes enumerates one user's awards.
//!
//! ## Uniqueness
//!
//! Uniqueness constraints (`user_emails`, `badge_titles`, slugs,
//! `award_pairs`) are enforced with `compare_and_swap` against an absent
//! key. Under concurrent writers, sled guarantees exactly one CAS wins;
//! the losers observe the conflict and report it upward. No application
//! level locking anywhere.

use sled::{Db, Tree};
use std::path::Path;

use crate::award::Award;
use crate::catalog::{Badge, Criterion};
use crate::identity::{Identity, User};
use crate::issuer::Issuer;

// ---------------------------------------------------------------------------
// Error Type
// ---------------------------------------------------------------------------

/// Errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("sled error: {0}")]
    Sled(#[from] sled::Error),

    #[error("serialization error: {0}")]
    Serialization(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

// ---------------------------------------------------------------------------
// Metadata Keys
// ---------------------------------------------------------------------------

/// Well-known key in the `meta` tree for the singleton issuer profile.
const META_ISSUER: &[u8] = b"issuer";

// ---------------------------------------------------------------------------
// BadgeStore
// ---------------------------------------------------------------------------

/// Persistent storage engine for the badge service.
///
/// Wraps a sled `Db` and exposes typed accessors per entity family. All
/// values are bincode. sled supports lock-free concurrent reads and
/// serialized writes, so a `BadgeStore` is shared across threads behind
/// `Arc` without external synchronization.
#[derive(Debug, Clone)]
pub struct BadgeStore {
    /// The underlying sled database handle.
    db: Db,
    users: Tree,
    /// Unique index: email -> user id.
    user_emails: Tree,
    identities: Tree,
    badges: Tree,
    /// Unique index: title -> slug.
    badge_titles: Tree,
    awards: Tree,
    /// Unique index and reservation lock: (user id, badge slug) -> uid.
    award_pairs: Tree,
    revocations: Tree,
    criteria: Tree,
    meta: Tree,
}

fn ser<T: serde::Serialize>(value: &T) -> StoreResult<Vec<u8>> {
    bincode::serialize(value).map_err(|e| StoreError::Serialization(e.to_string()))
}

fn de<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> StoreResult<T> {
    bincode::deserialize(bytes).map_err(|e| StoreError::Serialization(e.to_string()))
}

fn user_key(id: u64) -> [u8; 8] {
    id.to_be_bytes()
}

fn pair_key(user_id: u64, badge_slug: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(8 + badge_slug.len());
    key.extend_from_slice(&user_key(user_id));
    key.extend_from_slice(badge_slug.as_bytes());
    key
}

impl BadgeStore {
    /// Open or create a database at the given filesystem path.
    pub fn open<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        let db = sled::open(path)?;
        Self::from_db(db)
    }

    /// Create a temporary database, cleaned up on drop. For tests.
    pub fn open_temporary() -> StoreResult<Self> {
        let config = sled::Config::new().temporary(true);
        let db = config.open()?;
        Self::from_db(db)
    }

    fn from_db(db: Db) -> StoreResult<Self> {
        Ok(Self {
            users: db.open_tree("users")?,
            user_emails: db.open_tree("user_emails")?,
            identities: db.open_tree("identities")?,
            badges: db.open_tree("badges")?,
            badge_titles: db.open_tree("badge_titles")?,
            awards: db.open_tree("awards")?,
            award_pairs: db.open_tree("award_pairs")?,
            revocations: db.open_tree("revocations")?,
            criteria: db.open_tree("criteria")?,
            meta: db.open_tree("meta")?,
            db,
        })
    }

    // -- User operations ----------------------------------------------------

    /// Create a user with a freshly assigned id.
    ///
    /// Returns `Ok(None)` when the email is already indexed — email
    /// uniqueness is claimed via CAS before the user row is written, so two
    /// racing registrations of the same address produce one winner.
    pub fn create_user(&self, username: &str, email: &str) -> StoreResult<Option<User>> {
        let id = self.db.generate_id()?;
        if self
            .user_emails
            .compare_and_swap(email.as_bytes(), None::<&[u8]>, Some(&user_key(id)[..]))?
            .is_err()
        {
            return Ok(None);
        }
        let user = User {
            id,
            username: username.to_string(),
            email: email.to_string(),
        };
        self.users.insert(user_key(id), ser(&user)?)?;
        Ok(Some(user))
    }

    /// Retrieve a user by id.
    pub fn get_user(&self, id: u64) -> StoreResult<Option<User>> {
        match self.users.get(user_key(id))? {
            Some(bytes) => Ok(Some(de(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Retrieve a user through the email index.
    pub fn get_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        match self.user_emails.get(email.as_bytes())? {
            Some(id_bytes) => {
                let id = u64::from_be_bytes(id_bytes.as_ref().try_into().map_err(|_| {
                    StoreError::Serialization("invalid user id bytes in email index".into())
                })?);
                self.get_user(id)
            }
            None => Ok(None),
        }
    }

    /// Move a user to a new email address.
    ///
    /// Claims the new index entry first (CAS), then rewrites the user row,
    /// then drops the old index entry — so at no point can the new address
    /// resolve to nobody. Returns `Ok(None)` if the new address is taken.
    pub fn change_user_email(&self, user: &User, new_email: &str) -> StoreResult<Option<User>> {
        if user.email == new_email {
            return Ok(Some(user.clone()));
        }
        if self
            .user_emails
            .compare_and_swap(
                new_email.as_bytes(),
                None::<&[u8]>,
                Some(&user_key(user.id)[..]),
            )?
            .is_err()
        {
            return Ok(None);
        }
        let updated = User {
            id: user.id,
            username: user.username.clone(),
            email: new_email.to_string(),
        };
        self.users.insert(user_key(user.id), ser(&updated)?)?;
        self.user_emails.remove(user.email.as_bytes())?;
        Ok(Some(updated))
    }

    // -- Identity operations ------------------------------------------------

    /// Persist an identity record. One key, one value — salt and hash land
    /// in the same atomic write.
    pub fn put_identity(&self, identity: &Identity) -> StoreResult<()> {
        self.identities
            .insert(user_key(identity.user_id), ser(identity)?)?;
        Ok(())
    }

    /// Retrieve the identity record for a user, `None` when absent.
    ///
    /// Callers must treat `Err` as a fault, not as absence.
    pub fn get_identity(&self, user_id: u64) -> StoreResult<Option<Identity>> {
        match self.identities.get(user_key(user_id))? {
            Some(bytes) => Ok(Some(de(&bytes)?)),
            None => Ok(None),
        }
    }

    // -- Badge operations ---------------------------------------------------

    /// Insert a badge, claiming both unique indexes.
    ///
    /// Returns `false` when the slug or the title is already in use. A
    /// title claimed against a losing slug CAS is rolled back before
    /// returning.
    pub fn create_badge(&self, badge: &Badge) -> StoreResult<bool> {
        if self
            .badge_titles
            .compare_and_swap(
                badge.title.as_bytes(),
                None::<&[u8]>,
                Some(badge.slug.as_bytes()),
            )?
            .is_err()
        {
            return Ok(false);
        }
        if self
            .badges
            .compare_and_swap(badge.slug.as_bytes(), None::<&[u8]>, Some(ser(badge)?))?
            .is_err()
        {
            self.badge_titles.remove(badge.title.as_bytes())?;
            return Ok(false);
        }
        Ok(true)
    }

    /// Overwrite a badge's content in place. Slug and title must be
    /// unchanged — identity moves need a migration, not an update.
    pub fn put_badge(&self, badge: &Badge) -> StoreResult<()> {
        self.badges.insert(badge.slug.as_bytes(), ser(badge)?)?;
        Ok(())
    }

    /// Retrieve a badge by slug.
    pub fn get_badge(&self, slug: &str) -> StoreResult<Option<Badge>> {
        match self.badges.get(slug.as_bytes())? {
            Some(bytes) => Ok(Some(de(&bytes)?)),
            None => Ok(None),
        }
    }

    // -- Award operations ---------------------------------------------------

    /// Atomically reserve the `(user, badge)` pair for a new award.
    ///
    /// Returns `false` when the pair is already held. This is the entire
    /// concurrency story for award creation: exactly one CAS wins.
    pub fn reserve_award_pair(
        &self,
        user_id: u64,
        badge_slug: &str,
        uid: &str,
    ) -> StoreResult<bool> {
        Ok(self
            .award_pairs
            .compare_and_swap(
                pair_key(user_id, badge_slug),
                None::<&[u8]>,
                Some(uid.as_bytes()),
            )?
            .is_ok())
    }

    /// Release a pair reservation after a failed creation.
    pub fn release_award_pair(&self, user_id: u64, badge_slug: &str) -> StoreResult<()> {
        self.award_pairs.remove(pair_key(user_id, badge_slug))?;
        Ok(())
    }

    /// Persist an award keyed by uid.
    pub fn put_award(&self, award: &Award) -> StoreResult<()> {
        self.awards.insert(award.uid.as_bytes(), ser(award)?)?;
        Ok(())
    }

    /// Retrieve an award by uid.
    pub fn get_award(&self, uid: &str) -> StoreResult<Option<Award>> {
        match self.awards.get(uid.as_bytes())? {
            Some(bytes) => Ok(Some(de(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Look up the award uid for a `(user, badge)` pair.
    pub fn get_award_uid_for(
        &self,
        user_id: u64,
        badge_slug: &str,
    ) -> StoreResult<Option<String>> {
        match self.award_pairs.get(pair_key(user_id, badge_slug))? {
            Some(bytes) => Ok(Some(String::from_utf8_lossy(&bytes).into_owned())),
            None => Ok(None),
        }
    }

    /// All awards held by a user, via a prefix scan over the pair index.
    pub fn awards_for_user(&self, user_id: u64) -> StoreResult<Vec<Award>> {
        let mut awards = Vec::new();
        for entry in self.award_pairs.scan_prefix(user_key(user_id)) {
            let (_key, uid_bytes) = entry?;
            let uid = String::from_utf8_lossy(&uid_bytes).into_owned();
            if let Some(award) = self.get_award(&uid)? {
                awards.push(award);
            }
        }
        Ok(awards)
    }

    // -- Revocation operations ----------------------------------------------

    /// Record (or replace) the revocation reason for an award uid.
    pub fn put_revocation(&self, award_uid: &str, reason: &str) -> StoreResult<()> {
        self.revocations
            .insert(award_uid.as_bytes(), reason.as_bytes())?;
        Ok(())
    }

    /// The revocation reason for an award uid, `None` when not revoked.
    pub fn get_revocation(&self, award_uid: &str) -> StoreResult<Option<String>> {
        match self.revocations.get(award_uid.as_bytes())? {
            Some(bytes) => Ok(Some(String::from_utf8_lossy(&bytes).into_owned())),
            None => Ok(None),
        }
    }

    /// Every revocation as `(uid, reason)` pairs.
    pub fn revocations(&self) -> StoreResult<Vec<(String, String)>> {
        let mut entries = Vec::new();
        for entry in self.revocations.iter() {
            let (uid, reason) = entry?;
            entries.push((
                String::from_utf8_lossy(&uid).into_owned(),
                String::from_utf8_lossy(&reason).into_owned(),
            ));
        }
        Ok(entries)
    }

    // -- Criterion operations -----------------------------------------------

    /// Insert a criterion; `false` when the slug is taken.
    pub fn create_criterion(&self, criterion: &Criterion) -> StoreResult<bool> {
        Ok(self
            .criteria
            .compare_and_swap(
                criterion.slug.as_bytes(),
                None::<&[u8]>,
                Some(ser(criterion)?),
            )?
            .is_ok())
    }

    /// Retrieve a criterion by slug.
    pub fn get_criterion(&self, slug: &str) -> StoreResult<Option<Criterion>> {
        match self.criteria.get(slug.as_bytes())? {
            Some(bytes) => Ok(Some(de(&bytes)?)),
            None => Ok(None),
        }
    }

    // -- Issuer operations --------------------------------------------------

    /// Store the singleton issuer profile.
    pub fn set_issuer(&self, issuer: &Issuer) -> StoreResult<()> {
        self.meta.insert(META_ISSUER, ser(issuer)?)?;
        Ok(())
    }

    /// Retrieve the issuer profile, `None` when never configured.
    pub fn get_issuer(&self) -> StoreResult<Option<Issuer>> {
        match self.meta.get(META_ISSUER)? {
            Some(bytes) => Ok(Some(de(&bytes)?)),
            None => Ok(None),
        }
    }

    // -- Utility operations -------------------------------------------------

    pub fn user_count(&self) -> usize {
        self.users.len()
    }

    pub fn badge_count(&self) -> usize {
        self.badges.len()
    }

    pub fn award_count(&self) -> usize {
        self.awards.len()
    }

    pub fn revocation_count(&self) -> usize {
        self.revocations.len()
    }

    /// Block until all pending writes are durable on disk.
    pub fn flush(&self) -> StoreResult<()> {
        self.db.flush()?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
