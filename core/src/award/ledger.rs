//! # Award Creation & Assertion Documents
//!
//! ## Identity snapshot
//!
//! An award copies the recipient's identity fields (hash, type, hashed
//! flag, salt) at creation and never re-syncs them. An email change after
//! the award rotates the *live* identity but leaves the snapshot frozen —
//! the assertion was issued to who the recipient was at award time, and
//! rewriting it would break any copy a validator already fetched.
//!
//! ## Image baking
//!
//! The award's own image is the badge's reference PNG with the absolute
//! assertion URL baked into a `tEXt` chunk. Baking happens exactly once,
//! here; re-saving an award never re-derives the image. A baking failure
//! aborts the whole creation — an award without provenance is worse than
//! no award.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::{ServiceConfig, BADGE_DATE_FORMAT, VERIFY_TYPE_HOSTED};
use crate::error::{BadgeError, BadgeResult};
use crate::identity::{IdentityType, User};
use crate::imaging::{assertion_image_name, bake_assertion_url};
use crate::storage::BadgeStore;

/// A badge granted to a recipient, with a frozen identity snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Award {
    /// Public assertion identifier. Globally unique, generated at creation.
    pub uid: String,
    pub user_id: u64,
    pub badge_slug: String,
    /// Set at creation, immutable afterwards.
    pub awarded: DateTime<Utc>,
    /// Optional URL pointing at evidence for the award.
    pub evidence: Option<String>,
    /// Baked PNG: the badge image with the assertion URL embedded.
    pub image: Option<Vec<u8>>,
    /// Derived filename (`<badge image stem>_assertion.png`).
    pub image_name: Option<String>,
    /// After this instant the badge should no longer be considered valid.
    /// Rendered into the document; enforcement is the validator's job.
    pub expires: Option<DateTime<Utc>>,
    pub modified: DateTime<Utc>,

    // Identity snapshot, copied from the live Identity exactly once.
    pub identity_type: IdentityType,
    pub identity_hash: String,
    pub identity_hashed: bool,
    pub identity_salt: String,
}

/// The `recipient` object of an assertion document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipientDocument {
    pub identity: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub hashed: bool,
    pub salt: String,
}

/// The `verify` object of an assertion document. `type` is always
/// `"hosted"` — signed verification is unsupported.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyDocument {
    #[serde(rename = "type")]
    pub kind: String,
    pub url: String,
}

/// The assertion document served at `/assertion/{uid}/`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssertionDocument {
    pub uid: String,
    pub recipient: RecipientDocument,
    /// Absolute URL of the BadgeClass document.
    pub badge: String,
    pub verify: VerifyDocument,
    #[serde(rename = "issuedOn")]
    pub issued_on: String,
    /// Absolute URL of the recipient's badge image, or empty string when
    /// no baked image exists.
    pub image: String,
    pub evidence: Option<String>,
    /// `YYYY-MM-DD`, or empty string when the award does not expire.
    pub expires: String,
}

/// Create an award: uniqueness reservation, uid generation, identity
/// snapshot, image baking, persist.
///
/// The `(user, badge)` pair is reserved first through an atomic
/// compare-and-swap in the store, so two concurrent creations for the same
/// pair see exactly one success and one [`BadgeError::Conflict`]. Any
/// failure after the reservation releases it before propagating.
pub fn create_award(
    store: &BadgeStore,
    cfg: &ServiceConfig,
    user_id: u64,
    badge_slug: &str,
    evidence: Option<String>,
    expires: Option<DateTime<Utc>>,
) -> BadgeResult<Award> {
    let badge = store
        .get_badge(badge_slug)?
        .ok_or_else(|| BadgeError::not_found("badge", badge_slug))?;
    let user = store
        .get_user(user_id)?
        .ok_or_else(|| BadgeError::not_found("user", user_id.to_string()))?;
    // The identity record is created with the user; its absence here means
    // the user was written through some path that skipped reconciliation.
    let identity = store
        .get_identity(user.id)?
        .ok_or_else(|| BadgeError::not_found("identity", user_id.to_string()))?;

    let uid = Uuid::new_v4().to_string();

    if !store.reserve_award_pair(user_id, badge_slug, &uid)? {
        return Err(BadgeError::Conflict {
            user_id,
            badge_slug: badge_slug.to_string(),
        });
    }

    let baked = match bake_assertion_url(&badge.image, &cfg.assertion_url(&uid)) {
        Ok(bytes) => bytes,
        Err(e) => {
            store.release_award_pair(user_id, badge_slug)?;
            return Err(e);
        }
    };

    let now = Utc::now();
    let award = Award {
        uid,
        user_id,
        badge_slug: badge_slug.to_string(),
        awarded: now,
        evidence,
        image: Some(baked),
        image_name: Some(assertion_image_name(&badge.image_name)),
        expires,
        modified: now,
        identity_type: identity.kind,
        identity_hash: identity.hash,
        identity_hashed: identity.hashed,
        identity_salt: identity.salt,
    };

    if let Err(e) = store.put_award(&award) {
        store.release_award_pair(user_id, badge_slug)?;
        return Err(e.into());
    }

    tracing::info!(uid = %award.uid, user_id, badge = badge_slug, "award created");
    Ok(award)
}

/// Whether the award has been revoked.
///
/// Always a live lookup against the revocation registry — never a stored
/// flag that could drift out of sync with it.
pub fn is_revoked(store: &BadgeStore, award: &Award) -> BadgeResult<bool> {
    Ok(store.get_revocation(&award.uid)?.is_some())
}

impl Award {
    /// Absolute URL of this award's hosted assertion document.
    pub fn absolute_url(&self, cfg: &ServiceConfig) -> String {
        cfg.assertion_url(&self.uid)
    }

    /// Render the assertion document.
    ///
    /// `recipient` is the award's user, passed in by the caller (the
    /// ledger stores ids, not joined rows). Only the email is read from
    /// it, to build the public image URL.
    pub fn to_document(&self, cfg: &ServiceConfig, recipient: &User) -> AssertionDocument {
        AssertionDocument {
            uid: self.uid.clone(),
            recipient: RecipientDocument {
                identity: self.identity_hash.clone(),
                kind: self.identity_type.as_str().to_string(),
                hashed: self.identity_hashed,
                salt: self.identity_salt.clone(),
            },
            badge: cfg.badge_url(&self.badge_slug),
            verify: VerifyDocument {
                kind: VERIFY_TYPE_HOSTED.to_string(),
                url: self.absolute_url(cfg),
            },
            issued_on: self.awarded.format(BADGE_DATE_FORMAT).to_string(),
            image: match self.image {
                Some(_) => cfg.award_image_url(&self.badge_slug, &recipient.email),
                None => String::new(),
            },
            evidence: self.evidence.clone(),
            expires: self
                .expires
                .map(|e| e.format(BADGE_DATE_FORMAT).to_string())
                .unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::badge::tests::sample_badge;
    use crate::config::BaseUrl;
    use crate::identity::register_user;
    use chrono::TimeZone;
    use std::io::Cursor;

    fn setup() -> (BadgeStore, ServiceConfig, User) {
        let store = BadgeStore::open_temporary().unwrap();
        let cfg = ServiceConfig::new(BaseUrl::new("https://badges.example.org").unwrap());
        crate::catalog::create_badge(&store, &sample_badge("python-master", "Python Master"))
            .unwrap();
        let user = register_user(&store, "alice", "alice@example.com").unwrap();
        (store, cfg, user)
    }

    #[test]
    fn create_persists_award_and_snapshot() {
        let (store, cfg, user) = setup();
        let award = create_award(&store, &cfg, user.id, "python-master", None, None).unwrap();

        let identity = store.get_identity(user.id).unwrap().unwrap();
        assert_eq!(award.identity_hash, identity.hash);
        assert_eq!(award.identity_salt, identity.salt);
        assert!(award.identity_hashed);

        let reloaded = store.get_award(&award.uid).unwrap().expect("persisted");
        assert_eq!(reloaded, award);
    }

    #[test]
    fn duplicate_pair_conflicts_first_succeeds() {
        let (store, cfg, user) = setup();
        create_award(&store, &cfg, user.id, "python-master", None, None).unwrap();

        let err = create_award(&store, &cfg, user.id, "python-master", None, None).unwrap_err();
        assert!(matches!(err, BadgeError::Conflict { .. }));

        // Exactly one award exists for the user.
        assert_eq!(store.awards_for_user(user.id).unwrap().len(), 1);
    }

    #[test]
    fn missing_badge_or_user_is_not_found() {
        let (store, cfg, user) = setup();
        assert!(create_award(&store, &cfg, user.id, "no-such-badge", None, None)
            .unwrap_err()
            .is_not_found());
        assert!(create_award(&store, &cfg, 999, "python-master", None, None)
            .unwrap_err()
            .is_not_found());
    }

    #[test]
    fn baked_image_carries_the_assertion_url() {
        let (store, cfg, user) = setup();
        let award = create_award(&store, &cfg, user.id, "python-master", None, None).unwrap();

        let baked = award.image.as_deref().expect("image baked at creation");
        let decoder = png::Decoder::new(Cursor::new(baked));
        let reader = decoder.read_info().unwrap();
        let chunk = &reader.info().uncompressed_latin1_text[0];
        assert_eq!(chunk.keyword, "openbadges");
        assert_eq!(chunk.text, cfg.assertion_url(&award.uid));

        assert_eq!(award.image_name.as_deref(), Some("python-master_assertion.png"));
    }

    #[test]
    fn snapshot_is_frozen_across_email_change() {
        let (store, cfg, user) = setup();
        let award = create_award(&store, &cfg, user.id, "python-master", None, None).unwrap();
        let snapshot_hash = award.identity_hash.clone();
        let snapshot_salt = award.identity_salt.clone();

        crate::identity::change_email(&store, user.id, "alice@new.example.com").unwrap();

        // The live identity rotated...
        let live = store.get_identity(user.id).unwrap().unwrap();
        assert_ne!(live.hash, snapshot_hash);
        assert_ne!(live.salt, snapshot_salt);

        // ...the award snapshot did not.
        let reloaded = store.get_award(&award.uid).unwrap().unwrap();
        assert_eq!(reloaded.identity_hash, snapshot_hash);
        assert_eq!(reloaded.identity_salt, snapshot_salt);
    }

    #[test]
    fn failed_bake_releases_the_pair_reservation() {
        let (store, cfg, user) = setup();
        // Corrupt the stored badge image after creation to make baking fail.
        let mut badge = store.get_badge("python-master").unwrap().unwrap();
        badge.image = b"no longer a png".to_vec();
        store.put_badge(&badge).unwrap();

        let err = create_award(&store, &cfg, user.id, "python-master", None, None).unwrap_err();
        assert!(matches!(err, BadgeError::Png(_)));

        // The reservation was rolled back: fixing the image lets a retry win.
        let fixed = sample_badge("python-master", "Python Master");
        store.put_badge(&fixed).unwrap();
        create_award(&store, &cfg, user.id, "python-master", None, None)
            .expect("retry after rollback should succeed");
    }

    #[test]
    fn document_renders_per_the_hosted_format() {
        let (store, cfg, user) = setup();
        let expires = Utc.with_ymd_and_hms(2027, 1, 31, 12, 0, 0).unwrap();
        let award = create_award(
            &store,
            &cfg,
            user.id,
            "python-master",
            Some("https://example.org/evidence/alice".into()),
            Some(expires),
        )
        .unwrap();

        let doc = award.to_document(&cfg, &user);
        assert_eq!(doc.uid, award.uid);
        assert_eq!(doc.verify.kind, "hosted");
        assert_eq!(
            doc.verify.url,
            format!("https://badges.example.org/assertion/{}/", award.uid)
        );
        assert_eq!(doc.badge, "https://badges.example.org/badge/python-master/");
        assert_eq!(doc.recipient.identity, award.identity_hash);
        assert_eq!(doc.recipient.kind, "email");
        assert_eq!(doc.issued_on, award.awarded.format("%Y-%m-%d").to_string());
        assert_eq!(doc.expires, "2027-01-31");
        assert_eq!(
            doc.image,
            "https://badges.example.org/badge_image/python-master/alice@example.com/image"
        );
        assert_eq!(
            doc.evidence.as_deref(),
            Some("https://example.org/evidence/alice")
        );
    }

    #[test]
    fn document_empty_fields_when_unset() {
        let (store, cfg, user) = setup();
        let mut award = create_award(&store, &cfg, user.id, "python-master", None, None).unwrap();
        // Unset expiry renders as empty string, evidence as null.
        let doc = award.to_document(&cfg, &user);
        assert_eq!(doc.expires, "");
        assert!(doc.evidence.is_none());

        // An award with no image renders an empty image URL.
        award.image = None;
        let doc = award.to_document(&cfg, &user);
        assert_eq!(doc.image, "");

        // JSON shape: evidence serializes as null, expires as "".
        let json = serde_json::to_value(&doc).unwrap();
        assert!(json["evidence"].is_null());
        assert_eq!(json["expires"], "");
        assert_eq!(json["verify"]["type"], "hosted");
    }

    #[test]
    fn revocation_flips_is_revoked() {
        let (store, cfg, user) = setup();
        let award = create_award(&store, &cfg, user.id, "python-master", None, None).unwrap();

        assert!(!is_revoked(&store, &award).unwrap());
        crate::revocation::revoke(&store, &award.uid, "policy violation").unwrap();
        assert!(is_revoked(&store, &award).unwrap());
    }
}
