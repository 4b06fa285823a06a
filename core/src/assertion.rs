//! # Assertion Service
//!
//! Read-side orchestration: given a lookup key, assemble the right
//! document or say why there isn't one. Every public read path funnels
//! through here, so the revocation gate cannot be forgotten by a handler.
//!
//! Assertion-by-id lookups resolve to exactly one of three states:
//!
//! ```text
//! uid --resolve--> absent ............................ NotFound
//!              \-> present --revoked?--> yes ......... Revoked
//!                                   \--> no .......... Valid(document)
//! ```

use crate::award::{Award, AssertionDocument};
use crate::catalog::Badge;
use crate::config::ServiceConfig;
use crate::error::{BadgeError, BadgeResult};
use crate::identity::{resolve_user, User, UserRef};
use crate::storage::BadgeStore;

/// Outcome of an assertion-by-id lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssertionLookup {
    /// The award exists and is in good standing.
    Valid(Box<AssertionDocument>),
    /// The award exists but has been revoked. Served as 410 Gone with a
    /// minimal `{"revoked": true}` body.
    Revoked,
    /// No award with this uid.
    NotFound,
}

/// Resolve an assertion by its public uid.
pub fn lookup_assertion(
    store: &BadgeStore,
    cfg: &ServiceConfig,
    uid: &str,
) -> BadgeResult<AssertionLookup> {
    let Some(award) = store.get_award(uid)? else {
        return Ok(AssertionLookup::NotFound);
    };
    if crate::revocation::is_revoked(store, &award.uid)? {
        return Ok(AssertionLookup::Revoked);
    }
    // A dangling user reference is a not-found, not a fault: users are
    // never deleted while awards reference them, so an absent row here is
    // an out-of-band data repair in progress.
    let Some(user) = store.get_user(award.user_id)? else {
        return Ok(AssertionLookup::NotFound);
    };
    Ok(AssertionLookup::Valid(Box::new(
        award.to_document(cfg, &user),
    )))
}

/// All awards held by a user, newest first, with the resolved user.
pub fn awards_for_user(
    store: &BadgeStore,
    user_ref: &UserRef,
) -> BadgeResult<(User, Vec<Award>)> {
    let user = resolve_user(store, user_ref)?;
    let mut awards = store.awards_for_user(user.id)?;
    awards.sort_by(|a, b| b.awarded.cmp(&a.awarded));
    Ok((user, awards))
}

/// The award linking a badge and a user, with both resolved entities.
pub fn award_for(
    store: &BadgeStore,
    badge_slug: &str,
    user_ref: &UserRef,
) -> BadgeResult<(User, Badge, Award)> {
    let badge = crate::catalog::get_badge(store, badge_slug)?;
    let user = resolve_user(store, user_ref)?;
    let uid = store
        .get_award_uid_for(user.id, badge_slug)?
        .ok_or_else(|| BadgeError::not_found("award", format!("{badge_slug}/{user_ref}")))?;
    let award = store
        .get_award(&uid)?
        .ok_or_else(|| BadgeError::not_found("award", uid))?;
    Ok((user, badge, award))
}

/// The badge's *reference* image for a recipient, gated on an award.
///
/// Deliberately not the award's baked copy: this endpoint exists for
/// displaying the badge next to the recipient's name, and the reference
/// image is the canonical artwork.
pub fn badge_image_for(
    store: &BadgeStore,
    badge_slug: &str,
    user_ref: &UserRef,
) -> BadgeResult<Vec<u8>> {
    let (_, badge, _) = award_for(store, badge_slug, user_ref)?;
    Ok(badge.image)
}
