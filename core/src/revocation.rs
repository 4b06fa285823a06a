//! # Revocation Registry
//!
//! A reason string keyed by award uid. Revocations gate assertion
//! visibility (a revoked award serves `{"revoked": true}` with 410 Gone)
//! and feed the public `/revoked/` list that validators poll.
//!
//! Revocations are created only through administrative action and are
//! never derived or auto-generated. The award side never stores a
//! `revoked` flag; it asks this registry every time.

use serde::{Deserialize, Serialize};

use crate::error::{BadgeError, BadgeResult};
use crate::storage::BadgeStore;

/// A revocation entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Revocation {
    pub award_uid: String,
    pub reason: String,
}

/// Revoke an award by uid. The award must exist; revoking a uid that was
/// never issued is an administrative error worth surfacing.
pub fn revoke(store: &BadgeStore, award_uid: &str, reason: &str) -> BadgeResult<()> {
    if store.get_award(award_uid)?.is_none() {
        return Err(BadgeError::not_found("award", award_uid));
    }
    store.put_revocation(award_uid, reason)?;
    tracing::info!(uid = award_uid, reason, "award revoked");
    Ok(())
}

/// Whether any revocation exists for the given award uid.
pub fn is_revoked(store: &BadgeStore, award_uid: &str) -> BadgeResult<bool> {
    Ok(store.get_revocation(award_uid)?.is_some())
}

/// The public revocation feed: one single-entry `{uid: reason}` object per
/// revocation, order-insensitive.
pub fn revocation_list(store: &BadgeStore) -> BadgeResult<Vec<serde_json::Value>> {
    let mut entries = Vec::new();
    for (uid, reason) in store.revocations()? {
        let mut object = serde_json::Map::new();
        object.insert(uid, serde_json::Value::String(reason));
        entries.push(serde_json::Value::Object(object));
    }
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::badge::tests::sample_badge;
    use crate::config::{BaseUrl, ServiceConfig};
    use crate::identity::register_user;

    fn store_with_award() -> (BadgeStore, String) {
        let store = BadgeStore::open_temporary().unwrap();
        let cfg = ServiceConfig::new(BaseUrl::new("https://badges.example.org").unwrap());
        crate::catalog::create_badge(&store, &sample_badge("rustacean", "Rustacean")).unwrap();
        let user = register_user(&store, "alice", "alice@example.com").unwrap();
        let award =
            crate::award::create_award(&store, &cfg, user.id, "rustacean", None, None).unwrap();
        (store, award.uid)
    }

    #[test]
    fn revoke_then_check() {
        let (store, uid) = store_with_award();
        assert!(!is_revoked(&store, &uid).unwrap());
        revoke(&store, &uid, "policy violation").unwrap();
        assert!(is_revoked(&store, &uid).unwrap());
    }

    #[test]
    fn revoking_unknown_award_is_not_found() {
        let store = BadgeStore::open_temporary().unwrap();
        let err = revoke(&store, "no-such-uid", "reason").unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn list_renders_single_entry_objects() {
        let (store, uid) = store_with_award();
        assert!(revocation_list(&store).unwrap().is_empty());

        revoke(&store, &uid, "policy violation").unwrap();
        let list = revocation_list(&store).unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0][&uid], "policy violation");
    }

    #[test]
    fn re_revoking_updates_the_reason() {
        // Storage holds at most one entry per uid; the latest reason wins.
        let (store, uid) = store_with_award();
        revoke(&store, &uid, "first reason").unwrap();
        revoke(&store, &uid, "second reason").unwrap();

        let list = revocation_list(&store).unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0][&uid], "second reason");
    }
}
