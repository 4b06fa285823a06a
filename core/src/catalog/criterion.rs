//! # Criterion Pages
//!
//! Human-readable award criteria served at `/criterion/{slug}/`. The page
//! rendering is the server's concern; this module owns the entity and its
//! lookup.

use serde::{Deserialize, Serialize};

use crate::error::{BadgeError, BadgeResult};
use crate::storage::BadgeStore;

/// A criterion page: what someone must do to earn an achievement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Criterion {
    pub name: String,
    /// Unique, URL-safe identifier.
    pub slug: String,
    pub description: String,
}

/// Add a criterion. Slugs are unique.
pub fn create_criterion(store: &BadgeStore, criterion: &Criterion) -> BadgeResult<()> {
    if !store.create_criterion(criterion)? {
        return Err(BadgeError::Validation(format!(
            "criterion slug '{}' already in use",
            criterion.slug
        )));
    }
    Ok(())
}

/// Look a criterion up by slug.
pub fn get_criterion(store: &BadgeStore, slug: &str) -> BadgeResult<Criterion> {
    store
        .get_criterion(slug)?
        .ok_or_else(|| BadgeError::not_found("criterion", slug))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_and_lookup() {
        let store = BadgeStore::open_temporary().unwrap();
        let criterion = Criterion {
            name: "Mastery".into(),
            slug: "mastery".into(),
            description: "Complete all exercises with a passing grade.".into(),
        };
        create_criterion(&store, &criterion).unwrap();

        assert_eq!(get_criterion(&store, "mastery").unwrap(), criterion);
        assert!(get_criterion(&store, "missing").unwrap_err().is_not_found());
    }

    #[test]
    fn duplicate_slug_rejected() {
        let store = BadgeStore::open_temporary().unwrap();
        let criterion = Criterion {
            name: "Mastery".into(),
            slug: "mastery".into(),
            description: "desc".into(),
        };
        create_criterion(&store, &criterion).unwrap();
        assert!(create_criterion(&store, &criterion).is_err());
    }
}
