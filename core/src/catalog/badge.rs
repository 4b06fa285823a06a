//! # Badge (BadgeClass)
//!
//! A badge definition and its canonical document form. The document is what
//! third-party validators fetch from `/badge/{slug}/`; every URL in it is
//! absolute so the document stands on its own.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::ServiceConfig;
use crate::error::{BadgeError, BadgeResult};
use crate::imaging::validate_png;
use crate::storage::BadgeStore;

/// A link from a badge to an external educational standard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alignment {
    pub name: String,
    pub url: String,
    pub description: Option<String>,
}

/// A free-form label attached to a badge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub name: String,
}

/// A badge definition.
///
/// The reference image is stored inline as PNG bytes; awards derive their
/// own baked copy from it at creation time but never mutate it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Badge {
    /// Short, descriptive title. Unique across the catalog.
    pub title: String,
    pub description: String,
    /// PNG bytes of the reference image.
    pub image: Vec<u8>,
    /// Filename the image was uploaded under, e.g. `python-master.png`.
    /// Award image names are derived from it by suffix substitution.
    pub image_name: String,
    /// URL (or URL-bearing text) describing how the badge is earned.
    pub criteria: String,
    /// Unique, URL-safe identifier. Appears in every issued assertion.
    pub slug: String,
    pub alignments: Vec<Alignment>,
    pub tags: Vec<Tag>,
    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,
}

impl Badge {
    /// Build a badge, validating the image and slug at the door.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        title: &str,
        description: &str,
        image: Vec<u8>,
        image_name: &str,
        criteria: &str,
        slug: &str,
        alignments: Vec<Alignment>,
        tags: Vec<Tag>,
    ) -> BadgeResult<Self> {
        validate_png(&image)?;
        validate_slug(slug)?;
        if title.is_empty() {
            return Err(BadgeError::Validation("badge title must not be empty".into()));
        }
        let now = Utc::now();
        Ok(Badge {
            title: title.to_string(),
            description: description.to_string(),
            image,
            image_name: image_name.to_string(),
            criteria: criteria.to_string(),
            slug: slug.to_string(),
            alignments,
            tags,
            created: now,
            modified: now,
        })
    }

    /// Absolute URL of this badge's BadgeClass document.
    pub fn absolute_url(&self, cfg: &ServiceConfig) -> String {
        cfg.badge_url(&self.slug)
    }

    /// Render the canonical BadgeClass document.
    pub fn to_document(&self, cfg: &ServiceConfig) -> BadgeClassDocument {
        BadgeClassDocument {
            name: self.title.clone(),
            description: self.description.clone(),
            image: cfg.badge_image_url(&self.slug),
            criteria: self.criteria.clone(),
            issuer: cfg.issuer_url(),
            alignment: self
                .alignments
                .iter()
                .map(|a| AlignmentDocument {
                    name: a.name.clone(),
                    url: a.url.clone(),
                    description: a.description.clone(),
                })
                .collect(),
            tags: self.tags.iter().map(|t| t.name.clone()).collect(),
        }
    }
}

/// Document form of an [`Alignment`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlignmentDocument {
    pub name: String,
    pub url: String,
    pub description: Option<String>,
}

/// The BadgeClass document served at `/badge/{slug}/`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BadgeClassDocument {
    pub name: String,
    pub description: String,
    /// Absolute URL of the reference image.
    pub image: String,
    pub criteria: String,
    /// Absolute URL of the issuer document.
    pub issuer: String,
    pub alignment: Vec<AlignmentDocument>,
    pub tags: Vec<String>,
}

/// Add a badge to the catalog. Title and slug must both be unused.
pub fn create_badge(store: &BadgeStore, badge: &Badge) -> BadgeResult<()> {
    if !store.create_badge(badge)? {
        return Err(BadgeError::Validation(format!(
            "badge title '{}' or slug '{}' already in use",
            badge.title, badge.slug
        )));
    }
    tracing::info!(slug = %badge.slug, title = %badge.title, "badge created");
    Ok(())
}

/// Look a badge up by slug.
pub fn get_badge(store: &BadgeStore, slug: &str) -> BadgeResult<Badge> {
    store
        .get_badge(slug)?
        .ok_or_else(|| BadgeError::not_found("badge", slug))
}

fn validate_slug(slug: &str) -> BadgeResult<()> {
    let ok = !slug.is_empty()
        && slug
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_');
    if !ok {
        return Err(BadgeError::Validation(format!(
            "slug must be non-empty and URL-safe, got '{slug}'"
        )));
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::config::BaseUrl;

    /// Shared across the crate's tests: a minimal valid badge.
    pub(crate) fn sample_badge(slug: &str, title: &str) -> Badge {
        Badge::new(
            title,
            "Awarded for demonstrated mastery.",
            crate::imaging::tests::tiny_png(),
            &format!("{slug}.png"),
            "https://example.org/criteria/mastery",
            slug,
            vec![Alignment {
                name: "Standard 42".into(),
                url: "https://standards.example.org/42".into(),
                description: None,
            }],
            vec![Tag {
                name: "programming".into(),
            }],
        )
        .expect("sample badge is valid")
    }

    fn cfg() -> ServiceConfig {
        ServiceConfig::new(BaseUrl::new("https://badges.example.org").unwrap())
    }

    #[test]
    fn new_rejects_non_png_image() {
        let err = Badge::new(
            "JPEG Badge",
            "desc",
            vec![0xFF, 0xD8, 0xFF, 0xE0],
            "bad.jpg",
            "criteria",
            "jpeg-badge",
            vec![],
            vec![],
        )
        .unwrap_err();
        assert!(matches!(err, BadgeError::Validation(_)));
    }

    #[test]
    fn new_rejects_bad_slug() {
        let png = crate::imaging::tests::tiny_png();
        for slug in ["", "has space", "has/slash", "é"] {
            let result = Badge::new("T", "d", png.clone(), "t.png", "c", slug, vec![], vec![]);
            assert!(result.is_err(), "slug '{slug}' should be rejected");
        }
    }

    #[test]
    fn document_uses_absolute_urls() {
        let badge = sample_badge("python-master", "Python Master");
        let doc = badge.to_document(&cfg());

        assert_eq!(doc.name, "Python Master");
        assert_eq!(
            doc.image,
            "https://badges.example.org/badge/python-master/image"
        );
        assert_eq!(doc.issuer, "https://badges.example.org/organization/");
        assert_eq!(doc.alignment.len(), 1);
        assert_eq!(doc.tags, vec!["programming".to_string()]);
    }

    #[test]
    fn catalog_create_and_lookup_roundtrip() {
        let store = BadgeStore::open_temporary().unwrap();
        let badge = sample_badge("python-master", "Python Master");
        create_badge(&store, &badge).unwrap();

        let found = get_badge(&store, "python-master").unwrap();
        assert_eq!(found.title, "Python Master");

        let err = get_badge(&store, "no-such-badge").unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn duplicate_slug_or_title_is_rejected() {
        let store = BadgeStore::open_temporary().unwrap();
        create_badge(&store, &sample_badge("python-master", "Python Master")).unwrap();

        // Same slug, different title.
        let err =
            create_badge(&store, &sample_badge("python-master", "Other Title")).unwrap_err();
        assert!(matches!(err, BadgeError::Validation(_)));

        // Same title, different slug.
        let err =
            create_badge(&store, &sample_badge("other-slug", "Python Master")).unwrap_err();
        assert!(matches!(err, BadgeError::Validation(_)));
    }
}
