//! # Badge Catalog
//!
//! Badge definitions and their human-readable criteria pages. Catalog data
//! is reference data: written rarely through administrative action,
//! read constantly by validators fetching BadgeClass documents.
//!
//! A badge's slug is its public identity — it appears in every assertion
//! ever issued against the badge — so slugs are unique, URL-safe, and not
//! meant to change once awards reference them.

pub mod badge;
pub mod criterion;

pub use badge::{create_badge, get_badge, Alignment, Badge, BadgeClassDocument, Tag};
pub use criterion::{create_criterion, get_criterion, Criterion};
