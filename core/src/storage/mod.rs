//! # Storage
//!
//! Persistence for the badge service, built on sled. One request is one
//! logical transaction; the only cross-request coordination the core needs
//! — the `(user, badge)` uniqueness guarantee — is pushed down into a
//! storage-level compare-and-swap rather than application locks.

pub mod db;

pub use db::{BadgeStore, StoreError, StoreResult};
