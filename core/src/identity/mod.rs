//! # Identity Protection
//!
//! Recipients are identified to the outside world only by a salted one-way
//! hash of their email. This module owns the whole pipeline: the user
//! directory, the hash construction, and the reconciliation rules that keep
//! a user's salt and hash consistent when the underlying email changes.
//!
//! The one invariant everything here defends: a stored identity always
//! satisfies `hash == sha256$hex(sha256(email + salt))` for the *current*
//! email. Salt and hash rotate together or not at all — a hash computed
//! against a stale salt is unverifiable, which is worse than no hash.

pub mod hasher;
pub mod reconcile;
pub mod user;

pub use hasher::{generate_salt, hash_identity};
pub use reconcile::{sync_identity, Identity, IdentityType, SyncOutcome};
pub use user::{change_email, register_user, resolve_user, User, UserRef};
