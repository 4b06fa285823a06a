//! # Award Ledger
//!
//! One award = one badge granted to one recipient. Awards are the only
//! transactional entity in the system, and creation is the only interesting
//! write: a single explicit sequence that reserves the `(user, badge)` pair,
//! snapshots the recipient's identity, bakes the provenance image, and
//! persists the result — in that order, with the reservation released if a
//! later step fails.
//!
//! There are no save-hooks. Whatever an award looked like the moment it was
//! created is what validators see forever.

pub mod ledger;

pub use ledger::{
    create_award, is_revoked, AssertionDocument, Award, RecipientDocument, VerifyDocument,
};
