//! # Identity Hashing
//!
//! The hash an assertion publishes instead of a recipient's email:
//! `"sha256$" + hex(sha256(email + salt))`. The algorithm tag prefix is part
//! of the Open Badges recipient format — validators parse it to know which
//! digest to recompute.
//!
//! The salt exists to frustrate dictionary attacks against the published
//! hash (email address spaces are small enough to enumerate). It is not a
//! secret in the cryptographic sense — assertions publish it — but it must
//! be unpredictable, so it comes from the OS-seeded thread RNG and never
//! from anything like a counter.

use rand::Rng;
use sha2::{Digest, Sha256};

/// Algorithm tag prefixed to every identity hash.
pub const HASH_ALGORITHM_TAG: &str = "sha256$";

/// Salt length in hex characters. 16 hex chars = 64 bits of entropy,
/// comfortably past birthday territory for any realistic user population.
pub const SALT_LENGTH: usize = 16;

const HEX_CHARS: &[u8; 16] = b"0123456789abcdef";

/// Compute the salted identity hash for a raw identity string.
///
/// Deterministic: the same `(raw_identity, salt)` pair always produces the
/// same output. The digest input is the concatenation `raw_identity + salt`,
/// matching what badge validators recompute.
pub fn hash_identity(raw_identity: &str, salt: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(raw_identity.as_bytes());
    hasher.update(salt.as_bytes());
    format!("{}{}", HASH_ALGORITHM_TAG, hex::encode(hasher.finalize()))
}

/// Generate a fresh random salt from the thread-local CSPRNG.
pub fn generate_salt() -> String {
    let mut rng = rand::thread_rng();
    (0..SALT_LENGTH)
        .map(|_| HEX_CHARS[rng.gen_range(0..HEX_CHARS.len())] as char)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_deterministic() {
        let a = hash_identity("alice@example.com", "abc123");
        let b = hash_identity("alice@example.com", "abc123");
        assert_eq!(a, b);
    }

    #[test]
    fn hash_carries_algorithm_tag_and_hex_digest() {
        let h = hash_identity("alice@example.com", "abc123");
        assert!(h.starts_with(HASH_ALGORITHM_TAG));
        let digest = &h[HASH_ALGORITHM_TAG.len()..];
        assert_eq!(digest.len(), 64);
        assert!(digest.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn different_identities_differ_under_fixed_salt() {
        let salt = "fixed-salt";
        let emails = [
            "alice@example.com",
            "bob@example.com",
            "alice@example.org",
            "a.lice@example.com",
            "ALICE@example.com",
        ];
        for (i, e1) in emails.iter().enumerate() {
            for e2 in emails.iter().skip(i + 1) {
                assert_ne!(
                    hash_identity(e1, salt),
                    hash_identity(e2, salt),
                    "collision for {e1} vs {e2}"
                );
            }
        }
    }

    #[test]
    fn different_salts_change_the_hash() {
        let a = hash_identity("alice@example.com", "salt-one");
        let b = hash_identity("alice@example.com", "salt-two");
        assert_ne!(a, b);
    }

    #[test]
    fn generated_salts_are_well_formed_and_vary() {
        let salts: Vec<String> = (0..64).map(|_| generate_salt()).collect();
        for salt in &salts {
            assert_eq!(salt.len(), SALT_LENGTH);
            assert!(salt.chars().all(|c| c.is_ascii_hexdigit()));
        }
        // 64 draws from a 64-bit space: any repeat means the RNG is broken.
        let mut unique = salts.clone();
        unique.sort();
        unique.dedup();
        assert_eq!(unique.len(), salts.len());
    }
}
