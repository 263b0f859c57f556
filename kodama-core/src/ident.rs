//! # Tree Identity
//!
//! Stable 128-bit digests naming each tree on disk. The manifest uses these
//! digests to keep trees apart across schema evolution, so they must be
//! stable across builds and pairwise distinct within one forest.

use std::fmt;

/// Identity digest of one tree, derived from its grove and tree names.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TreeId(pub u128);

impl TreeId {
    /// Derive the digest for `grove`/`tree`.
    ///
    /// Blake3 of `grove || 0x00 || tree`, truncated to 128 bits. The zero
    /// separator keeps `("ab", "c")` distinct from `("a", "bc")`.
    pub fn derive(grove: &str, tree: &str) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(grove.as_bytes());
        hasher.update(&[0u8]);
        hasher.update(tree.as_bytes());
        let digest = hasher.finalize();

        let mut bytes = [0u8; 16];
        bytes.copy_from_slice(&digest.as_bytes()[..16]);
        TreeId(u128::from_be_bytes(bytes))
    }
}

impl fmt::Debug for TreeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TreeId({:032x})", self.0)
    }
}

impl fmt::Display for TreeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:032x}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_is_stable() {
        let a = TreeId::derive("accounts", "objects");
        let b = TreeId::derive("accounts", "objects");
        assert_eq!(a, b);
    }

    #[test]
    fn digest_separates_name_boundaries() {
        assert_ne!(
            TreeId::derive("accounts", "id"),
            TreeId::derive("account", "sid"),
        );
    }

    #[test]
    fn digest_distinct_per_tree() {
        let ids = [
            TreeId::derive("accounts", "objects"),
            TreeId::derive("accounts", "id"),
            TreeId::derive("accounts", "ledger"),
            TreeId::derive("transfers", "objects"),
            TreeId::derive("transfers", "id"),
        ];
        for (i, a) in ids.iter().enumerate() {
            for b in &ids[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }
}
