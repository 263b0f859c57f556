//! # Configuration
//!
//! Caller-supplied budgets for groves and the per-tree configuration the
//! grove derives from them.

use serde::{Deserialize, Serialize};

use crate::ident::TreeId;

/// Budgets for one grove, fixed at initialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroveOptions {
    /// Capacity of the object value cache, in records.
    pub cache_size: u32,
    /// Upper bound on mutations per batch, used to size tree write buffers.
    ///
    /// Size this to the worst case the enclosing commit loop can produce.
    /// For double-entry workloads every transfer touches two records, and an
    /// update writes both the old and the new index versions, so the record
    /// grove needs `2 * 2 * transfers_per_batch`.
    pub commit_count_max: u32,
}

impl Default for GroveOptions {
    fn default() -> Self {
        Self {
            cache_size: 1024,
            commit_count_max: 128,
        }
    }
}

/// Per-tree budgets handed to the underlying tree at init.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TreeConfig {
    /// Stable identity digest of this tree within its forest.
    pub id: TreeId,
    /// Name of the owning grove.
    pub grove: &'static str,
    /// Name of the tree within the grove (`"objects"` or the index name).
    pub tree: &'static str,
    /// Values the tree may pre-read per batch. Zero for index trees: they
    /// are written from records already in hand.
    pub prefetch_count_max: u32,
    /// Mutations the tree must absorb per batch.
    pub commit_count_max: u32,
}
