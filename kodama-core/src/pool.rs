//! # Node Pool
//!
//! Fixed-capacity accounting for the internal nodes of every tree in one
//! forest. The forest allocates the pool behind `Rc` so its address stays
//! stable for as long as any tree holds a reference to it; trees acquire
//! nodes during construction and compaction and return them on release.

use std::cell::Cell;

use tracing::warn;

use crate::error::{Error, Result};

/// Shared fixed-capacity node allocator.
#[derive(Debug)]
pub struct NodePool {
    node_count: u32,
    acquired: Cell<u32>,
}

impl NodePool {
    /// Create a pool of `node_count` nodes.
    pub fn new(node_count: u32) -> Result<Self> {
        if node_count == 0 {
            return Err(Error::Configuration {
                message: "node pool must hold at least one node".to_string(),
            });
        }
        Ok(Self {
            node_count,
            acquired: Cell::new(0),
        })
    }

    /// Reserve one node. Fails when the pool is exhausted; the caller may
    /// retry with smaller budgets.
    pub fn acquire(&self) -> Result<()> {
        let acquired = self.acquired.get();
        if acquired == self.node_count {
            warn!(node_count = self.node_count, "node pool exhausted");
            return Err(Error::ResourceExhausted {
                resource: format!("node pool ({} nodes)", self.node_count),
            });
        }
        self.acquired.set(acquired + 1);
        Ok(())
    }

    /// Return one node to the pool.
    pub fn release(&self) {
        let acquired = self.acquired.get();
        assert!(acquired > 0, "release on an empty node pool");
        self.acquired.set(acquired - 1);
    }

    /// Total pool capacity.
    pub fn node_count(&self) -> u32 {
        self.node_count
    }

    /// Nodes currently acquired.
    pub fn in_use(&self) -> u32 {
        self.acquired.get()
    }

    /// Nodes still available.
    pub fn available(&self) -> u32 {
        self.node_count - self.acquired.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn acquire_release_accounting() {
        let pool = NodePool::new(2).unwrap();
        assert_eq!(pool.available(), 2);

        pool.acquire().unwrap();
        pool.acquire().unwrap();
        assert_eq!(pool.in_use(), 2);
        assert!(pool.acquire().is_err());

        pool.release();
        assert_eq!(pool.available(), 1);
        pool.acquire().unwrap();
    }

    #[test]
    fn zero_capacity_rejected() {
        assert!(NodePool::new(0).is_err());
    }

    #[test]
    fn exhaustion_is_recoverable() {
        let pool = NodePool::new(1).unwrap();
        pool.acquire().unwrap();
        let err = pool.acquire().unwrap_err();
        assert!(err.is_recoverable());
        assert_eq!(err.error_code(), "RESOURCE_EXHAUSTED");
    }
}
