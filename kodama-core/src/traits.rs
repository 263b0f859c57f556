//! # Collaborator Interfaces
//!
//! The grove/forest layer composes trees but does not implement them. These
//! traits name what it requires from the record type, the tree, the block
//! grid, and the schema glue handed to each tree.
//!
//! Everything here is statically dispatched: the set of trees in a grove
//! and groves in a forest is fixed at build time, and the hot path iterates
//! it exhaustively through monomorphized code.

use std::cmp::Ordering;
use std::fmt;
use std::hash::Hash;
use std::rc::Rc;

use crate::config::TreeConfig;
use crate::error::Result;
use crate::join::Completion;
use crate::pool::NodePool;
use crate::types::{timestamp_is_tombstone, Timestamp};

/// An application record stored in an object tree.
///
/// The timestamp identifies the object; its high bit is reserved as the
/// tombstone marker and must be clear on every live record. Equality must
/// cover the full byte image: two records are the same version only if
/// every field matches, indexed or not.
pub trait Record: Clone + PartialEq + fmt::Debug + 'static {
    /// The record's logical timestamp.
    fn timestamp(&self) -> Timestamp;

    /// A zeroed record whose timestamp carries the tombstone bit, standing
    /// in for a deleted object at `timestamp`.
    fn tombstone_from_timestamp(timestamp: Timestamp) -> Self;

    /// Whether this record is a tombstone.
    fn tombstone(&self) -> bool {
        timestamp_is_tombstone(self.timestamp())
    }
}

/// Schema glue supplied to the external tree: key extraction, ordering,
/// sentinel, and the tombstone encoding for one table.
pub trait Table: 'static {
    type Key: Copy + Ord + Eq + Hash + fmt::Debug + 'static;
    type Value: Clone + PartialEq + fmt::Debug + 'static;

    /// Extract the key under which a value is stored.
    fn key_from_value(value: &Self::Value) -> Self::Key;

    /// Ordered comparison of keys.
    fn compare_keys(a: &Self::Key, b: &Self::Key) -> Ordering {
        a.cmp(b)
    }

    /// The key strictly greater than every real key.
    fn sentinel_key() -> Self::Key;

    /// Whether a stored value encodes a deletion.
    fn tombstone(value: &Self::Value) -> bool;

    /// The value that encodes deletion of `key`.
    fn tombstone_from_key(key: Self::Key) -> Self::Value;
}

/// The external LSM tree. Construction and the async lifecycle phases go
/// through this interface; sorted runs, bloom filters, and the manifest are
/// the tree's own business.
///
/// `get`/`put`/`remove` are synchronous and never queue work. The async
/// phases return after dispatching and complete the supplied [`Completion`]
/// on a later grid tick.
pub trait Tree<T: Table>: Sized {
    type Grid: Grid;

    fn init(grid: Rc<Self::Grid>, pool: Rc<NodePool>, config: TreeConfig) -> Result<Self>;

    /// Point lookup. Returns live values only.
    fn get(&self, key: &T::Key) -> Option<&T::Value>;

    /// Upsert a live value.
    fn put(&mut self, value: &T::Value);

    /// Replace the entry for `value`'s key with a tombstone.
    fn remove(&mut self, value: &T::Value);

    fn open(&mut self, completion: Completion);
    fn compact_io(&mut self, op: u64, completion: Completion);
    fn compact_cpu(&mut self);
    fn checkpoint(&mut self, completion: Completion);

    /// The configuration this tree was built with.
    fn config(&self) -> &TreeConfig;
}

/// Binds a grid type and a tree constructor so groves and forests can be
/// generic over the storage backend with zero dynamic dispatch.
pub trait TreeFamily: 'static {
    type Grid: Grid;
    type Tree<T: Table>: Tree<T, Grid = Self::Grid>;
}

/// The shared block grid. Opaque at this layer apart from its logical
/// clock: ticking the grid is what drives pending phase completions.
pub trait Grid: 'static {
    /// Advance the storage clock one step.
    fn tick(&self);
}
