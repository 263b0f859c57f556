//! # Object Tree
//!
//! The primary tree of a grove: keyed by record timestamp, storing the full
//! record. Tombstones ride in the record's own byte image (high timestamp
//! bit over a zeroed record) so they survive compaction of the value as-is.
//!
//! The object tree also owns the grove's value cache, a bounded LRU from
//! timestamp to the latest live record, so point lookups on the write path
//! do not descend the LSM.

use std::marker::PhantomData;
use std::num::NonZeroUsize;
use std::rc::Rc;

use lru::LruCache;
use tracing::debug;

use kodama_core::{
    Completion, Error, Metrics, NodePool, Record, Result, Table, Timestamp, Tree, TreeConfig,
    TreeFamily, TreeId, TIMESTAMP_TOMBSTONE_BIT,
};

/// The [`Table`] implementation handed to object trees.
pub struct ObjectTable<R> {
    _record: PhantomData<R>,
}

impl<R: Record> Table for ObjectTable<R> {
    type Key = u64;
    type Value = R;

    fn key_from_value(value: &R) -> u64 {
        value.timestamp() & !TIMESTAMP_TOMBSTONE_BIT
    }

    fn sentinel_key() -> u64 {
        u64::MAX
    }

    fn tombstone(value: &R) -> bool {
        value.tombstone()
    }

    fn tombstone_from_key(key: u64) -> R {
        R::tombstone_from_timestamp(key)
    }
}

/// The record tree of one grove, plus its value cache.
pub struct ObjectTree<F, R>
where
    F: TreeFamily,
    R: Record,
{
    tree: F::Tree<ObjectTable<R>>,
    cache: LruCache<Timestamp, R>,
    config: TreeConfig,
    metrics: Rc<Metrics>,
}

impl<F, R> ::std::fmt::Debug for ObjectTree<F, R>
where
    F: TreeFamily,
    R: Record,
{
    fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
        f.debug_struct("ObjectTree")
            .field("cache", &self.cache)
            .field("config", &self.config)
            .field("metrics", &self.metrics)
            .finish()
    }
}

impl<F, R> ObjectTree<F, R>
where
    F: TreeFamily,
    R: Record,
{
    /// Build the object tree and its cache. The prefetch budget is twice
    /// the commit budget: an update within a batch touches both the old and
    /// the new version of an object.
    pub fn init(
        grid: &Rc<F::Grid>,
        pool: &Rc<NodePool>,
        config: TreeConfig,
        cache_size: u32,
        metrics: Rc<Metrics>,
    ) -> Result<Self> {
        if config.commit_count_max == 0 {
            return Err(Error::Configuration {
                message: format!("grove {}: commit_count_max must be nonzero", config.grove),
            });
        }
        let capacity =
            NonZeroUsize::new(cache_size as usize).ok_or_else(|| Error::Configuration {
                message: format!("grove {}: object cache capacity must be nonzero", config.grove),
            })?;
        debug_assert_eq!(config.prefetch_count_max, 2 * config.commit_count_max);

        let cache = LruCache::new(capacity);
        let tree =
            <F::Tree<ObjectTable<R>>>::init(Rc::clone(grid), Rc::clone(pool), config)?;
        debug!(
            grove = config.grove,
            cache_size, "object tree ready"
        );

        Ok(Self {
            tree,
            cache,
            config,
            metrics,
        })
    }

    /// Point lookup by timestamp: cache first, then the tree.
    pub fn lookup(&mut self, timestamp: Timestamp) -> Option<&R> {
        if self.cache.contains(&timestamp) {
            self.metrics.record_cache_hit();
            return self.cache.get(&timestamp);
        }
        self.metrics.record_cache_miss();
        self.tree.get(&timestamp)
    }

    /// Write a new object.
    pub fn insert(&mut self, record: &R) {
        self.tree.put(record);
        self.cache.put(record.timestamp(), record.clone());
        self.metrics.record_object_put();
    }

    /// Replace the stored version of an object. Any byte-level difference,
    /// indexed or not, rewrites the record so the object tree stays
    /// canonical; byte-equal versions issue no tree operation.
    pub fn update(&mut self, old: &R, new: &R) {
        debug_assert_eq!(old.timestamp(), new.timestamp());
        if old == new {
            return;
        }
        self.tree.remove(old);
        self.tree.put(new);
        self.cache.put(new.timestamp(), new.clone());
        self.metrics.record_object_remove();
        self.metrics.record_object_put();
    }

    /// Delete an object.
    pub fn remove(&mut self, record: &R) {
        self.tree.remove(record);
        self.cache.pop(&record.timestamp());
        self.metrics.record_object_remove();
    }

    pub fn open(&mut self, completion: Completion) {
        self.tree.open(completion);
    }

    pub fn compact_io(&mut self, op: u64, completion: Completion) {
        self.tree.compact_io(op, completion);
    }

    pub fn compact_cpu(&mut self) {
        self.tree.compact_cpu();
    }

    pub fn checkpoint(&mut self, completion: Completion) {
        self.tree.checkpoint(completion);
    }

    /// Identity digest of this tree.
    pub fn id(&self) -> TreeId {
        self.config.id
    }

    /// Read access to the underlying tree, for scans and inspection.
    pub fn tree(&self) -> &F::Tree<ObjectTable<R>> {
        &self.tree
    }

    /// Number of records currently cached.
    pub fn cached(&self) -> usize {
        self.cache.len()
    }
}
