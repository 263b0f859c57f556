//! # Deterministic Test Collaborators
//!
//! In-memory stand-ins for the external tree and block grid, used by the
//! test suites to drive groves and forests without real storage. The grid
//! queues phase completions and delivers them on `tick`, so async phases
//! complete "on a later tick" exactly as the real storage would, while the
//! whole run stays deterministic.

use std::cell::RefCell;
use std::collections::{BTreeMap, VecDeque};
use std::rc::Rc;

use kodama_core::{Completion, Grid, NodePool, Result, Table, Tree, TreeConfig, TreeFamily};

/// In-memory grid: a tick counter plus the FIFO of pending completions.
#[derive(Default)]
pub struct TestGrid {
    ticks: std::cell::Cell<u64>,
    completions: RefCell<VecDeque<Completion>>,
}

impl TestGrid {
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    /// Queue a completion for delivery on the next tick.
    pub fn enqueue(&self, completion: Completion) {
        self.completions.borrow_mut().push_back(completion);
    }

    /// Completions waiting for the next tick.
    pub fn pending(&self) -> usize {
        self.completions.borrow().len()
    }

    /// Ticks delivered so far.
    pub fn ticks(&self) -> u64 {
        self.ticks.get()
    }
}

impl Grid for TestGrid {
    fn tick(&self) {
        self.ticks.set(self.ticks.get() + 1);
        // Drain first: a delivered completion may fire a callback that
        // starts the next phase and enqueues fresh completions.
        let drained: Vec<Completion> = self.completions.borrow_mut().drain(..).collect();
        for completion in drained {
            completion.complete();
        }
    }
}

/// In-memory sorted run honoring the [`Table`] contract: puts store live
/// values, removes store tombstones, gets filter tombstones out. Each tree
/// draws one node from the pool for its lifetime and keeps per-operation
/// counters for the suites to assert against.
pub struct TestTree<T: Table> {
    grid: Rc<TestGrid>,
    pool: Rc<NodePool>,
    config: TreeConfig,
    entries: BTreeMap<T::Key, T::Value>,
    puts: u64,
    removes: u64,
    opened: bool,
    compact_ops: Vec<u64>,
    compact_cpu_count: u32,
    checkpoint_count: u32,
}

impl<T: Table> TestTree<T> {
    /// Keys of live (non-tombstone) entries, in key order.
    pub fn live_keys(&self) -> Vec<T::Key> {
        self.entries
            .iter()
            .filter(|(_, value)| !T::tombstone(value))
            .map(|(key, _)| *key)
            .collect()
    }

    /// Live (non-tombstone) values, in key order.
    pub fn live_values(&self) -> Vec<T::Value> {
        self.entries
            .values()
            .filter(|value| !T::tombstone(value))
            .cloned()
            .collect()
    }

    /// Whether `key` currently holds a live entry.
    pub fn contains_live(&self, key: &T::Key) -> bool {
        self.entries.get(key).is_some_and(|value| !T::tombstone(value))
    }

    /// Whether `key` currently holds a tombstone.
    pub fn contains_tombstone(&self, key: &T::Key) -> bool {
        self.entries.get(key).is_some_and(|value| T::tombstone(value))
    }

    /// Total entries, tombstones included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Puts issued against this tree.
    pub fn put_count(&self) -> u64 {
        self.puts
    }

    /// Removes issued against this tree.
    pub fn remove_count(&self) -> u64 {
        self.removes
    }

    /// Whether `open` has been issued.
    pub fn opened(&self) -> bool {
        self.opened
    }

    /// Operation numbers of every `compact_io` issued, in order.
    pub fn compact_ops(&self) -> &[u64] {
        &self.compact_ops
    }

    /// `compact_cpu` calls so far.
    pub fn compact_cpu_count(&self) -> u32 {
        self.compact_cpu_count
    }

    /// `checkpoint` calls so far.
    pub fn checkpoint_count(&self) -> u32 {
        self.checkpoint_count
    }
}

impl<T: Table> Tree<T> for TestTree<T> {
    type Grid = TestGrid;

    fn init(grid: Rc<TestGrid>, pool: Rc<NodePool>, config: TreeConfig) -> Result<Self> {
        pool.acquire()?;
        Ok(Self {
            grid,
            pool,
            config,
            entries: BTreeMap::new(),
            puts: 0,
            removes: 0,
            opened: false,
            compact_ops: Vec::new(),
            compact_cpu_count: 0,
            checkpoint_count: 0,
        })
    }

    fn get(&self, key: &T::Key) -> Option<&T::Value> {
        self.entries.get(key).filter(|value| !T::tombstone(value))
    }

    fn put(&mut self, value: &T::Value) {
        debug_assert!(!T::tombstone(value), "put of a tombstone value");
        self.puts += 1;
        self.entries.insert(T::key_from_value(value), value.clone());
    }

    fn remove(&mut self, value: &T::Value) {
        let key = T::key_from_value(value);
        debug_assert!(
            self.entries.contains_key(&key),
            "remove of a key never written"
        );
        self.removes += 1;
        self.entries.insert(key, T::tombstone_from_key(key));
    }

    fn open(&mut self, completion: Completion) {
        self.opened = true;
        self.grid.enqueue(completion);
    }

    fn compact_io(&mut self, op: u64, completion: Completion) {
        self.compact_ops.push(op);
        self.grid.enqueue(completion);
    }

    fn compact_cpu(&mut self) {
        self.compact_cpu_count += 1;
    }

    fn checkpoint(&mut self, completion: Completion) {
        self.checkpoint_count += 1;
        self.grid.enqueue(completion);
    }

    fn config(&self) -> &TreeConfig {
        &self.config
    }
}

impl<T: Table> Drop for TestTree<T> {
    fn drop(&mut self) {
        self.pool.release();
    }
}

/// The [`TreeFamily`] binding [`TestGrid`] and [`TestTree`].
pub struct TestFamily;

impl TreeFamily for TestFamily {
    type Grid = TestGrid;
    type Tree<T: Table> = TestTree<T>;
}
