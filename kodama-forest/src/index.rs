//! # Index Helpers and Index Trees
//!
//! An [`IndexField`] helper captures how one indexable field is projected
//! out of a record: directly, or through a derived function that may report
//! absence. Absence is distinct from zero; a zero-valued field is indexed,
//! an absent one is not.
//!
//! [`IndexTree`] wraps the external tree over [`CompositeTable`] and owns
//! the diff logic that keeps one index consistent across updates.
//!
//! Helpers are composed at build time with [`direct_index!`] and
//! [`derived_index!`]; enum-tagged fields implement [`IndexField`] by hand,
//! mapping tag to payload. Field types outside unsigned integers up to 128
//! bits have no `From` path into a payload and fail to compile.

use std::fmt;
use std::marker::PhantomData;
use std::rc::Rc;

use tracing::debug;

use kodama_core::{
    Completion, Metrics, NodePool, Record, Result, Tree, TreeConfig, TreeFamily, TreeId,
};

use crate::composite::{CompositeKey, CompositeTable, Payload};

/// Projection of one indexable field out of a record.
pub trait IndexField<R: Record>: 'static {
    /// Field name, as it appears in tree identity digests.
    const NAME: &'static str;

    /// The field's typed value.
    type Value: Copy + PartialEq + fmt::Debug;

    /// The normalized 64- or 128-bit composite-key payload.
    type Payload: Payload;

    /// Extract the field from a record. Direct fields always return
    /// `Some`; derived fields may report absence.
    fn derive(record: &R) -> Option<Self::Value>;

    /// Normalize a value into the payload width.
    fn to_payload(value: Self::Value) -> Self::Payload;

    /// Inverse of [`to_payload`](IndexField::to_payload), for readers that
    /// recover typed values from composite keys.
    fn from_payload(payload: Self::Payload) -> Self::Value;
}

/// One secondary index: an LSM tree over composite keys, membership-only.
pub struct IndexTree<F, R, I>
where
    F: TreeFamily,
    R: Record,
    I: IndexField<R>,
{
    tree: F::Tree<CompositeTable<I::Payload>>,
    config: TreeConfig,
    metrics: Rc<Metrics>,
    _record: PhantomData<fn(&R)>,
}

impl<F, R, I> fmt::Debug for IndexTree<F, R, I>
where
    F: TreeFamily,
    R: Record,
    I: IndexField<R>,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IndexTree")
            .field("config", &self.config)
            .field("metrics", &self.metrics)
            .finish()
    }
}

impl<F, R, I> IndexTree<F, R, I>
where
    F: TreeFamily,
    R: Record,
    I: IndexField<R>,
{
    /// Build the index tree. Prefetch budget is zero: index entries are
    /// written from records already in hand, never pre-read.
    pub fn init(
        grid: &Rc<F::Grid>,
        pool: &Rc<NodePool>,
        config: TreeConfig,
        metrics: Rc<Metrics>,
    ) -> Result<Self> {
        debug_assert_eq!(config.prefetch_count_max, 0);
        let tree = <F::Tree<CompositeTable<I::Payload>>>::init(
            Rc::clone(grid),
            Rc::clone(pool),
            config,
        )?;
        debug!(grove = config.grove, index = config.tree, "index tree ready");
        Ok(Self {
            tree,
            config,
            metrics,
            _record: PhantomData,
        })
    }

    fn composite(record: &R, value: I::Value) -> CompositeKey<I::Payload> {
        CompositeKey::new(I::to_payload(value), record.timestamp())
    }

    /// Index a freshly inserted record, if its projection is present.
    pub fn insert(&mut self, record: &R) {
        if let Some(value) = I::derive(record) {
            self.tree.put(&Self::composite(record, value));
            self.metrics.record_index_put();
        }
    }

    /// Reconcile this index across an update of one object. The retraction
    /// of the old entry always precedes the write of the new one.
    pub fn update(&mut self, old: &R, new: &R) {
        let old_value = I::derive(old);
        let new_value = I::derive(new);
        if old_value == new_value {
            return;
        }
        if let Some(value) = old_value {
            self.tree.remove(&Self::composite(old, value));
            self.metrics.record_index_remove();
        }
        if let Some(value) = new_value {
            self.tree.put(&Self::composite(new, value));
            self.metrics.record_index_put();
        }
    }

    /// Retract the entry for a removed record, if its projection is present.
    pub fn remove(&mut self, record: &R) {
        if let Some(value) = I::derive(record) {
            self.tree.remove(&Self::composite(record, value));
            self.metrics.record_index_remove();
        }
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

    /// Read access to the underlying tree, for lookups and range readers.
    pub fn tree(&self) -> &F::Tree<CompositeTable<I::Payload>> {
        &self.tree
    }
}

/// Generate an [`IndexField`] helper for a plain unsigned-integer field.
///
/// Widening into the payload goes through `From`, so a signed or too-wide
/// field is rejected at compile time.
#[macro_export]
macro_rules! direct_index {
    (
        $(#[$meta:meta])*
        $vis:vis struct $helper:ident for $record:ty {
            field: $field:ident,
            value: $value:ty,
            payload: $payload:ty $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug)]
        $vis struct $helper;

        impl $crate::IndexField<$record> for $helper {
            const NAME: &'static str = stringify!($field);
            type Value = $value;
            type Payload = $payload;

            fn derive(record: &$record) -> ::core::option::Option<$value> {
                ::core::option::Option::Some(record.$field)
            }

            fn to_payload(value: $value) -> $payload {
                <$payload>::from(value)
            }

            fn from_payload(payload: $payload) -> $value {
                <$value>::try_from(payload).expect("index payload out of range for field")
            }
        }
    };
}

/// Generate an [`IndexField`] helper whose projection is a pure function
/// `fn(&Record) -> Option<Value>`.
#[macro_export]
macro_rules! derived_index {
    (
        $(#[$meta:meta])*
        $vis:vis struct $helper:ident for $record:ty {
            name: $name:literal,
            value: $value:ty,
            payload: $payload:ty,
            derive: $derive:path $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug)]
        $vis struct $helper;

        impl $crate::IndexField<$record> for $helper {
            const NAME: &'static str = $name;
            type Value = $value;
            type Payload = $payload;

            fn derive(record: &$record) -> ::core::option::Option<$value> {
                $derive(record)
            }

            fn to_payload(value: $value) -> $payload {
                <$payload>::from(value)
            }

            fn from_payload(payload: $payload) -> $value {
                <$value>::try_from(payload).expect("index payload out of range for field")
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use kodama_core::{Timestamp, TIMESTAMP_TOMBSTONE_BIT};

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    struct Entry {
        timestamp: u64,
        amount: u32,
        kind: u16,
    }

    impl Record for Entry {
        fn timestamp(&self) -> Timestamp {
            self.timestamp
        }

        fn tombstone_from_timestamp(timestamp: Timestamp) -> Self {
            Self {
                timestamp: timestamp | TIMESTAMP_TOMBSTONE_BIT,
                ..Self::default()
            }
        }
    }

    direct_index! {
        struct EntryAmount for Entry {
            field: amount,
            value: u32,
            payload: u64,
        }
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    #[repr(u16)]
    enum EntryKind {
        Deposit = 1,
        Withdrawal = 2,
    }

    /// Enum tags map to the payload by hand.
    struct EntryKindIndex;

    impl IndexField<Entry> for EntryKindIndex {
        const NAME: &'static str = "kind";
        type Value = EntryKind;
        type Payload = u64;

        fn derive(record: &Entry) -> Option<EntryKind> {
            match record.kind {
                1 => Some(EntryKind::Deposit),
                2 => Some(EntryKind::Withdrawal),
                _ => None,
            }
        }

        fn to_payload(value: EntryKind) -> u64 {
            value as u16 as u64
        }

        fn from_payload(payload: u64) -> EntryKind {
            match payload {
                1 => EntryKind::Deposit,
                2 => EntryKind::Withdrawal,
                tag => panic!("unknown kind tag {tag}"),
            }
        }
    }

    #[test]
    fn direct_projection_widens() {
        let entry = Entry {
            timestamp: 3,
            amount: 700,
            kind: 1,
        };
        assert_eq!(EntryAmount::derive(&entry), Some(700));
        assert_eq!(EntryAmount::to_payload(700), 700u64);
        assert_eq!(EntryAmount::from_payload(700u64), 700u32);
    }

    #[test]
    fn enum_projection_round_trips_through_tag() {
        for kind in [EntryKind::Deposit, EntryKind::Withdrawal] {
            let payload = EntryKindIndex::to_payload(kind);
            assert_eq!(EntryKindIndex::from_payload(payload), kind);
        }
    }

    #[test]
    fn zero_valued_field_is_still_present() {
        let entry = Entry {
            timestamp: 3,
            amount: 0,
            kind: 0,
        };
        assert_eq!(EntryAmount::derive(&entry), Some(0));
        assert_eq!(EntryKindIndex::derive(&entry), None);
    }
}
