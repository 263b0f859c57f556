//! # Grove Composition
//!
//! The [`grove!`] macro generates a named struct per record schema: one
//! object tree, one index tree per declared helper, a join for the async
//! phases, and the shared counter set. The index list is spelled out at the
//! call site, so the generated write path iterates it exhaustively in
//! straight-line monomorphized code.
//!
//! Ignored fields are the ones with no helper in the list; derived fields
//! use helpers whose projection may report absence.

/// Generate a grove struct for one record type.
///
/// ```ignore
/// grove! {
///     /// Accounts and their secondary indexes.
///     pub struct AccountGrove {
///         record: Account,
///         name: "accounts",
///         indexes: {
///             id: AccountIdIndex,
///             ledger: AccountLedgerIndex,
///         },
///     }
/// }
/// ```
///
/// The generated struct is generic over a [`TreeFamily`](crate::TreeFamily)
/// and exposes `init`, `get`, `put`, `remove`, the async phases, and one
/// read accessor per tree.
#[macro_export]
macro_rules! grove {
    (
        $(#[$meta:meta])*
        $vis:vis struct $grove:ident {
            record: $record:ty,
            name: $name:literal,
            indexes: {
                $( $index:ident : $helper:ty ),+ $(,)?
            } $(,)?
        }
    ) => {
        $(#[$meta])*
        $vis struct $grove<F: $crate::TreeFamily> {
            objects: $crate::ObjectTree<F, $record>,
            $( $index: $crate::IndexTree<F, $record, $helper>, )+
            join: $crate::Join,
            metrics: ::std::rc::Rc<$crate::Metrics>,
        }

        impl<F: $crate::TreeFamily> ::std::fmt::Debug for $grove<F> {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                let mut builder = f.debug_struct(stringify!($grove));
                builder.field("objects", &self.objects);
                $( builder.field(stringify!($index), &self.$index); )+
                builder.field("join", &self.join);
                builder.field("metrics", &self.metrics);
                builder.finish()
            }
        }

        impl<F: $crate::TreeFamily> $grove<F> {
            /// Number of index trees in this grove.
            pub const INDEX_COUNT: u32 = [$(stringify!($index)),+].len() as u32;

            /// Grove name, as used in tree identity digests.
            pub const NAME: &'static str = $name;

            /// Build the value cache, the object tree, then each index tree
            /// in declaration order. A failure drops whatever was already
            /// built, in reverse.
            pub fn init(
                grid: &::std::rc::Rc<F::Grid>,
                pool: &::std::rc::Rc<$crate::NodePool>,
                options: $crate::GroveOptions,
            ) -> $crate::Result<Self> {
                let metrics = ::std::rc::Rc::new($crate::Metrics::new());

                let objects = $crate::ObjectTree::init(
                    grid,
                    pool,
                    $crate::TreeConfig {
                        id: $crate::TreeId::derive($name, "objects"),
                        grove: $name,
                        tree: "objects",
                        prefetch_count_max: 2 * options.commit_count_max,
                        commit_count_max: options.commit_count_max,
                    },
                    options.cache_size,
                    ::std::rc::Rc::clone(&metrics),
                )?;

                $(
                    let $index = $crate::IndexTree::init(
                        grid,
                        pool,
                        $crate::TreeConfig {
                            id: $crate::TreeId::derive($name, stringify!($index)),
                            grove: $name,
                            tree: stringify!($index),
                            prefetch_count_max: 0,
                            commit_count_max: options.commit_count_max,
                        },
                        ::std::rc::Rc::clone(&metrics),
                    )?;
                )+

                $crate::__private::tracing::info!(
                    grove = $name,
                    indexes = Self::INDEX_COUNT,
                    "grove initialized"
                );

                Ok(Self {
                    objects,
                    $( $index, )+
                    join: $crate::Join::new(),
                    metrics,
                })
            }

            /// Point lookup by timestamp, served from the object cache when
            /// warm.
            pub fn get(&mut self, timestamp: $crate::Timestamp) -> Option<&$record> {
                self.objects.lookup(timestamp)
            }

            /// Write a record: an insert if its timestamp is new, otherwise
            /// an update diffed against the stored version.
            pub fn put(&mut self, record: &$record) {
                let timestamp = <$record as $crate::Record>::timestamp(record);
                debug_assert_eq!(
                    timestamp & $crate::TIMESTAMP_TOMBSTONE_BIT,
                    0,
                    "put of a tombstone record"
                );
                let existing = self.objects.lookup(timestamp).cloned();
                match existing {
                    Some(ref old) => self.update(old, record),
                    None => self.insert(record),
                }
            }

            fn insert(&mut self, record: &$record) {
                self.objects.insert(record);
                $( self.$index.insert(record); )+
            }

            fn update(&mut self, old: &$record, new: &$record) {
                self.objects.update(old, new);
                $( self.$index.update(old, new); )+
            }

            /// Delete a record. The stored version must be byte-equal to
            /// `record`; a stale remove fails the assertion.
            pub fn remove(&mut self, record: &$record) {
                let timestamp = <$record as $crate::Record>::timestamp(record);
                {
                    let stored = self.objects.lookup(timestamp);
                    assert!(
                        stored == Some(record),
                        "remove of a record that is not stored at timestamp {}",
                        timestamp,
                    );
                }
                self.objects.remove(record);
                $( self.$index.remove(record); )+
            }

            /// Begin opening every tree in this grove; `callback` fires once
            /// all of them have opened.
            pub fn open(&mut self, callback: impl FnOnce() + 'static) {
                self.join
                    .start($crate::Phase::Open, 1 + Self::INDEX_COUNT, callback);
                self.objects.open(self.join.token());
                $( self.$index.open(self.join.token()); )+
            }

            /// Begin the I/O half of compaction for operation `op` on every
            /// tree in this grove.
            pub fn compact_io(&mut self, op: u64, callback: impl FnOnce() + 'static) {
                self.join
                    .start($crate::Phase::CompactIo(op), 1 + Self::INDEX_COUNT, callback);
                self.objects.compact_io(op, self.join.token());
                $( self.$index.compact_io(op, self.join.token()); )+
            }

            /// The CPU half of compaction: synchronous, fans out with no
            /// join.
            pub fn compact_cpu(&mut self) {
                self.objects.compact_cpu();
                $( self.$index.compact_cpu(); )+
            }

            /// Begin checkpointing every tree in this grove for operation
            /// `op`.
            pub fn checkpoint(&mut self, op: u64, callback: impl FnOnce() + 'static) {
                self.join
                    .start($crate::Phase::Checkpoint(op), 1 + Self::INDEX_COUNT, callback);
                self.objects.checkpoint(self.join.token());
                $( self.$index.checkpoint(self.join.token()); )+
            }

            /// Identity digests of every tree in this grove.
            pub fn tree_ids(&self) -> ::std::vec::Vec<$crate::TreeId> {
                let mut ids = ::std::vec![self.objects.id()];
                $( ids.push(self.$index.id()); )+
                ids
            }

            /// The phase currently in flight on this grove, if any.
            pub fn phase_in_flight(&self) -> Option<$crate::Phase> {
                self.join.in_flight()
            }

            /// Read access to the object tree.
            pub fn objects(&self) -> &$crate::ObjectTree<F, $record> {
                &self.objects
            }

            $(
                /// Read access to one index tree.
                pub fn $index(&self) -> &$crate::IndexTree<F, $record, $helper> {
                    &self.$index
                }
            )+

            /// Write-path counters for this grove.
            pub fn metrics(&self) -> &$crate::Metrics {
                &self.metrics
            }
        }
    };
}
