//! # Forest Composition
//!
//! The [`forest!`] macro generates the fixed tuple of groves owned by one
//! replica, together with its options struct. The forest owns the grid
//! handle and the node pool (heap-allocated behind `Rc`, so its address is
//! stable for every tree that embeds a reference to it) and joins the
//! per-grove completions of each lifecycle phase into one callback.

/// Generate a forest struct over a fixed set of grove types.
///
/// ```ignore
/// forest! {
///     /// All groves of one replica.
///     pub struct Forest, options ForestOptions {
///         accounts: AccountGrove,
///         transfers: TransferGrove,
///     }
/// }
/// ```
///
/// Grove fields are public: callers address a grove directly and invoke
/// `get`/`put`/`remove` on it. The generated options struct carries
/// `node_count` plus one [`GroveOptions`](crate::GroveOptions) per grove.
#[macro_export]
macro_rules! forest {
    (
        $(#[$meta:meta])*
        $vis:vis struct $forest:ident, options $options:ident {
            $( $grove:ident : $grove_type:ident ),+ $(,)?
        }
    ) => {
        /// Per-grove budgets plus the shared node pool size.
        #[derive(Debug, Clone, Copy)]
        $vis struct $options {
            pub node_count: u32,
            $( pub $grove: $crate::GroveOptions, )+
        }

        $(#[$meta])*
        $vis struct $forest<F: $crate::TreeFamily> {
            grid: ::std::rc::Rc<F::Grid>,
            pool: ::std::rc::Rc<$crate::NodePool>,
            join: $crate::Join,
            $( pub $grove: $grove_type<F>, )+
        }

        impl<F: $crate::TreeFamily> ::std::fmt::Debug for $forest<F> {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                let mut builder = f.debug_struct(stringify!($forest));
                builder.field("pool", &self.pool);
                builder.field("join", &self.join);
                $( builder.field(stringify!($grove), &self.$grove); )+
                builder.finish()
            }
        }

        impl<F: $crate::TreeFamily> $forest<F> {
            /// Number of groves in this forest.
            pub const GROVE_COUNT: u32 = [$(stringify!($grove)),+].len() as u32;

            /// Allocate the node pool, then build each grove in declaration
            /// order. A failure drops whatever was already built, in
            /// reverse. Tree identity digests are checked for pairwise
            /// uniqueness before the forest is handed back.
            pub fn init(
                grid: ::std::rc::Rc<F::Grid>,
                options: $options,
            ) -> $crate::Result<Self> {
                let pool = ::std::rc::Rc::new($crate::NodePool::new(options.node_count)?);
                $( let $grove = <$grove_type<F>>::init(&grid, &pool, options.$grove)?; )+

                let forest = Self {
                    grid,
                    pool,
                    join: $crate::Join::new(),
                    $( $grove, )+
                };
                forest.check_tree_ids()?;

                $crate::__private::tracing::info!(
                    groves = Self::GROVE_COUNT,
                    node_count = options.node_count,
                    "forest initialized"
                );
                Ok(forest)
            }

            fn check_tree_ids(&self) -> $crate::Result<()> {
                let mut ids: ::std::vec::Vec<$crate::TreeId> = ::std::vec::Vec::new();
                $( ids.extend(self.$grove.tree_ids()); )+
                ids.sort_unstable();
                for pair in ids.windows(2) {
                    if pair[0] == pair[1] {
                        return Err($crate::Error::Schema {
                            message: ::std::format!(
                                "tree identity digest collision: {:?}",
                                pair[0],
                            ),
                        });
                    }
                }
                Ok(())
            }

            /// Advance the storage clock underneath every tree. No tree is
            /// ticked directly.
            pub fn tick(&mut self) {
                $crate::Grid::tick(&*self.grid);
            }

            /// Begin opening every grove; `callback` fires once all of them
            /// have opened.
            pub fn open(&mut self, callback: impl FnOnce() + 'static) {
                self.join.start($crate::Phase::Open, Self::GROVE_COUNT, callback);
                $(
                    {
                        let completion = self.join.token();
                        self.$grove.open(move || completion.complete());
                    }
                )+
            }

            /// Begin the I/O half of compaction for operation `op` on every
            /// grove.
            pub fn compact(&mut self, op: u64, callback: impl FnOnce() + 'static) {
                self.join
                    .start($crate::Phase::CompactIo(op), Self::GROVE_COUNT, callback);
                $(
                    {
                        let completion = self.join.token();
                        self.$grove.compact_io(op, move || completion.complete());
                    }
                )+
            }

            /// The CPU half of compaction: synchronous across every grove.
            pub fn compact_cpu(&mut self) {
                $( self.$grove.compact_cpu(); )+
            }

            /// Begin checkpointing every grove for operation `op`.
            pub fn checkpoint(&mut self, op: u64, callback: impl FnOnce() + 'static) {
                self.join
                    .start($crate::Phase::Checkpoint(op), Self::GROVE_COUNT, callback);
                $(
                    {
                        let completion = self.join.token();
                        self.$grove.checkpoint(op, move || completion.complete());
                    }
                )+
            }

            /// The phase currently in flight on this forest, if any.
            pub fn phase_in_flight(&self) -> Option<$crate::Phase> {
                self.join.in_flight()
            }

            /// The node pool shared by every tree in the forest.
            pub fn pool(&self) -> &::std::rc::Rc<$crate::NodePool> {
                &self.pool
            }

            /// The grid handle shared by every tree in the forest.
            pub fn grid(&self) -> &::std::rc::Rc<F::Grid> {
                &self.grid
            }
        }
    };
}
