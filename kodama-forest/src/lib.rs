//! # Kodama Forest
//!
//! Families of LSM trees derived from record schemas.
//!
//! A *grove* is generated from one record type: an object tree keyed by the
//! record's timestamp plus one index tree per indexable field, kept mutually
//! consistent under a single logical timestamp. A *forest* is the fixed set
//! of groves owned by one replica, coordinating their shared lifecycle
//! (open, compact, checkpoint) against a shared block grid and node pool.
//!
//! ## Composition
//!
//! Schemas are fixed at build time. The [`grove!`] macro emits a named
//! struct per record type, wiring an [`object::ObjectTree`] and one
//! [`index::IndexTree`] per declared [`index::IndexField`] helper; the
//! [`forest!`] macro composes groves the same way. Ignored fields simply
//! get no helper. Everything is monomorphized; the hot path never touches a
//! vtable.
//!
//! ## Write discipline
//!
//! `put` diffs the incoming record against the stored version and retracts
//! stale index entries before writing fresh ones, object tree first. The
//! write path is infallible; contract violations fail assertions.
//!
//! ## Lifecycle
//!
//! `open`, `compact`, and `checkpoint` fan out to every tree of every grove
//! and join their completions into one callback per phase, with at most one
//! phase outstanding per grove or forest at any time.

pub mod composite;
pub mod index;
pub mod object;
pub mod testing;

// Composition macros live with the structs they generate
mod forest;
mod grove;

// Re-export the core surface the macros and callers need
pub use kodama_core::join::{self, Completion, Join, Phase};
pub use kodama_core::{
    Error, Grid, GroveOptions, Metrics, MetricsSnapshot, NodePool, Record, Result, Table,
    Timestamp, Tree, TreeConfig, TreeFamily, TreeId, TIMESTAMP_TOMBSTONE_BIT,
};

pub use composite::{CompositeKey, CompositeTable, Payload};
pub use index::{IndexField, IndexTree};
pub use object::{ObjectTable, ObjectTree};

// Macro support: downstream expansions of `grove!`/`forest!` log through
// this re-export so consumers need no direct tracing dependency.
#[doc(hidden)]
pub mod __private {
    pub use tracing;
}
