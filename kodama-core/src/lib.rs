//! # Kodama Core
//!
//! Foundation crate for the Kodama grove/forest layer:
//! - Error types and the `Result` alias
//! - Core value types (timestamps, tombstone encoding)
//! - Configuration for groves and trees
//! - Tree identity digests
//! - The shared node pool and join primitive
//! - Interfaces to the external tree, grid, and record types

pub mod config;
pub mod error;
pub mod ident;
pub mod join;
pub mod metrics;
pub mod pool;
pub mod traits;
pub mod types;

// Re-export commonly used types
pub use config::{GroveOptions, TreeConfig};
pub use error::{Error, Result};
pub use ident::TreeId;
pub use join::{Completion, Join, Phase};
pub use metrics::{Metrics, MetricsSnapshot};
pub use pool::NodePool;
pub use traits::{Grid, Record, Table, Tree, TreeFamily};
pub use types::{Timestamp, TIMESTAMP_TOMBSTONE_BIT};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
