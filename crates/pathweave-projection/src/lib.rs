//! Pathweave Projection
//!
//! A read-optimized navigation tree derived from the flat path graph, used for
//! search and "jump to block". Paths are nested under the split and merge
//! blocks they hang from. A merge path fed by several blocks appears only
//! once, under the last of its parent blocks.
//!
//! # Architecture
//!
//! ```text
//! TreeProjection
//! ├── from_paths(paths) / rebuild(paths) - full build from the graph
//! ├── apply(event)                       - incremental patch by GraphEvent
//! ├── view() / filter(term)              - nested TreeView for rendering
//! └── locate_block(block_id)             - path chain for "jump to block"
//!
//! ProjectionRunner
//! └── start(cancel) - drains a GraphEvent channel into a shared projection
//! ```
//!
//! Nodes live in an arena addressed by [`NodeId`]; paths and blocks are found
//! through id indices instead of tree descent.

mod error;
mod patch;
mod runner;
mod search;
mod tree;
mod view;

pub use error::ProjectionError;
pub use runner::{ProjectionRunner, RunnerStats};
pub use tree::{BlockEntry, BlockLocation, NodeId, PathNode, TreeProjection};
pub use view::{BlockView, TreeView};
