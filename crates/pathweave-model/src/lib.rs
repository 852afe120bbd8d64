//! Pathweave Model
//!
//! This crate provides the graph model for pathweave workflows. A workflow is
//! a set of [`Path`]s (linear branches of [`Block`]s) joined by
//! [`PathParentBlock`] edges. The same edge type describes both a split point
//! (a `PATH` block with several child paths) and a merge point (several
//! `MERGE` blocks feeding one downstream path).
//!
//! Beyond the entity types this crate offers:
//! - [`WorkflowGraph`], a read-only index over a path set for lookups
//! - [`validate`], which checks the structural invariants of a path set
//! - [`GraphEvent`] and [`diff_paths`], which describe the difference between
//!   two authoritative path sets as typed change events

mod block;
mod change;
mod error;
mod graph;
mod ids;
mod path;
mod validate;
mod workflow;

pub use block::{Block, BlockType, DelayConfig};
pub use change::{GraphDiff, GraphEvent, diff_paths};
pub use error::ModelError;
pub use graph::WorkflowGraph;
pub use ids::{BlockId, PathId, WorkflowId};
pub use path::{Path, PathParentBlock};
pub use validate::validate;
pub use workflow::Workflow;
