//! Pathweave Engine
//!
//! This crate provides the editing engines of pathweave: splitting a path
//! into parallel branches, merging sibling branches, and reconciling the
//! parent blocks of an existing merge. Engines validate against the cached
//! graph, talk to a [`WorkflowStore`](pathweave_store::WorkflowStore), and
//! return the store's authoritative paths.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      WorkflowEditor                         │
//! │  - owns cached paths, PathSelection, MergeUpdate            │
//! │  - replaces the cache on success, diffs old vs new          │
//! │  - patches the TreeProjection, publishes GraphEvents        │
//! └─────────────────────────────────────────────────────────────┘
//!                               │
//!                               ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │     create_parallel_paths / merge_paths / update_merge      │
//! │  - plan against the cache (no store call on rejection)      │
//! │  - issue store requests in sequence, then fetch paths       │
//! └─────────────────────────────────────────────────────────────┘
//!                               │
//!                               ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      WorkflowStore                          │
//! │  - HTTP service or in-memory store                          │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use pathweave_engine::{EditorConfig, SplitRequest, WorkflowEditor};
//!
//! let mut editor = WorkflowEditor::load(store, workflow_id, EditorConfig::default()).await?;
//! editor.split(&SplitRequest::new(root_id, 1)).await?;
//!
//! editor.toggle_path(if_path_id)?;
//! editor.toggle_path(else_path_id)?;
//! editor.merge_selected().await?;
//! ```

mod config;
mod editor;
mod error;
mod events;
mod merge;
mod merge_update;
mod selection;
mod split;

pub use config::{EditorConfig, SelectionPolicy};
pub use editor::WorkflowEditor;
pub use error::{EngineError, SelectionError, ValidationError};
pub use events::{ChannelNotifier, GraphNotifier, NoopNotifier};
pub use merge::{merge_paths, plan_merge};
pub use merge_update::{plan_merge_update, update_merge};
pub use selection::{MergeDelta, MergeUpdate, PathSelection};
pub use split::{SplitPlan, SplitRequest, create_parallel_paths, plan_split};
