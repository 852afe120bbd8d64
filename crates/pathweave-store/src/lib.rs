//! Pathweave Store
//!
//! This crate provides the contract of the workflow store service, the
//! authoritative owner of the path graph. The client never mutates the graph
//! locally: it issues requests through [`WorkflowStore`] and then fetches the
//! paths again.
//!
//! The [`WorkflowStore`] trait defines operations for:
//! - Fetching the paths of a workflow
//! - Creating minimal paths and merge paths
//! - Moving blocks and relocating child-path edges
//! - Reconciling merge membership and changing block types
//!
//! Two implementations are provided: [`HttpWorkflowStore`] talks to a remote
//! service, [`InMemoryWorkflowStore`] keeps the graph in process.

mod error;
mod http;
mod memory;
mod types;

use std::sync::Arc;

pub use error::StoreError;
pub use http::{HttpStoreConfig, HttpWorkflowStore};
pub use memory::{InMemoryWorkflowStore, Snapshot};
pub use types::{
  ConnectPaths, CreateMergePath, CreateMinimalPath, MoveBlocks, PathsResponse, UpdateBlockType,
  UpdateMerge,
};

use async_trait::async_trait;
use pathweave_model::{Block, BlockId, Path, PathId, WorkflowId};

/// Storage trait for the path graph of workflows.
#[async_trait]
pub trait WorkflowStore: Send + Sync {
  /// Fetch every path of a workflow, edges included.
  async fn fetch_paths(&self, workflow_id: WorkflowId) -> Result<Vec<Path>, StoreError>;

  /// Create a path holding only `BEGIN` and `END`.
  async fn create_minimal_path(&self, request: &CreateMinimalPath) -> Result<Path, StoreError>;

  /// Move content blocks into another path.
  async fn move_blocks(&self, request: &MoveBlocks) -> Result<(), StoreError>;

  /// Attach child paths to the terminal block of a path.
  async fn connect_paths(&self, request: &ConnectPaths) -> Result<(), StoreError>;

  /// Create a path whose parents are the given end blocks.
  async fn create_merge_path(&self, request: &CreateMergePath) -> Result<Path, StoreError>;

  /// Connect and disconnect parent blocks of an existing merge path.
  async fn update_merge(&self, merge_path_id: PathId, request: &UpdateMerge)
  -> Result<(), StoreError>;

  /// Change the type of a block.
  async fn update_block_type(
    &self,
    block_id: BlockId,
    request: &UpdateBlockType,
  ) -> Result<Block, StoreError>;
}

#[async_trait]
impl<S: WorkflowStore + ?Sized> WorkflowStore for Arc<S> {
  async fn fetch_paths(&self, workflow_id: WorkflowId) -> Result<Vec<Path>, StoreError> {
    (**self).fetch_paths(workflow_id).await
  }

  async fn create_minimal_path(&self, request: &CreateMinimalPath) -> Result<Path, StoreError> {
    (**self).create_minimal_path(request).await
  }

  async fn move_blocks(&self, request: &MoveBlocks) -> Result<(), StoreError> {
    (**self).move_blocks(request).await
  }

  async fn connect_paths(&self, request: &ConnectPaths) -> Result<(), StoreError> {
    (**self).connect_paths(request).await
  }

  async fn create_merge_path(&self, request: &CreateMergePath) -> Result<Path, StoreError> {
    (**self).create_merge_path(request).await
  }

  async fn update_merge(
    &self,
    merge_path_id: PathId,
    request: &UpdateMerge,
  ) -> Result<(), StoreError> {
    (**self).update_merge(merge_path_id, request).await
  }

  async fn update_block_type(
    &self,
    block_id: BlockId,
    request: &UpdateBlockType,
  ) -> Result<Block, StoreError> {
    (**self).update_block_type(block_id, request).await
  }
}
