//! Merge-update engine: reconcile the parent blocks of a merge path.
//!
//! Only the difference between the original and the selected parents is
//! sent. Parents present in both are never touched.

use pathweave_model::{Path, PathId, WorkflowGraph, WorkflowId};
use pathweave_store::{UpdateMerge, WorkflowStore};
use tracing::{debug, info, instrument};

use crate::error::{EngineError, ValidationError};
use crate::merge::check_joinable;
use crate::selection::{MergeDelta, MergeUpdate};

/// Check an active merge update against the cached graph.
pub fn plan_merge_update(
  paths: &[Path],
  state: &MergeUpdate,
) -> Result<(WorkflowId, PathId, MergeDelta), EngineError> {
  let (Some(merge_path_id), Some(delta)) = (state.merge_path_id(), state.delta()) else {
    return Err(ValidationError::MergeUpdateInactive.into());
  };

  let graph = WorkflowGraph::new(paths);
  let merge_path = graph.path(merge_path_id).ok_or(ValidationError::UnknownPath {
    path_id: merge_path_id,
  })?;

  let count = state.remaining_parents();
  if count < 2 {
    return Err(ValidationError::MergeBelowTwoParents {
      merge_path_id,
      count,
    }
    .into());
  }

  for &block_id in &delta.to_connect {
    check_joinable(&graph, block_id, Some(merge_path_id))?;
  }

  Ok((merge_path.workflow_id, merge_path_id, delta))
}

/// Apply the connect/disconnect delta of `state` and return the new
/// authoritative paths.
///
/// An empty delta sends nothing and returns the cached paths.
#[instrument(skip_all, fields(merge_path_id = ?state.merge_path_id()))]
pub async fn update_merge<S>(
  store: &S,
  paths: &[Path],
  state: &MergeUpdate,
) -> Result<Vec<Path>, EngineError>
where
  S: WorkflowStore + ?Sized,
{
  let (workflow_id, merge_path_id, delta) = plan_merge_update(paths, state)?;
  if delta.is_empty() {
    debug!("merge update has nothing to change");
    return Ok(paths.to_vec());
  }

  store
    .update_merge(
      merge_path_id,
      &UpdateMerge {
        parents_to_connect: delta.to_connect.clone(),
        parents_to_disconnect: delta.to_disconnect.clone(),
      },
    )
    .await?;

  let paths = store.fetch_paths(workflow_id).await?;
  info!(
    connected = delta.to_connect.len(),
    disconnected = delta.to_disconnect.len(),
    "merge update committed"
  );
  Ok(paths)
}
