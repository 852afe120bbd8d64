//! Merge engine: join sibling branches into one downstream path.

use pathweave_model::{BlockId, Path, PathId, WorkflowGraph, WorkflowId};
use pathweave_store::{CreateMergePath, WorkflowStore};
use tracing::{info, instrument};

use crate::error::{EngineError, ValidationError};
use crate::selection::PathSelection;

/// Check that `end_blocks` can feed a new merge path.
///
/// Duplicates are dropped, keeping the first occurrence. Returns the
/// workflow and the parent blocks in selection order.
pub fn plan_merge(
  paths: &[Path],
  end_blocks: &[BlockId],
) -> Result<(WorkflowId, Vec<BlockId>), EngineError> {
  let mut parents: Vec<BlockId> = Vec::with_capacity(end_blocks.len());
  for block_id in end_blocks {
    if !parents.contains(block_id) {
      parents.push(*block_id);
    }
  }
  if parents.len() < 2 {
    return Err(
      ValidationError::TooFewMergeParents {
        count: parents.len(),
      }
      .into(),
    );
  }

  let graph = WorkflowGraph::new(paths);
  let mut workflow_id = None;
  for &block_id in &parents {
    check_joinable(&graph, block_id, None)?;
    if let Some(owner) = graph.owner(block_id) {
      workflow_id.get_or_insert(owner.workflow_id);
    }
  }

  let workflow_id = workflow_id.ok_or_else(|| EngineError::invariant("merge blocks have no owner"))?;
  Ok((workflow_id, parents))
}

/// A block may feed a merge if it closes its path, is end-type and branches
/// nowhere except, optionally, into `merge_path_id`. A block owned by the
/// merge path or by any path below it would close a cycle.
pub(crate) fn check_joinable(
  graph: &WorkflowGraph<'_>,
  block_id: BlockId,
  merge_path_id: Option<PathId>,
) -> Result<(), ValidationError> {
  let block = graph
    .block(block_id)
    .ok_or(ValidationError::UnknownBlock { block_id })?;
  let not_joinable = |reason| ValidationError::NotJoinable { block_id, reason };

  if !block.is_end_type() {
    return Err(not_joinable("not an end-type block"));
  }
  let is_terminal = graph
    .owner(block_id)
    .and_then(Path::terminal_block)
    .is_some_and(|terminal| terminal.id == block_id);
  if !is_terminal {
    return Err(not_joinable("not the terminal block of its path"));
  }
  if let Some(merge_path_id) = merge_path_id
    && let Some(owner) = graph.owner(block_id)
    && (owner.id == merge_path_id || graph.descendants(merge_path_id).contains(&owner.id))
  {
    return Err(ValidationError::MergeCycle {
      block_id,
      merge_path_id,
    });
  }
  if graph
    .downstream(block_id)
    .iter()
    .any(|&child| Some(child) != merge_path_id)
  {
    return Err(not_joinable("already has child paths"));
  }
  Ok(())
}

/// Merge the selected branches and return the new authoritative paths.
///
/// Resetting the selection is left to the caller.
#[instrument(skip_all, fields(selected = selection.len()))]
pub async fn merge_paths<S>(
  store: &S,
  paths: &[Path],
  selection: &PathSelection,
  name: &str,
) -> Result<Vec<Path>, EngineError>
where
  S: WorkflowStore + ?Sized,
{
  let (workflow_id, parent_blocks) = plan_merge(paths, &selection.selected_end_blocks())?;

  let merge_path = store
    .create_merge_path(&CreateMergePath {
      name: name.to_string(),
      workflow_id,
      parent_blocks,
    })
    .await?;

  let paths = store.fetch_paths(workflow_id).await?;
  info!(merge_path_id = %merge_path.id, "merge committed");
  Ok(paths)
}

#[cfg(test)]
mod tests {
  use pathweave_model::{Block, BlockType, PathParentBlock};

  use super::*;

  fn path(id: i64, blocks: &[(i64, BlockType)], parents: &[i64]) -> Path {
    Path {
      id: PathId(id),
      name: format!("path-{id}"),
      workflow_id: WorkflowId(1),
      blocks: blocks
        .iter()
        .enumerate()
        .map(|(i, (bid, t))| Block::new(BlockId(*bid), PathId(id), WorkflowId(1), i as u32, *t))
        .collect(),
      parent_blocks: parents
        .iter()
        .map(|b| PathParentBlock::new(PathId(id), BlockId(*b)))
        .collect(),
    }
  }

  fn branches() -> Vec<Path> {
    vec![
      path(1, &[(1, BlockType::Begin), (2, BlockType::Path)], &[]),
      path(
        2,
        &[(20, BlockType::Begin), (21, BlockType::Step), (22, BlockType::End)],
        &[2],
      ),
      path(3, &[(30, BlockType::Begin), (31, BlockType::End)], &[2]),
    ]
  }

  #[test]
  fn test_plan_dedups_in_selection_order() {
    let (workflow_id, parents) =
      plan_merge(&branches(), &[BlockId(31), BlockId(22), BlockId(31)]).unwrap();
    assert_eq!(workflow_id, WorkflowId(1));
    assert_eq!(parents, vec![BlockId(31), BlockId(22)]);
  }

  #[test]
  fn test_plan_needs_two_distinct_blocks() {
    let result = plan_merge(&branches(), &[BlockId(22), BlockId(22)]);
    assert!(matches!(
      result,
      Err(EngineError::Validation(ValidationError::TooFewMergeParents { count: 1 }))
    ));
  }

  #[test]
  fn test_plan_rejects_non_terminal_and_branching_blocks() {
    let paths = branches();
    assert!(matches!(
      plan_merge(&paths, &[BlockId(21), BlockId(31)]),
      Err(EngineError::Validation(ValidationError::NotJoinable {
        block_id: BlockId(21),
        ..
      }))
    ));
    assert!(matches!(
      plan_merge(&paths, &[BlockId(2), BlockId(31)]),
      Err(EngineError::Validation(ValidationError::NotJoinable {
        block_id: BlockId(2),
        reason: "already has child paths",
      }))
    ));
    assert!(matches!(
      plan_merge(&paths, &[BlockId(99), BlockId(31)]),
      Err(EngineError::Validation(ValidationError::UnknownBlock { .. }))
    ));
  }

  /// `branches` joined into merge path 4, which splits again into path 5.
  fn merged_then_split() -> Vec<Path> {
    let mut paths = branches();
    paths[1].blocks[2].block_type = BlockType::Merge;
    paths[2].blocks[1].block_type = BlockType::Merge;
    paths.push(path(4, &[(40, BlockType::Begin), (41, BlockType::Path)], &[22, 31]));
    paths.push(path(5, &[(50, BlockType::Begin), (51, BlockType::End)], &[41]));
    paths.push(path(6, &[(60, BlockType::Begin), (61, BlockType::End)], &[41]));
    paths
  }

  #[test]
  fn test_blocks_below_merge_cannot_feed_it() {
    let paths = merged_then_split();
    let graph = WorkflowGraph::new(&paths);

    assert_eq!(
      check_joinable(&graph, BlockId(51), Some(PathId(4))),
      Err(ValidationError::MergeCycle {
        block_id: BlockId(51),
        merge_path_id: PathId(4),
      })
    );
    assert!(check_joinable(&graph, BlockId(51), None).is_ok());
    assert!(check_joinable(&graph, BlockId(22), Some(PathId(4))).is_ok());
  }
}
