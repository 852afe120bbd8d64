//! Split engine: fork a path into parallel branches.
//!
//! The blocks after the split point move into one of the new branches, and
//! any paths already hanging off the split block follow them. The split
//! block itself becomes a `PATH` block leading to every new branch.

use pathweave_model::{BlockId, BlockType, Path, PathId, WorkflowGraph, WorkflowId};
use pathweave_store::{
  ConnectPaths, CreateMinimalPath, MoveBlocks, UpdateBlockType, WorkflowStore,
};
use tracing::{info, instrument};

use crate::error::{EngineError, ValidationError};

/// Parameters of a split.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitRequest {
  pub parent_path_id: PathId,
  /// Split point. The first end-type block at or after it is used.
  pub position: u32,
  /// Names of the branches to create, in order.
  pub paths_to_create: Vec<String>,
  /// Index of the branch receiving the blocks after the split point.
  pub path_to_move: usize,
}

impl SplitRequest {
  /// Split into `If` and `Else`, moving the tail into `If`.
  pub fn new(parent_path_id: PathId, position: u32) -> Self {
    Self {
      parent_path_id,
      position,
      paths_to_create: vec!["If".to_string(), "Else".to_string()],
      path_to_move: 0,
    }
  }

  pub fn with_names<I, T>(mut self, names: I) -> Self
  where
    I: IntoIterator<Item = T>,
    T: Into<String>,
  {
    self.paths_to_create = names.into_iter().map(Into::into).collect();
    self
  }

  pub fn moving_to(mut self, index: usize) -> Self {
    self.path_to_move = index;
    self
  }
}

/// A split checked against the cached graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitPlan {
  pub workflow_id: WorkflowId,
  pub parent_path_id: PathId,
  pub split_block_id: BlockId,
  /// Type of the split block before the split.
  pub split_block_type: BlockType,
  /// Content blocks after the split point, by position.
  pub blocks_to_move: Vec<BlockId>,
  /// Paths currently hanging off the split block.
  pub child_paths_to_move: Vec<PathId>,
  pub names: Vec<String>,
  pub path_to_move: usize,
}

/// Check a split request against the cached paths without any store call.
pub fn plan_split(paths: &[Path], request: &SplitRequest) -> Result<SplitPlan, EngineError> {
  let count = request.paths_to_create.len();
  if count < 2 {
    return Err(ValidationError::TooFewBranches { count }.into());
  }
  if request.path_to_move >= count {
    return Err(
      ValidationError::BranchOutOfBounds {
        index: request.path_to_move,
        count,
      }
      .into(),
    );
  }

  let parent_path_id = request.parent_path_id;
  if request.position == 0 {
    return Err(ValidationError::SplitAtBegin {
      path_id: parent_path_id,
    }
    .into());
  }

  let graph = WorkflowGraph::new(paths);
  let parent = graph
    .path(parent_path_id)
    .ok_or(ValidationError::UnknownPath {
      path_id: parent_path_id,
    })?;

  let split_block = parent.end_block_from(request.position).ok_or_else(|| {
    EngineError::invariant(format!(
      "path {parent_path_id} has no end-type block at or after position {}",
      request.position
    ))
  })?;

  let mut tail: Vec<_> = parent
    .blocks
    .iter()
    .filter(|b| b.position >= request.position && b.block_type.is_content())
    .collect();
  tail.sort_by_key(|b| b.position);

  Ok(SplitPlan {
    workflow_id: parent.workflow_id,
    parent_path_id,
    split_block_id: split_block.id,
    split_block_type: split_block.block_type,
    blocks_to_move: tail.into_iter().map(|b| b.id).collect(),
    child_paths_to_move: graph.downstream(split_block.id).to_vec(),
    names: request.paths_to_create.clone(),
    path_to_move: request.path_to_move,
  })
}

/// Split a path into parallel branches and return the new authoritative paths.
#[instrument(skip_all, fields(parent_path_id = %request.parent_path_id, position = request.position))]
pub async fn create_parallel_paths<S>(
  store: &S,
  paths: &[Path],
  request: &SplitRequest,
) -> Result<Vec<Path>, EngineError>
where
  S: WorkflowStore + ?Sized,
{
  let plan = plan_split(paths, request)?;
  commit_split(store, &plan).await
}

async fn commit_split<S>(store: &S, plan: &SplitPlan) -> Result<Vec<Path>, EngineError>
where
  S: WorkflowStore + ?Sized,
{
  let mut created = Vec::with_capacity(plan.names.len());
  for name in &plan.names {
    let path = store
      .create_minimal_path(&CreateMinimalPath {
        name: name.clone(),
        workflow_id: plan.workflow_id,
      })
      .await?;
    created.push(path);
  }

  let receiver = &created[plan.path_to_move];
  if !plan.blocks_to_move.is_empty() {
    store
      .move_blocks(&MoveBlocks {
        block_ids: plan.blocks_to_move.clone(),
        destination_path_id: receiver.id,
      })
      .await?;
  }

  if !plan.child_paths_to_move.is_empty() {
    let receiver_end = receiver
      .terminal_block()
      .ok_or_else(|| EngineError::invariant(format!("new path {} has no end block", receiver.id)))?;
    store
      .connect_paths(&ConnectPaths {
        child_path_ids: plan.child_paths_to_move.clone(),
        destination_path_id: receiver.id,
        source_block_id: Some(plan.split_block_id),
      })
      .await?;
    store
      .update_block_type(
        receiver_end.id,
        &UpdateBlockType {
          block_type: plan.split_block_type,
        },
      )
      .await?;
  }

  if plan.split_block_type != BlockType::Path {
    store
      .update_block_type(
        plan.split_block_id,
        &UpdateBlockType {
          block_type: BlockType::Path,
        },
      )
      .await?;
  }

  store
    .connect_paths(&ConnectPaths {
      child_path_ids: created.iter().map(|p| p.id).collect(),
      destination_path_id: plan.parent_path_id,
      source_block_id: None,
    })
    .await?;

  let paths = store.fetch_paths(plan.workflow_id).await?;
  info!(
    split_block_id = %plan.split_block_id,
    branches = created.len(),
    moved_blocks = plan.blocks_to_move.len(),
    moved_child_paths = plan.child_paths_to_move.len(),
    "split committed"
  );
  Ok(paths)
}

#[cfg(test)]
mod tests {
  use pathweave_model::{Block, PathParentBlock};

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

  fn linear() -> Vec<Path> {
    vec![path(
      1,
      &[
        (10, BlockType::Begin),
        (11, BlockType::Step),
        (12, BlockType::Delay),
        (13, BlockType::Step),
        (14, BlockType::Last),
      ],
      &[],
    )]
  }

  #[test]
  fn test_plan_collects_tail_blocks() {
    let plan = plan_split(&linear(), &SplitRequest::new(PathId(1), 2)).unwrap();
    assert_eq!(plan.split_block_id, BlockId(14));
    assert_eq!(plan.split_block_type, BlockType::Last);
    assert_eq!(plan.blocks_to_move, vec![BlockId(12), BlockId(13)]);
    assert!(plan.child_paths_to_move.is_empty());
    assert_eq!(plan.names, vec!["If", "Else"]);
  }

  #[test]
  fn test_plan_collects_child_paths() {
    let mut paths = linear();
    paths[0].blocks[4].block_type = BlockType::Path;
    paths.push(path(2, &[(20, BlockType::Begin), (21, BlockType::End)], &[14]));
    paths.push(path(3, &[(30, BlockType::Begin), (31, BlockType::End)], &[14]));

    let plan = plan_split(&paths, &SplitRequest::new(PathId(1), 1)).unwrap();
    assert_eq!(plan.split_block_type, BlockType::Path);
    assert_eq!(plan.child_paths_to_move, vec![PathId(2), PathId(3)]);
  }

  #[test]
  fn test_plan_rejects_bad_requests() {
    let paths = linear();

    let single = SplitRequest::new(PathId(1), 1).with_names(["Only"]);
    assert!(matches!(
      plan_split(&paths, &single),
      Err(EngineError::Validation(ValidationError::TooFewBranches { count: 1 }))
    ));

    let out_of_bounds = SplitRequest::new(PathId(1), 1).moving_to(2);
    assert!(matches!(
      plan_split(&paths, &out_of_bounds),
      Err(EngineError::Validation(ValidationError::BranchOutOfBounds { index: 2, count: 2 }))
    ));

    let at_begin = SplitRequest::new(PathId(1), 0);
    assert!(matches!(
      plan_split(&paths, &at_begin),
      Err(EngineError::Validation(ValidationError::SplitAtBegin { .. }))
    ));

    let unknown = SplitRequest::new(PathId(9), 1);
    assert!(matches!(
      plan_split(&paths, &unknown),
      Err(EngineError::Validation(ValidationError::UnknownPath { .. }))
    ));
  }

  #[test]
  fn test_plan_without_end_block_is_invariant_violation() {
    let result = plan_split(&linear(), &SplitRequest::new(PathId(1), 9));
    assert!(matches!(result, Err(EngineError::InvariantViolation { .. })));
  }
}
