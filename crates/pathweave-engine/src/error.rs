use pathweave_model::{BlockId, PathId};
use pathweave_store::StoreError;
use thiserror::Error;

/// Errors returned by the editing engines.
#[derive(Debug, Error)]
pub enum EngineError {
  /// The request was rejected before any store call.
  #[error("validation failed: {0}")]
  Validation(#[from] ValidationError),

  /// A store call failed. The cached graph was left as it was.
  #[error("store request failed: {0}")]
  Transport(#[from] StoreError),

  /// The cached graph is not in a shape the operation can work on.
  #[error("invariant violated: {message}")]
  InvariantViolation { message: String },

  /// A selection toggle was refused.
  #[error("selection rejected: {0}")]
  Selection(#[from] SelectionError),
}

impl EngineError {
  pub fn invariant(message: impl Into<String>) -> Self {
    Self::InvariantViolation {
      message: message.into(),
    }
  }

  /// Whether a store call was attempted and failed.
  pub fn is_transport(&self) -> bool {
    matches!(self, EngineError::Transport(_))
  }
}

/// Caller mistakes detected locally.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
  #[error("a split needs at least two branches, got {count}")]
  TooFewBranches { count: usize },

  #[error("branch index {index} is out of bounds for {count} branches")]
  BranchOutOfBounds { index: usize, count: usize },

  #[error("path {path_id} cannot be split before its BEGIN block")]
  SplitAtBegin { path_id: PathId },

  #[error("path {path_id} is not in the cached graph")]
  UnknownPath { path_id: PathId },

  #[error("block {block_id} is not in the cached graph")]
  UnknownBlock { block_id: BlockId },

  #[error("a merge needs at least two distinct end blocks, got {count}")]
  TooFewMergeParents { count: usize },

  #[error("block {block_id} cannot feed a merge: {reason}")]
  NotJoinable {
    block_id: BlockId,
    reason: &'static str,
  },

  #[error("block {block_id} lies in or below merge path {merge_path_id} and cannot feed it")]
  MergeCycle {
    block_id: BlockId,
    merge_path_id: PathId,
  },

  #[error("merge path {merge_path_id} would be left with {count} parent block(s)")]
  MergeBelowTwoParents { merge_path_id: PathId, count: usize },

  #[error("path {path_id} is not a merge path")]
  NotAMergePath { path_id: PathId },

  #[error("no merge update is active")]
  MergeUpdateInactive,
}

/// Refused selection toggles.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectionError {
  #[error("path {path_id} hangs from block {found}, but the selection is under block {expected}")]
  ParentMismatch {
    path_id: PathId,
    expected: BlockId,
    found: BlockId,
  },

  #[error("path {path_id} is not a branch of a split point")]
  NotABranch { path_id: PathId },

  #[error("path {path_id} has no terminal block")]
  NoEndBlock { path_id: PathId },

  #[error("no merge update is active")]
  Inactive,
}
