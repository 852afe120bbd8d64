use thiserror::Error;

use crate::block::BlockType;
use crate::ids::{BlockId, PathId};

/// A structural invariant violated by a path set.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
  #[error("path {path_id} has no BEGIN block at position 0")]
  MissingBegin { path_id: PathId },

  #[error("path {path_id} has more than one BEGIN block")]
  DuplicateBegin { path_id: PathId },

  #[error("path {path_id} ends with {block_type:?}, expected an end-type block")]
  InvalidTerminal {
    path_id: PathId,
    block_type: BlockType,
  },

  #[error("path {path_id} has no blocks")]
  EmptyPath { path_id: PathId },

  #[error("block {block_id} of type {block_type:?} is not allowed inside path {path_id}")]
  MisplacedBlock {
    path_id: PathId,
    block_id: BlockId,
    block_type: BlockType,
  },

  #[error("path {path_id} has block at position {found}, expected {expected}")]
  PositionGap {
    path_id: PathId,
    expected: u32,
    found: u32,
  },

  #[error("block {block_id} of type {block_type:?} has child paths")]
  UnexpectedChildPaths {
    block_id: BlockId,
    block_type: BlockType,
  },

  #[error("block {block_id} appears in paths {first} and {second}")]
  SharedBlock {
    block_id: BlockId,
    first: PathId,
    second: PathId,
  },

  #[error("block {block_id} claims path {claimed} but is stored in path {actual}")]
  WrongOwner {
    block_id: BlockId,
    claimed: PathId,
    actual: PathId,
  },

  #[error("edge from block {block_id} to path {path_id} is not recorded on both ends")]
  AsymmetricEdge { block_id: BlockId, path_id: PathId },

  #[error("edge references unknown block {block_id} (path {path_id})")]
  DanglingEdge { block_id: BlockId, path_id: PathId },

  #[error("merge path {path_id} has parent block {block_id} of type {block_type:?}")]
  MergeParentNotMerge {
    path_id: PathId,
    block_id: BlockId,
    block_type: BlockType,
  },

  #[error("path {path_id} is reachable from itself")]
  Cycle { path_id: PathId },
}
