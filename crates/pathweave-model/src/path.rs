use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::block::{Block, BlockType};
use crate::ids::{BlockId, PathId, WorkflowId};

/// Edge between a block and the path that follows it.
///
/// Listed in `Block::child_paths` of the preceding block and in
/// `Path::parent_blocks` of the following path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathParentBlock {
  pub path_id: PathId,
  pub block_id: BlockId,
  pub created_at: DateTime<Utc>,
}

impl PathParentBlock {
  pub fn new(path_id: PathId, block_id: BlockId) -> Self {
    Self {
      path_id,
      block_id,
      created_at: Utc::now(),
    }
  }
}

/// A linear sequence of blocks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Path {
  pub id: PathId,
  pub name: String,
  pub workflow_id: WorkflowId,
  /// Blocks ordered by position.
  #[serde(default)]
  pub blocks: Vec<Block>,
  /// Edges from the blocks preceding this path, in creation order.
  #[serde(default)]
  pub parent_blocks: Vec<PathParentBlock>,
}

impl Path {
  /// Get a block by ID.
  pub fn block(&self, block_id: BlockId) -> Option<&Block> {
    self.blocks.iter().find(|b| b.id == block_id)
  }

  /// The final block of the path, if any.
  pub fn terminal_block(&self) -> Option<&Block> {
    self.blocks.iter().max_by_key(|b| b.position)
  }

  /// The first end-type block at or after `position` (lowest position wins).
  pub fn end_block_from(&self, position: u32) -> Option<&Block> {
    self
      .blocks
      .iter()
      .filter(|b| b.position >= position && b.is_end_type())
      .min_by_key(|b| b.position)
  }

  /// Ids of the blocks preceding this path, in edge order.
  pub fn parent_block_ids(&self) -> Vec<BlockId> {
    self.parent_blocks.iter().map(|edge| edge.block_id).collect()
  }

  /// The workflow's root path has no parent edges.
  pub fn is_root(&self) -> bool {
    self.parent_blocks.is_empty()
  }

  /// A merge path is preceded by two or more blocks.
  pub fn is_merge(&self) -> bool {
    self.parent_blocks.len() >= 2
  }

  /// The type of the terminal block.
  pub fn terminal_type(&self) -> Option<BlockType> {
    self.terminal_block().map(|b| b.block_type)
  }

  /// Sort blocks by position.
  pub fn sort_blocks(&mut self) {
    self.blocks.sort_by_key(|b| b.position);
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn path_with(types: &[BlockType]) -> Path {
    let blocks = types
      .iter()
      .enumerate()
      .map(|(i, t)| Block::new(BlockId(i as i64 + 1), PathId(1), WorkflowId(1), i as u32, *t))
      .collect();
    Path {
      id: PathId(1),
      name: "main".to_string(),
      workflow_id: WorkflowId(1),
      blocks,
      parent_blocks: vec![],
    }
  }

  #[test]
  fn test_terminal_block() {
    let path = path_with(&[BlockType::Begin, BlockType::Step, BlockType::End]);
    assert_eq!(path.terminal_block().unwrap().id, BlockId(3));
    assert_eq!(path.terminal_type(), Some(BlockType::End));
  }

  #[test]
  fn test_end_block_from_picks_lowest_position() {
    let path = path_with(&[
      BlockType::Begin,
      BlockType::Step,
      BlockType::Step,
      BlockType::Last,
    ]);
    assert_eq!(path.end_block_from(1).unwrap().id, BlockId(4));
    assert_eq!(path.end_block_from(3).unwrap().id, BlockId(4));
    assert!(path.end_block_from(4).is_none());
  }

  #[test]
  fn test_root_and_merge_classification() {
    let mut path = path_with(&[BlockType::Begin, BlockType::End]);
    assert!(path.is_root());
    assert!(!path.is_merge());

    path.parent_blocks.push(PathParentBlock::new(PathId(1), BlockId(10)));
    assert!(!path.is_root());
    assert!(!path.is_merge());

    path.parent_blocks.push(PathParentBlock::new(PathId(1), BlockId(22)));
    assert!(path.is_merge());
    assert_eq!(path.parent_block_ids(), vec![BlockId(10), BlockId(22)]);
  }
}
