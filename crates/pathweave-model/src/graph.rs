use std::collections::{HashMap, HashSet};

use crate::block::Block;
use crate::ids::{BlockId, PathId};
use crate::path::Path;

/// Read-only index over a path set for traversal and lookups.
#[derive(Debug, Clone)]
pub struct WorkflowGraph<'a> {
  paths: &'a [Path],
  /// path_id -> index into `paths`.
  path_index: HashMap<PathId, usize>,
  /// block_id -> (index into `paths`, index into that path's blocks).
  block_index: HashMap<BlockId, (usize, usize)>,
  /// block_id -> downstream path ids, as recorded on the path side.
  downstream: HashMap<BlockId, Vec<PathId>>,
}

impl<'a> WorkflowGraph<'a> {
  /// Build the index over `paths`.
  pub fn new(paths: &'a [Path]) -> Self {
    let mut path_index = HashMap::with_capacity(paths.len());
    let mut block_index = HashMap::new();
    let mut downstream: HashMap<BlockId, Vec<PathId>> = HashMap::new();

    for (pi, path) in paths.iter().enumerate() {
      path_index.insert(path.id, pi);
      for (bi, block) in path.blocks.iter().enumerate() {
        block_index.entry(block.id).or_insert((pi, bi));
      }
      for edge in &path.parent_blocks {
        downstream.entry(edge.block_id).or_default().push(path.id);
      }
    }

    Self {
      paths,
      path_index,
      block_index,
      downstream,
    }
  }

  /// All paths in storage order.
  pub fn paths(&self) -> &'a [Path] {
    self.paths
  }

  /// Get a path by ID.
  pub fn path(&self, path_id: PathId) -> Option<&'a Path> {
    self.path_index.get(&path_id).map(|&i| &self.paths[i])
  }

  /// Get a block by ID.
  pub fn block(&self, block_id: BlockId) -> Option<&'a Block> {
    self
      .block_index
      .get(&block_id)
      .map(|&(pi, bi)| &self.paths[pi].blocks[bi])
  }

  /// Get the path that owns a block.
  pub fn owner(&self, block_id: BlockId) -> Option<&'a Path> {
    self.block_index.get(&block_id).map(|&(pi, _)| &self.paths[pi])
  }

  /// The workflow's root path (the first path without parent edges).
  pub fn root(&self) -> Option<&'a Path> {
    self.paths.iter().find(|p| p.is_root())
  }

  /// Paths that begin after `block_id`.
  pub fn downstream(&self, block_id: BlockId) -> &[PathId] {
    self
      .downstream
      .get(&block_id)
      .map(|v| v.as_slice())
      .unwrap_or(&[])
  }

  /// The single block an ordinary branch hangs from.
  ///
  /// Returns `None` for the root path and for merge paths.
  pub fn split_point(&self, path_id: PathId) -> Option<BlockId> {
    let path = self.path(path_id)?;
    match path.parent_blocks.as_slice() {
      [edge] => Some(edge.block_id),
      _ => None,
    }
  }

  /// Branches hanging from the same split point as `path_id`, including itself.
  pub fn siblings(&self, path_id: PathId) -> Vec<PathId> {
    match self.split_point(path_id) {
      Some(block_id) => self
        .downstream(block_id)
        .iter()
        .copied()
        .filter(|id| self.split_point(*id) == Some(block_id))
        .collect(),
      None => vec![path_id],
    }
  }

  /// Paths reachable from `path_id` through one or more edges.
  ///
  /// Contains `path_id` itself only when the graph has a cycle through it.
  pub fn descendants(&self, path_id: PathId) -> HashSet<PathId> {
    let mut seen = HashSet::new();
    let mut stack = vec![path_id];
    while let Some(current) = stack.pop() {
      let Some(path) = self.path(current) else {
        continue;
      };
      for block in &path.blocks {
        for &child in self.downstream(block.id) {
          if seen.insert(child) {
            stack.push(child);
          }
        }
      }
    }
    seen
  }

  /// Paths with two or more parent edges.
  pub fn merge_paths(&self) -> impl Iterator<Item = &'a Path> + '_ {
    self.paths.iter().filter(|p| p.is_merge())
  }

  /// The parent block under which a merge path's subtree is shown.
  ///
  /// Several blocks feed one merge path; navigation renders the merged
  /// region once, under the last of them in edge order.
  pub fn last_merge_occurrence(&self, merge_path_id: PathId) -> Option<BlockId> {
    self
      .path(merge_path_id)
      .and_then(|p| p.parent_blocks.last())
      .map(|edge| edge.block_id)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::block::BlockType;
  use crate::ids::WorkflowId;
  use crate::path::PathParentBlock;

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

  fn diamond() -> Vec<Path> {
    vec![
      path(1, &[(1, BlockType::Begin), (2, BlockType::Path)], &[]),
      path(2, &[(10, BlockType::Begin), (11, BlockType::Merge)], &[2]),
      path(3, &[(20, BlockType::Begin), (21, BlockType::Merge)], &[2]),
      path(4, &[(30, BlockType::Begin), (31, BlockType::Last)], &[11, 21]),
    ]
  }

  #[test]
  fn test_lookups() {
    let paths = diamond();
    let graph = WorkflowGraph::new(&paths);

    assert_eq!(graph.root().unwrap().id, PathId(1));
    assert_eq!(graph.owner(BlockId(21)).unwrap().id, PathId(3));
    assert_eq!(graph.block(BlockId(31)).unwrap().block_type, BlockType::Last);
    assert_eq!(graph.downstream(BlockId(2)), &[PathId(2), PathId(3)]);
    assert!(graph.downstream(BlockId(31)).is_empty());
  }

  #[test]
  fn test_split_point_and_siblings() {
    let paths = diamond();
    let graph = WorkflowGraph::new(&paths);

    assert_eq!(graph.split_point(PathId(2)), Some(BlockId(2)));
    assert_eq!(graph.split_point(PathId(1)), None);
    assert_eq!(graph.split_point(PathId(4)), None);
    assert_eq!(graph.siblings(PathId(3)), vec![PathId(2), PathId(3)]);
  }

  #[test]
  fn test_merge_paths_and_last_occurrence() {
    let paths = diamond();
    let graph = WorkflowGraph::new(&paths);

    let merges: Vec<_> = graph.merge_paths().map(|p| p.id).collect();
    assert_eq!(merges, vec![PathId(4)]);
    assert_eq!(graph.last_merge_occurrence(PathId(4)), Some(BlockId(21)));
  }

  #[test]
  fn test_descendants() {
    let paths = diamond();
    let graph = WorkflowGraph::new(&paths);

    let from_root = graph.descendants(PathId(1));
    assert_eq!(from_root, HashSet::from([PathId(2), PathId(3), PathId(4)]));
    assert_eq!(graph.descendants(PathId(2)), HashSet::from([PathId(4)]));
    assert!(graph.descendants(PathId(4)).is_empty());
  }
}
