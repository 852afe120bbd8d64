use std::collections::HashMap;

use pathweave_model::{Block, BlockId, BlockType, Path, PathId, WorkflowGraph};
use tracing::{debug, warn};

/// Index of a node in the projection arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub(crate) usize);

/// Display copy of a block, plus the subpaths shown beneath it.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockEntry {
  pub id: BlockId,
  pub block_type: BlockType,
  pub position: u32,
  pub icon: Option<String>,
  pub title: Option<String>,
  pub description: Option<String>,
  pub subpaths: Vec<NodeId>,
}

impl BlockEntry {
  pub(crate) fn from_block(block: &Block) -> Self {
    Self {
      id: block.id,
      block_type: block.block_type,
      position: block.position,
      icon: block.icon.clone(),
      title: block.title.clone(),
      description: block.description.clone(),
      subpaths: Vec::new(),
    }
  }

  /// Copy display fields from `block`, keeping the entry's subpaths.
  pub(crate) fn overwrite_display(&mut self, block: &Block) {
    self.block_type = block.block_type;
    self.position = block.position;
    self.icon = block.icon.clone();
    self.title = block.title.clone();
    self.description = block.description.clone();
  }
}

/// One path in the projection.
#[derive(Debug, Clone, PartialEq)]
pub struct PathNode {
  pub path_id: PathId,
  pub name: String,
  pub blocks: Vec<BlockEntry>,
  /// Block this node is rendered under. `None` for the root.
  pub parent_block: Option<BlockId>,
}

/// Where a block sits in the navigation tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockLocation {
  /// Paths from the root down to the block's owner, inclusive.
  pub path_chain: Vec<PathId>,
  pub position: u32,
}

/// Deduplicated navigation tree over a path graph.
#[derive(Debug, Clone, Default)]
pub struct TreeProjection {
  pub(crate) nodes: Vec<Option<PathNode>>,
  pub(crate) paths: HashMap<PathId, NodeId>,
  /// block_id -> node holding the block.
  pub(crate) blocks: HashMap<BlockId, NodeId>,
  pub(crate) root: Option<NodeId>,
}

impl TreeProjection {
  /// Build a projection from a full path set.
  pub fn from_paths(paths: &[Path]) -> Self {
    let mut projection = Self::default();
    projection.rebuild(paths);
    projection
  }

  /// Discard all nodes and build again from `paths`.
  pub fn rebuild(&mut self, paths: &[Path]) {
    self.nodes.clear();
    self.paths.clear();
    self.blocks.clear();
    self.root = None;

    let graph = WorkflowGraph::new(paths);
    let Some(root) = graph.root() else {
      if !paths.is_empty() {
        warn!(paths = paths.len(), "no root path, projection left empty");
      }
      return;
    };

    let root_id = self.expand(&graph, root, None);
    self.root = Some(root_id);

    let unreached = paths.len().saturating_sub(self.paths.len());
    if unreached > 0 {
      warn!(unreached, "paths not reachable from the root were left out");
    }
    debug!(nodes = self.paths.len(), "projection rebuilt");
  }

  fn expand(
    &mut self,
    graph: &WorkflowGraph<'_>,
    path: &Path,
    parent_block: Option<BlockId>,
  ) -> NodeId {
    let node_id = self.insert_node(PathNode {
      path_id: path.id,
      name: path.name.clone(),
      blocks: path.blocks.iter().map(BlockEntry::from_block).collect(),
      parent_block,
    });

    for (index, block) in path.blocks.iter().enumerate() {
      let mut subpaths = Vec::new();
      for &child_id in graph.downstream(block.id) {
        let Some(child) = graph.path(child_id) else {
          continue;
        };
        if child.is_merge() && graph.last_merge_occurrence(child_id) != Some(block.id) {
          continue;
        }
        if self.paths.contains_key(&child_id) {
          warn!(path_id = %child_id, block_id = %block.id, "path already placed, skipping");
          continue;
        }
        subpaths.push(self.expand(graph, child, Some(block.id)));
      }

      if subpaths.is_empty() {
        continue;
      }
      if let Some(node) = self.node_mut(node_id) {
        node.blocks[index].subpaths = subpaths;
      }
    }

    node_id
  }

  pub(crate) fn insert_node(&mut self, node: PathNode) -> NodeId {
    let node_id = NodeId(self.nodes.len());
    self.paths.insert(node.path_id, node_id);
    for entry in &node.blocks {
      self.blocks.insert(entry.id, node_id);
    }
    self.nodes.push(Some(node));
    node_id
  }

  /// Remove a node and every node beneath it. Returns the removed path ids.
  pub(crate) fn remove_subtree(&mut self, node_id: NodeId) -> Vec<PathId> {
    let mut removed = Vec::new();
    let mut stack = vec![node_id];

    while let Some(current) = stack.pop() {
      let Some(node) = self.nodes.get_mut(current.0).and_then(Option::take) else {
        continue;
      };
      if self.paths.get(&node.path_id) == Some(&current) {
        self.paths.remove(&node.path_id);
      }
      for entry in &node.blocks {
        if self.blocks.get(&entry.id) == Some(&current) {
          self.blocks.remove(&entry.id);
        }
        stack.extend(entry.subpaths.iter().copied());
      }
      if self.root == Some(current) {
        self.root = None;
      }
      removed.push(node.path_id);
    }

    removed
  }

  pub(crate) fn node_mut(&mut self, node_id: NodeId) -> Option<&mut PathNode> {
    self.nodes.get_mut(node_id.0).and_then(Option::as_mut)
  }

  /// Get a node by arena index.
  pub fn node(&self, node_id: NodeId) -> Option<&PathNode> {
    self.nodes.get(node_id.0).and_then(Option::as_ref)
  }

  /// Get the node for a path.
  pub fn path_node(&self, path_id: PathId) -> Option<&PathNode> {
    self.paths.get(&path_id).and_then(|&id| self.node(id))
  }

  /// Root node of the tree, if any.
  pub fn root(&self) -> Option<NodeId> {
    self.root
  }

  /// Number of paths held.
  pub fn len(&self) -> usize {
    self.paths.len()
  }

  pub fn is_empty(&self) -> bool {
    self.paths.is_empty()
  }

  /// Find where a block is shown: the chain of paths from the root to its
  /// owner, and its position in the owner.
  ///
  /// Returns `None` for unknown blocks and for blocks whose node is not
  /// attached to the root.
  pub fn locate_block(&self, block_id: BlockId) -> Option<BlockLocation> {
    let &owner = self.blocks.get(&block_id)?;
    let node = self.node(owner)?;
    let position = node.blocks.iter().find(|e| e.id == block_id)?.position;

    let mut chain = vec![node.path_id];
    let mut current = node;
    while let Some(parent_block) = current.parent_block {
      if chain.len() > self.paths.len() {
        warn!(%block_id, "cycle while locating block");
        return None;
      }
      let &parent_id = self.blocks.get(&parent_block)?;
      current = self.node(parent_id)?;
      chain.push(current.path_id);
    }

    if self.root.and_then(|r| self.node(r)).map(|n| n.path_id) != Some(current.path_id) {
      return None;
    }

    chain.reverse();
    Some(BlockLocation {
      path_chain: chain,
      position,
    })
  }
}

#[cfg(test)]
mod tests {
  use pathweave_model::{PathParentBlock, WorkflowId};

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

  /// Root splits at block 11 into B and C, both merge into D.
  fn diamond() -> Vec<Path> {
    vec![
      path(1, &[(10, BlockType::Begin), (11, BlockType::Path)], &[]),
      path(2, &[(20, BlockType::Begin), (21, BlockType::Merge)], &[11]),
      path(3, &[(30, BlockType::Begin), (31, BlockType::Merge)], &[11]),
      path(4, &[(40, BlockType::Begin), (41, BlockType::Last)], &[21, 31]),
    ]
  }

  #[test]
  fn test_merge_path_appears_once() {
    let projection = TreeProjection::from_paths(&diamond());
    assert_eq!(projection.len(), 4);

    let b = projection.path_node(PathId(2)).unwrap();
    let c = projection.path_node(PathId(3)).unwrap();
    assert!(b.blocks[1].subpaths.is_empty());
    assert_eq!(c.blocks[1].subpaths.len(), 1);

    let d = projection.path_node(PathId(4)).unwrap();
    assert_eq!(d.parent_block, Some(BlockId(31)));
  }

  #[test]
  fn test_branches_nest_under_split_block() {
    let projection = TreeProjection::from_paths(&diamond());
    let root = projection.node(projection.root().unwrap()).unwrap();
    assert_eq!(root.path_id, PathId(1));
    assert_eq!(root.blocks[1].subpaths.len(), 2);
    assert!(root.parent_block.is_none());
  }

  #[test]
  fn test_locate_block_in_merge_path() {
    let projection = TreeProjection::from_paths(&diamond());
    let location = projection.locate_block(BlockId(41)).unwrap();
    assert_eq!(location.path_chain, vec![PathId(1), PathId(3), PathId(4)]);
    assert_eq!(location.position, 1);
    assert!(projection.locate_block(BlockId(99)).is_none());
  }

  #[test]
  fn test_rebuild_replaces_contents() {
    let mut projection = TreeProjection::from_paths(&diamond());
    projection.rebuild(&[path(7, &[(70, BlockType::Begin), (71, BlockType::Last)], &[])]);
    assert_eq!(projection.len(), 1);
    assert!(projection.path_node(PathId(1)).is_none());
    assert!(projection.locate_block(BlockId(71)).is_some());
  }

  #[test]
  fn test_empty_graph() {
    let projection = TreeProjection::from_paths(&[]);
    assert!(projection.is_empty());
    assert!(projection.root().is_none());
  }
}
