//! Incremental patching of the projection by graph change events.
//!
//! Block list changes are computed on a copy of the node's entries and
//! swapped in once complete, so a rejected event leaves the tree as it was.

use std::collections::{HashMap, HashSet};

use pathweave_model::{Block, BlockId, GraphEvent, PathId};
use tracing::{debug, warn};

use crate::error::ProjectionError;
use crate::tree::{BlockEntry, NodeId, PathNode, TreeProjection};

impl TreeProjection {
  /// Apply one change event.
  ///
  /// Events that cannot be placed are dropped with a warning and reported
  /// as an error.
  pub fn apply(&mut self, event: &GraphEvent) -> Result<(), ProjectionError> {
    let result = match event {
      GraphEvent::PathCreated {
        path_id,
        name,
        blocks,
      } => self.create_root(*path_id, name, blocks),
      GraphEvent::SubpathCreated {
        path_id,
        name,
        parent_block_ids,
        blocks,
      } => self.create_subpath(*path_id, name, parent_block_ids, blocks),
      GraphEvent::BlockAdded { path_id, blocks } => {
        self.patch_blocks(*path_id, |entries| add_blocks(entries, blocks))
      }
      GraphEvent::BlockUpdated { path_id, blocks } => {
        self.patch_blocks(*path_id, |entries| update_blocks(entries, blocks))
      }
      GraphEvent::BlockDeleted { path_id, blocks } => {
        self.patch_blocks(*path_id, |entries| delete_blocks(entries, blocks))
      }
      GraphEvent::BlockReordered { path_id, blocks } => {
        self.patch_blocks(*path_id, |entries| reorder_blocks(entries, blocks))
      }
      GraphEvent::PathRemoved { path_id } => self.remove_path(*path_id),
      GraphEvent::GraphReloaded { paths } => {
        self.rebuild(paths);
        Ok(())
      }
    };

    match &result {
      Ok(()) => debug!(event = event.kind(), path_id = ?event.path_id(), "applied event"),
      Err(e) => warn!(event = event.kind(), error = %e, "dropped event"),
    }
    result
  }

  fn create_root(
    &mut self,
    path_id: PathId,
    name: &str,
    blocks: &[Block],
  ) -> Result<(), ProjectionError> {
    if self.paths.contains_key(&path_id) {
      return Err(ProjectionError::DuplicatePath { path_id });
    }
    if self.root.is_some_and(|r| self.node(r).is_some()) {
      return Err(ProjectionError::DetachedPath { path_id });
    }

    let node_id = self.insert_node(PathNode {
      path_id,
      name: name.to_string(),
      blocks: blocks.iter().map(BlockEntry::from_block).collect(),
      parent_block: None,
    });
    self.root = Some(node_id);
    Ok(())
  }

  fn create_subpath(
    &mut self,
    path_id: PathId,
    name: &str,
    parent_block_ids: &[BlockId],
    blocks: &[Block],
  ) -> Result<(), ProjectionError> {
    if self.paths.contains_key(&path_id) {
      return Err(ProjectionError::DuplicatePath { path_id });
    }
    // Merge paths hang under the last of their parent blocks.
    let Some(&anchor) = parent_block_ids.last() else {
      return Err(ProjectionError::DetachedPath { path_id });
    };
    let &host = self
      .blocks
      .get(&anchor)
      .ok_or(ProjectionError::BlockNotFound { block_id: anchor })?;
    let host_index = self
      .node(host)
      .and_then(|n| n.blocks.iter().position(|e| e.id == anchor))
      .ok_or(ProjectionError::BlockNotFound { block_id: anchor })?;

    let node_id = self.insert_node(PathNode {
      path_id,
      name: name.to_string(),
      blocks: blocks.iter().map(BlockEntry::from_block).collect(),
      parent_block: Some(anchor),
    });
    if let Some(node) = self.node_mut(host) {
      node.blocks[host_index].subpaths.push(node_id);
    }
    Ok(())
  }

  fn patch_blocks<F>(&mut self, path_id: PathId, patch: F) -> Result<(), ProjectionError>
  where
    F: FnOnce(&[BlockEntry]) -> Vec<BlockEntry>,
  {
    let &node_id = self
      .paths
      .get(&path_id)
      .ok_or(ProjectionError::PathNotFound { path_id })?;
    let current = self
      .node(node_id)
      .map(|n| n.blocks.as_slice())
      .ok_or(ProjectionError::PathNotFound { path_id })?;

    let before = current_ids(current);
    let next = patch(current);
    self.reindex_blocks(node_id, before, &next);
    if let Some(node) = self.node_mut(node_id) {
      node.blocks = next;
    }
    Ok(())
  }

  fn reindex_blocks(&mut self, node_id: NodeId, before: Vec<BlockId>, after: &[BlockEntry]) {
    let kept: HashSet<BlockId> = after.iter().map(|e| e.id).collect();
    for id in before {
      if !kept.contains(&id) && self.blocks.get(&id) == Some(&node_id) {
        self.blocks.remove(&id);
      }
    }
    for entry in after {
      self.blocks.insert(entry.id, node_id);
    }
  }

  fn remove_path(&mut self, path_id: PathId) -> Result<(), ProjectionError> {
    let &node_id = self
      .paths
      .get(&path_id)
      .ok_or(ProjectionError::PathNotFound { path_id })?;

    let parent_block = self.node(node_id).and_then(|n| n.parent_block);
    if let Some(block_id) = parent_block
      && let Some(&host) = self.blocks.get(&block_id)
      && let Some(node) = self.node_mut(host)
    {
      for entry in &mut node.blocks {
        entry.subpaths.retain(|&id| id != node_id);
      }
    }

    let removed = self.remove_subtree(node_id);
    debug!(%path_id, removed = removed.len(), "removed path subtree");
    Ok(())
  }
}

fn current_ids(entries: &[BlockEntry]) -> Vec<BlockId> {
  entries.iter().map(|e| e.id).collect()
}

fn renumber(entries: &mut [BlockEntry]) {
  for (i, entry) in entries.iter_mut().enumerate() {
    entry.position = i as u32;
  }
}

/// Insert entries for unseen blocks at their incoming index. Known blocks
/// only take the new position.
pub(crate) fn add_blocks(entries: &[BlockEntry], incoming: &[Block]) -> Vec<BlockEntry> {
  let mut result = entries.to_vec();
  for (index, block) in incoming.iter().enumerate() {
    match result.iter_mut().find(|e| e.id == block.id) {
      Some(existing) => existing.position = block.position,
      None => {
        let at = index.min(result.len());
        result.insert(at, BlockEntry::from_block(block));
      }
    }
  }
  renumber(&mut result);
  result
}

/// Overwrite display fields of known blocks, keeping their subpaths.
pub(crate) fn update_blocks(entries: &[BlockEntry], incoming: &[Block]) -> Vec<BlockEntry> {
  let by_id: HashMap<BlockId, &Block> = incoming.iter().map(|b| (b.id, b)).collect();
  let mut result = entries.to_vec();
  for entry in &mut result {
    if let Some(block) = by_id.get(&entry.id) {
      entry.overwrite_display(block);
    }
  }
  result
}

/// Drop entries missing from the incoming list.
pub(crate) fn delete_blocks(entries: &[BlockEntry], incoming: &[Block]) -> Vec<BlockEntry> {
  let present: HashSet<BlockId> = incoming.iter().map(|b| b.id).collect();
  entries
    .iter()
    .filter(|e| present.contains(&e.id))
    .cloned()
    .collect()
}

/// Re-sort by incoming index. Entries the incoming list does not mention
/// keep their old position.
pub(crate) fn reorder_blocks(entries: &[BlockEntry], incoming: &[Block]) -> Vec<BlockEntry> {
  let order: HashMap<BlockId, u32> = incoming
    .iter()
    .enumerate()
    .map(|(i, b)| (b.id, i as u32))
    .collect();
  let mut result = entries.to_vec();
  for entry in &mut result {
    if let Some(&position) = order.get(&entry.id) {
      entry.position = position;
    }
  }
  result.sort_by_key(|e| e.position);
  result
}

#[cfg(test)]
mod tests {
  use pathweave_model::{BlockType, WorkflowId};

  use super::*;

  fn block(id: i64, position: u32, block_type: BlockType, title: &str) -> Block {
    Block::new(BlockId(id), PathId(1), WorkflowId(1), position, block_type).with_title(title)
  }

  fn entries(blocks: &[Block]) -> Vec<BlockEntry> {
    blocks.iter().map(BlockEntry::from_block).collect()
  }

  fn ids(entries: &[BlockEntry]) -> Vec<i64> {
    entries.iter().map(|e| e.id.0).collect()
  }

  #[test]
  fn test_add_inserts_at_incoming_index_and_renumbers() {
    let cached = entries(&[
      block(1, 0, BlockType::Begin, "start"),
      block(3, 1, BlockType::Last, "end"),
    ]);
    let incoming = vec![
      block(1, 0, BlockType::Begin, "start"),
      block(2, 1, BlockType::Step, "new"),
      block(3, 2, BlockType::Last, "end"),
    ];

    let result = add_blocks(&cached, &incoming);
    assert_eq!(ids(&result), vec![1, 2, 3]);
    assert_eq!(
      result.iter().map(|e| e.position).collect::<Vec<_>>(),
      vec![0, 1, 2]
    );
    assert_eq!(result[1].title.as_deref(), Some("new"));
  }

  #[test]
  fn test_update_keeps_subpaths() {
    let mut cached = entries(&[block(1, 0, BlockType::Step, "old")]);
    cached[0].subpaths = vec![NodeId(4)];

    let result = update_blocks(&cached, &[block(1, 0, BlockType::Path, "renamed")]);
    assert_eq!(result[0].title.as_deref(), Some("renamed"));
    assert_eq!(result[0].block_type, BlockType::Path);
    assert_eq!(result[0].subpaths, vec![NodeId(4)]);
  }

  #[test]
  fn test_update_ignores_unknown_blocks() {
    let cached = entries(&[block(1, 0, BlockType::Step, "a")]);
    let result = update_blocks(&cached, &[block(9, 0, BlockType::Step, "other")]);
    assert_eq!(result, cached);
  }

  #[test]
  fn test_delete_drops_missing_entries() {
    let cached = entries(&[
      block(1, 0, BlockType::Begin, ""),
      block(2, 1, BlockType::Step, ""),
      block(3, 2, BlockType::Last, ""),
    ]);
    let result = delete_blocks(
      &cached,
      &[block(1, 0, BlockType::Begin, ""), block(3, 1, BlockType::Last, "")],
    );
    assert_eq!(ids(&result), vec![1, 3]);
  }

  #[test]
  fn test_reorder_matches_incoming_order() {
    let cached = entries(&[
      block(1, 0, BlockType::Begin, "start"),
      block(2, 1, BlockType::Step, "a"),
      block(3, 2, BlockType::Step, "b"),
      block(4, 3, BlockType::Last, "end"),
    ]);
    let incoming = vec![
      block(1, 0, BlockType::Begin, "start"),
      block(3, 1, BlockType::Step, "b"),
      block(2, 2, BlockType::Step, "a"),
      block(4, 3, BlockType::Last, "end"),
    ];

    let result = reorder_blocks(&cached, &incoming);
    assert_eq!(ids(&result), vec![1, 3, 2, 4]);
    assert_eq!(result[1].title.as_deref(), Some("b"));
    assert_eq!(result[2].title.as_deref(), Some("a"));
  }
}
