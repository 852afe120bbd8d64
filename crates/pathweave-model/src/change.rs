//! Typed change events derived from two authoritative path sets.
//!
//! After every committed mutation the client replaces its cached paths with
//! the store's answer. [`diff_paths`] compares the two sets so that views
//! derived from the graph can patch themselves instead of rebuilding.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::block::Block;
use crate::ids::{BlockId, PathId};
use crate::path::Path;

/// A change to the path graph.
///
/// Block-level events carry the new authoritative block list of the path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum GraphEvent {
  /// A path without parent edges appeared.
  PathCreated {
    path_id: PathId,
    name: String,
    blocks: Vec<Block>,
  },

  /// A path hanging from one or more existing blocks appeared.
  SubpathCreated {
    path_id: PathId,
    name: String,
    parent_block_ids: Vec<BlockId>,
    blocks: Vec<Block>,
  },

  BlockAdded { path_id: PathId, blocks: Vec<Block> },

  BlockUpdated { path_id: PathId, blocks: Vec<Block> },

  BlockDeleted { path_id: PathId, blocks: Vec<Block> },

  BlockReordered { path_id: PathId, blocks: Vec<Block> },

  /// A path disappeared from the graph.
  PathRemoved { path_id: PathId },

  /// Edges between existing paths changed; consumers should rebuild.
  GraphReloaded { paths: Vec<Path> },
}

impl GraphEvent {
  /// The path this event targets, if it targets a single path.
  pub fn path_id(&self) -> Option<PathId> {
    match self {
      GraphEvent::PathCreated { path_id, .. }
      | GraphEvent::SubpathCreated { path_id, .. }
      | GraphEvent::BlockAdded { path_id, .. }
      | GraphEvent::BlockUpdated { path_id, .. }
      | GraphEvent::BlockDeleted { path_id, .. }
      | GraphEvent::BlockReordered { path_id, .. }
      | GraphEvent::PathRemoved { path_id } => Some(*path_id),
      GraphEvent::GraphReloaded { .. } => None,
    }
  }

  /// Short name for logging.
  pub fn kind(&self) -> &'static str {
    match self {
      GraphEvent::PathCreated { .. } => "path_created",
      GraphEvent::SubpathCreated { .. } => "subpath_created",
      GraphEvent::BlockAdded { .. } => "block_added",
      GraphEvent::BlockUpdated { .. } => "block_updated",
      GraphEvent::BlockDeleted { .. } => "block_deleted",
      GraphEvent::BlockReordered { .. } => "block_reordered",
      GraphEvent::PathRemoved { .. } => "path_removed",
      GraphEvent::GraphReloaded { .. } => "graph_reloaded",
    }
  }
}

/// Result of comparing two path sets.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GraphDiff {
  /// Fine-grained events, in application order.
  pub events: Vec<GraphEvent>,
  /// Set when an edge touching a pre-existing path appeared or vanished.
  pub structural: bool,
}

impl GraphDiff {
  pub fn is_empty(&self) -> bool {
    self.events.is_empty() && !self.structural
  }

  /// The events a consumer should apply.
  ///
  /// A structural diff collapses into one `GraphReloaded` carrying `paths`.
  pub fn into_events(self, paths: &[Path]) -> Vec<GraphEvent> {
    if self.structural {
      vec![GraphEvent::GraphReloaded {
        paths: paths.to_vec(),
      }]
    } else {
      self.events
    }
  }
}

/// Compare an old and a new path set.
pub fn diff_paths(old: &[Path], new: &[Path]) -> GraphDiff {
  let old_by_id: HashMap<PathId, &Path> = old.iter().map(|p| (p.id, p)).collect();
  let new_ids: HashSet<PathId> = new.iter().map(|p| p.id).collect();

  let mut events = Vec::new();
  let mut created = Vec::new();

  for path in new {
    match old_by_id.get(&path.id) {
      Some(previous) => diff_blocks(previous, path, &mut events),
      None => created.push(path),
    }
  }

  for path in &created {
    let event = if path.parent_blocks.is_empty() {
      GraphEvent::PathCreated {
        path_id: path.id,
        name: path.name.clone(),
        blocks: path.blocks.clone(),
      }
    } else {
      GraphEvent::SubpathCreated {
        path_id: path.id,
        name: path.name.clone(),
        parent_block_ids: path.parent_block_ids(),
        blocks: path.blocks.clone(),
      }
    };
    events.push(event);
  }

  for path in old {
    if !new_ids.contains(&path.id) {
      events.push(GraphEvent::PathRemoved { path_id: path.id });
    }
  }

  let created_ids: HashSet<PathId> = created.iter().map(|p| p.id).collect();
  let structural = edges_changed(old, new, &created_ids);

  GraphDiff { events, structural }
}

fn diff_blocks(old: &Path, new: &Path, events: &mut Vec<GraphEvent>) {
  let old_ids: HashSet<BlockId> = old.blocks.iter().map(|b| b.id).collect();
  let new_ids: HashSet<BlockId> = new.blocks.iter().map(|b| b.id).collect();

  let deleted = old.blocks.iter().any(|b| !new_ids.contains(&b.id));
  let added = new.blocks.iter().any(|b| !old_ids.contains(&b.id));

  let old_order: Vec<BlockId> = old
    .blocks
    .iter()
    .map(|b| b.id)
    .filter(|id| new_ids.contains(id))
    .collect();
  let new_order: Vec<BlockId> = new
    .blocks
    .iter()
    .map(|b| b.id)
    .filter(|id| old_ids.contains(id))
    .collect();
  let reordered = old_order != new_order;

  let updated = new.blocks.iter().any(|b| {
    old
      .block(b.id)
      .is_some_and(|previous| previous.display_differs(b))
  });

  let blocks = || new.blocks.clone();
  if deleted {
    events.push(GraphEvent::BlockDeleted {
      path_id: new.id,
      blocks: blocks(),
    });
  }
  if added {
    events.push(GraphEvent::BlockAdded {
      path_id: new.id,
      blocks: blocks(),
    });
  }
  if reordered {
    events.push(GraphEvent::BlockReordered {
      path_id: new.id,
      blocks: blocks(),
    });
  }
  if updated {
    events.push(GraphEvent::BlockUpdated {
      path_id: new.id,
      blocks: blocks(),
    });
  }
}

fn edge_set(paths: &[Path]) -> HashSet<(BlockId, PathId)> {
  paths
    .iter()
    .flat_map(|p| p.parent_blocks.iter().map(move |e| (e.block_id, p.id)))
    .collect()
}

fn edges_changed(old: &[Path], new: &[Path], created: &HashSet<PathId>) -> bool {
  let before = edge_set(old);
  let after = edge_set(new);

  before.difference(&after).next().is_some()
    || after
      .difference(&before)
      .any(|(_, path_id)| !created.contains(path_id))
}
