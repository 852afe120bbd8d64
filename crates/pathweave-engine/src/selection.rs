//! Selection state machines for merge gestures.
//!
//! [`PathSelection`] collects sibling branches to merge. [`MergeUpdate`]
//! tracks changes to the parent blocks of an existing merge path, and
//! [`MergeDelta`] reduces those changes to the edges that actually move.

use indexmap::{IndexMap, IndexSet};
use pathweave_model::{BlockId, PathId};

use crate::error::SelectionError;

/// Branches selected for a new merge.
///
/// Every selected path hangs from the same split block. The first toggle
/// adopts that block; later toggles from other split points are refused.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum PathSelection {
  #[default]
  Idle,
  Selecting {
    /// path_id -> end block, in selection order.
    selected: IndexMap<PathId, BlockId>,
    parent_block_id: BlockId,
  },
}

impl PathSelection {
  pub fn new() -> Self {
    Self::Idle
  }

  /// Select `path_id` with its end block, or deselect it if already selected.
  pub fn toggle(
    &mut self,
    path_id: PathId,
    end_block_id: BlockId,
    parent_block_id: BlockId,
  ) -> Result<(), SelectionError> {
    match self {
      PathSelection::Idle => {
        let mut selected = IndexMap::new();
        selected.insert(path_id, end_block_id);
        *self = PathSelection::Selecting {
          selected,
          parent_block_id,
        };
      }
      PathSelection::Selecting {
        selected,
        parent_block_id: adopted,
      } => {
        if selected.shift_remove(&path_id).is_some() {
          if selected.is_empty() {
            *self = PathSelection::Idle;
          }
          return Ok(());
        }
        if *adopted != parent_block_id {
          return Err(SelectionError::ParentMismatch {
            path_id,
            expected: *adopted,
            found: parent_block_id,
          });
        }
        selected.insert(path_id, end_block_id);
      }
    }
    Ok(())
  }

  pub fn reset(&mut self) {
    *self = PathSelection::Idle;
  }

  pub fn is_idle(&self) -> bool {
    matches!(self, PathSelection::Idle)
  }

  pub fn contains(&self, path_id: PathId) -> bool {
    match self {
      PathSelection::Idle => false,
      PathSelection::Selecting { selected, .. } => selected.contains_key(&path_id),
    }
  }

  pub fn len(&self) -> usize {
    match self {
      PathSelection::Idle => 0,
      PathSelection::Selecting { selected, .. } => selected.len(),
    }
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  /// Selected paths, in selection order.
  pub fn selected_paths(&self) -> Vec<PathId> {
    match self {
      PathSelection::Idle => Vec::new(),
      PathSelection::Selecting { selected, .. } => selected.keys().copied().collect(),
    }
  }

  /// End blocks of the selected paths, in selection order.
  pub fn selected_end_blocks(&self) -> Vec<BlockId> {
    match self {
      PathSelection::Idle => Vec::new(),
      PathSelection::Selecting { selected, .. } => selected.values().copied().collect(),
    }
  }

  /// The split block all selected paths hang from.
  pub fn parent_block_id(&self) -> Option<BlockId> {
    match self {
      PathSelection::Idle => None,
      PathSelection::Selecting {
        parent_block_id, ..
      } => Some(*parent_block_id),
    }
  }
}

/// Editing session for the parent blocks of an existing merge path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum MergeUpdate {
  #[default]
  Inactive,
  Active {
    merge_path_id: PathId,
    /// Parent blocks when the session started. Never changed by toggles.
    original_end_blocks: Vec<BlockId>,
    selected_end_blocks: IndexSet<BlockId>,
    /// Path whose gesture opened the session.
    trigger_path_id: PathId,
  },
}

impl MergeUpdate {
  pub fn new() -> Self {
    Self::Inactive
  }

  /// Start editing `merge_path_id`, seeding the selection with its current parents.
  pub fn activate(
    &mut self,
    merge_path_id: PathId,
    original_end_blocks: Vec<BlockId>,
    trigger_path_id: PathId,
  ) {
    let mut original = Vec::with_capacity(original_end_blocks.len());
    for block_id in original_end_blocks {
      if !original.contains(&block_id) {
        original.push(block_id);
      }
    }
    let selected_end_blocks = original.iter().copied().collect();
    *self = MergeUpdate::Active {
      merge_path_id,
      original_end_blocks: original,
      selected_end_blocks,
      trigger_path_id,
    };
  }

  /// Add or remove `block_id` from the selected parents.
  pub fn toggle(&mut self, block_id: BlockId) -> Result<(), SelectionError> {
    match self {
      MergeUpdate::Inactive => Err(SelectionError::Inactive),
      MergeUpdate::Active {
        selected_end_blocks,
        ..
      } => {
        if !selected_end_blocks.shift_remove(&block_id) {
          selected_end_blocks.insert(block_id);
        }
        Ok(())
      }
    }
  }

  pub fn reset(&mut self) {
    *self = MergeUpdate::Inactive;
  }

  pub fn is_active(&self) -> bool {
    matches!(self, MergeUpdate::Active { .. })
  }

  pub fn merge_path_id(&self) -> Option<PathId> {
    match self {
      MergeUpdate::Inactive => None,
      MergeUpdate::Active { merge_path_id, .. } => Some(*merge_path_id),
    }
  }

  pub fn trigger_path_id(&self) -> Option<PathId> {
    match self {
      MergeUpdate::Inactive => None,
      MergeUpdate::Active {
        trigger_path_id, ..
      } => Some(*trigger_path_id),
    }
  }

  pub fn is_selected(&self, block_id: BlockId) -> bool {
    match self {
      MergeUpdate::Inactive => false,
      MergeUpdate::Active {
        selected_end_blocks,
        ..
      } => selected_end_blocks.contains(&block_id),
    }
  }

  /// Edges to connect and disconnect, or `None` when inactive.
  pub fn delta(&self) -> Option<MergeDelta> {
    match self {
      MergeUpdate::Inactive => None,
      MergeUpdate::Active {
        original_end_blocks,
        selected_end_blocks,
        ..
      } => Some(MergeDelta::compute(
        original_end_blocks,
        &selected_end_blocks.iter().copied().collect::<Vec<_>>(),
      )),
    }
  }

  /// Number of parent blocks the merge path would keep after the delta.
  pub fn remaining_parents(&self) -> usize {
    match self {
      MergeUpdate::Inactive => 0,
      MergeUpdate::Active {
        selected_end_blocks,
        ..
      } => selected_end_blocks.len(),
    }
  }
}

/// Set difference between an original and a desired parent set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeDelta {
  /// In `selected` order.
  pub to_connect: Vec<BlockId>,
  /// In `original` order.
  pub to_disconnect: Vec<BlockId>,
}

impl MergeDelta {
  pub fn compute(original: &[BlockId], selected: &[BlockId]) -> Self {
    let original_set: IndexSet<BlockId> = original.iter().copied().collect();
    let selected_set: IndexSet<BlockId> = selected.iter().copied().collect();

    Self {
      to_connect: selected_set
        .iter()
        .filter(|b| !original_set.contains(*b))
        .copied()
        .collect(),
      to_disconnect: original_set
        .iter()
        .filter(|b| !selected_set.contains(*b))
        .copied()
        .collect(),
    }
  }

  pub fn is_empty(&self) -> bool {
    self.to_connect.is_empty() && self.to_disconnect.is_empty()
  }
}
