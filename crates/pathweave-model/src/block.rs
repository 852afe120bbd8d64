use serde::{Deserialize, Serialize};

use crate::ids::{BlockId, PathId, WorkflowId};
use crate::path::PathParentBlock;

/// The kind of a block.
///
/// `BEGIN` opens every path. `STEP` and `DELAY` carry content. The remaining
/// variants are end-type markers that may only close a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BlockType {
  Begin,
  Step,
  Delay,
  /// Split point: the path forks into the block's child paths.
  Path,
  /// Merge point: the path is one of several feeding a merge path.
  Merge,
  End,
  Last,
}

impl BlockType {
  /// Whether this is a terminal/branching marker (`END`, `LAST`, `MERGE`, `PATH`).
  pub fn is_end_type(self) -> bool {
    matches!(
      self,
      BlockType::End | BlockType::Last | BlockType::Merge | BlockType::Path
    )
  }

  /// Whether this is a content block (`STEP` or `DELAY`).
  pub fn is_content(self) -> bool {
    matches!(self, BlockType::Step | BlockType::Delay)
  }

  /// Whether a block of this type may have child paths.
  pub fn may_branch(self) -> bool {
    matches!(self, BlockType::Path | BlockType::Merge)
  }
}

/// Payload of a `DELAY` block.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DelayConfig {
  /// Fixed wait, in seconds.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub duration_secs: Option<u64>,
  /// Wait until the named event is observed.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub event_name: Option<String>,
}

/// A single node inside a path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
  pub id: BlockId,
  pub path_id: PathId,
  pub workflow_id: WorkflowId,
  pub position: u32,
  #[serde(rename = "type")]
  pub block_type: BlockType,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub title: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub description: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub icon: Option<String>,
  /// Reference to an attached image or video.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub media: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub delay: Option<DelayConfig>,
  /// Edges to the paths that begin after this block.
  #[serde(default)]
  pub child_paths: Vec<PathParentBlock>,
}

impl Block {
  /// Create a block with no payload.
  pub fn new(
    id: BlockId,
    path_id: PathId,
    workflow_id: WorkflowId,
    position: u32,
    block_type: BlockType,
  ) -> Self {
    Self {
      id,
      path_id,
      workflow_id,
      position,
      block_type,
      title: None,
      description: None,
      icon: None,
      media: None,
      delay: None,
      child_paths: Vec::new(),
    }
  }

  /// Set the title (builder style).
  pub fn with_title(mut self, title: impl Into<String>) -> Self {
    self.title = Some(title.into());
    self
  }

  pub fn is_end_type(&self) -> bool {
    self.block_type.is_end_type()
  }

  /// Ids of the paths that begin after this block.
  pub fn child_path_ids(&self) -> impl Iterator<Item = PathId> + '_ {
    self.child_paths.iter().map(|edge| edge.path_id)
  }

  /// Whether the display fields shown in navigation differ from `other`.
  pub fn display_differs(&self, other: &Block) -> bool {
    self.block_type != other.block_type
      || self.position != other.position
      || self.title != other.title
      || self.description != other.description
      || self.icon != other.icon
  }
}
