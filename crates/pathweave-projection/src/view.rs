use std::fmt;

use pathweave_model::{BlockId, BlockType, PathId};
use serde::Serialize;

use crate::tree::{BlockEntry, NodeId, TreeProjection};

/// Owned, nested rendering of the navigation tree.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TreeView {
  pub path_id: PathId,
  pub name: String,
  pub blocks: Vec<BlockView>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BlockView {
  pub id: BlockId,
  #[serde(rename = "type")]
  pub block_type: BlockType,
  pub position: u32,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub icon: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub title: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub description: Option<String>,
  #[serde(skip_serializing_if = "Vec::is_empty")]
  pub subpaths: Vec<TreeView>,
}

impl BlockView {
  pub(crate) fn from_entry(entry: &BlockEntry, subpaths: Vec<TreeView>) -> Self {
    Self {
      id: entry.id,
      block_type: entry.block_type,
      position: entry.position,
      icon: entry.icon.clone(),
      title: entry.title.clone(),
      description: entry.description.clone(),
      subpaths,
    }
  }
}

impl TreeProjection {
  /// Render the whole tree from the root.
  pub fn view(&self) -> Option<TreeView> {
    self.root.and_then(|root| self.view_node(root))
  }

  pub(crate) fn view_node(&self, node_id: NodeId) -> Option<TreeView> {
    let node = self.node(node_id)?;
    let blocks = node
      .blocks
      .iter()
      .map(|entry| {
        let subpaths = entry
          .subpaths
          .iter()
          .filter_map(|&child| self.view_node(child))
          .collect();
        BlockView::from_entry(entry, subpaths)
      })
      .collect();

    Some(TreeView {
      path_id: node.path_id,
      name: node.name.clone(),
      blocks,
    })
  }
}

impl TreeView {
  fn write_indented(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
    let pad = "  ".repeat(depth);
    writeln!(f, "{pad}{} (path {})", self.name, self.path_id)?;
    for block in &self.blocks {
      write!(f, "{pad}  [{}] {:?} #{}", block.position, block.block_type, block.id)?;
      if let Some(title) = &block.title {
        write!(f, " {title}")?;
      }
      writeln!(f)?;
      for subpath in &block.subpaths {
        subpath.write_indented(f, depth + 2)?;
      }
    }
    Ok(())
  }
}

impl fmt::Display for TreeView {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    self.write_indented(f, 0)
  }
}
