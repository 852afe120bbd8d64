use crate::tree::{BlockEntry, NodeId, TreeProjection};
use crate::view::{BlockView, TreeView};

impl TreeProjection {
  /// Render the tree pruned to blocks matching `term`, or leading to a match.
  ///
  /// Matching is a case-insensitive substring test over block title and
  /// description. An empty term renders the full tree. Returns `None` when
  /// nothing matches.
  pub fn filter(&self, term: &str) -> Option<TreeView> {
    let needle = term.trim().to_lowercase();
    if needle.is_empty() {
      return self.view();
    }
    self.root.and_then(|root| self.filter_node(root, &needle))
  }

  /// Whether the path, or any path beneath it, holds a matching block.
  pub fn path_matches(&self, node_id: NodeId, term: &str) -> bool {
    let needle = term.trim().to_lowercase();
    needle.is_empty() || self.filter_node(node_id, &needle).is_some()
  }

  fn filter_node(&self, node_id: NodeId, needle: &str) -> Option<TreeView> {
    let node = self.node(node_id)?;
    let blocks: Vec<BlockView> = node
      .blocks
      .iter()
      .filter_map(|entry| {
        let subpaths: Vec<TreeView> = entry
          .subpaths
          .iter()
          .filter_map(|&child| self.filter_node(child, needle))
          .collect();
        (block_matches(entry, needle) || !subpaths.is_empty())
          .then(|| BlockView::from_entry(entry, subpaths))
      })
      .collect();

    if blocks.is_empty() {
      return None;
    }
    Some(TreeView {
      path_id: node.path_id,
      name: node.name.clone(),
      blocks,
    })
  }
}

fn block_matches(entry: &BlockEntry, needle: &str) -> bool {
  let contains = |field: &Option<String>| {
    field
      .as_deref()
      .is_some_and(|text| text.to_lowercase().contains(needle))
  };
  contains(&entry.title) || contains(&entry.description)
}
