use std::collections::HashMap;

use crate::block::BlockType;
use crate::error::ModelError;
use crate::graph::WorkflowGraph;
use crate::ids::{BlockId, PathId};
use crate::path::Path;

/// Check the structural invariants of a path set.
///
/// Returns every violation found, in path order. An empty vector means the
/// set is consistent:
/// - each path opens with exactly one `BEGIN` at position 0
/// - each path closes with an end-type block and holds only content blocks in between
/// - positions are contiguous from 0 in storage order
/// - only `PATH` and `MERGE` blocks have child paths
/// - each block belongs to exactly one path
/// - every edge is recorded on both ends, and merge paths hang from `MERGE` blocks
/// - no path is reachable from itself
pub fn validate(paths: &[Path]) -> Vec<ModelError> {
  let mut errors = Vec::new();
  let mut owners: HashMap<BlockId, PathId> = HashMap::new();

  for path in paths {
    check_path_shape(path, &mut errors);

    for block in &path.blocks {
      if let Some(first) = owners.insert(block.id, path.id) {
        errors.push(ModelError::SharedBlock {
          block_id: block.id,
          first,
          second: path.id,
        });
      }
    }
  }

  check_edges(paths, &mut errors);
  errors
}

fn check_path_shape(path: &Path, errors: &mut Vec<ModelError>) {
  let Some(last_index) = path.blocks.len().checked_sub(1) else {
    errors.push(ModelError::EmptyPath { path_id: path.id });
    return;
  };

  for (index, block) in path.blocks.iter().enumerate() {
    if block.position != index as u32 {
      errors.push(ModelError::PositionGap {
        path_id: path.id,
        expected: index as u32,
        found: block.position,
      });
    }

    if block.path_id != path.id {
      errors.push(ModelError::WrongOwner {
        block_id: block.id,
        claimed: block.path_id,
        actual: path.id,
      });
    }

    if !block.child_paths.is_empty() && !block.block_type.may_branch() {
      errors.push(ModelError::UnexpectedChildPaths {
        block_id: block.id,
        block_type: block.block_type,
      });
    }

    if index == 0 {
      if block.block_type != BlockType::Begin {
        errors.push(ModelError::MissingBegin { path_id: path.id });
      }
    } else if block.block_type == BlockType::Begin {
      errors.push(ModelError::DuplicateBegin { path_id: path.id });
    } else if index == last_index {
      if !block.is_end_type() {
        errors.push(ModelError::InvalidTerminal {
          path_id: path.id,
          block_type: block.block_type,
        });
      }
    } else if !block.block_type.is_content() {
      errors.push(ModelError::MisplacedBlock {
        path_id: path.id,
        block_id: block.id,
        block_type: block.block_type,
      });
    }
  }

  // A lone BEGIN has nothing closing the path.
  if last_index == 0 {
    errors.push(ModelError::InvalidTerminal {
      path_id: path.id,
      block_type: path.blocks[0].block_type,
    });
  }
}

fn check_edges(paths: &[Path], errors: &mut Vec<ModelError>) {
  let graph = WorkflowGraph::new(paths);

  for path in paths {
    for edge in &path.parent_blocks {
      let Some(block) = graph.block(edge.block_id) else {
        errors.push(ModelError::DanglingEdge {
          block_id: edge.block_id,
          path_id: path.id,
        });
        continue;
      };

      if !block.child_path_ids().any(|id| id == path.id) {
        errors.push(ModelError::AsymmetricEdge {
          block_id: block.id,
          path_id: path.id,
        });
      }

      if path.is_merge() && block.block_type != BlockType::Merge {
        errors.push(ModelError::MergeParentNotMerge {
          path_id: path.id,
          block_id: block.id,
          block_type: block.block_type,
        });
      }
    }

    for block in &path.blocks {
      for edge in &block.child_paths {
        let recorded = graph
          .path(edge.path_id)
          .is_some_and(|child| child.parent_blocks.iter().any(|e| e.block_id == block.id));
        if !recorded {
          errors.push(ModelError::AsymmetricEdge {
            block_id: block.id,
            path_id: edge.path_id,
          });
        }
      }
    }
  }

  for path in paths {
    if graph.descendants(path.id).contains(&path.id) {
      errors.push(ModelError::Cycle { path_id: path.id });
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::block::Block;
  use crate::ids::WorkflowId;
  use crate::path::PathParentBlock;

  fn block(id: i64, path: i64, position: u32, block_type: BlockType) -> Block {
    Block::new(BlockId(id), PathId(path), WorkflowId(1), position, block_type)
  }

  fn split_workflow() -> Vec<Path> {
    let mut split = block(3, 1, 2, BlockType::Path);
    split.child_paths = vec![
      PathParentBlock::new(PathId(2), BlockId(3)),
      PathParentBlock::new(PathId(3), BlockId(3)),
    ];

    vec![
      Path {
        id: PathId(1),
        name: "main".to_string(),
        workflow_id: WorkflowId(1),
        blocks: vec![
          block(1, 1, 0, BlockType::Begin),
          block(2, 1, 1, BlockType::Step),
          split,
        ],
        parent_blocks: vec![],
      },
      Path {
        id: PathId(2),
        name: "If".to_string(),
        workflow_id: WorkflowId(1),
        blocks: vec![block(10, 2, 0, BlockType::Begin), block(11, 2, 1, BlockType::End)],
        parent_blocks: vec![PathParentBlock::new(PathId(2), BlockId(3))],
      },
      Path {
        id: PathId(3),
        name: "Else".to_string(),
        workflow_id: WorkflowId(1),
        blocks: vec![block(20, 3, 0, BlockType::Begin), block(21, 3, 1, BlockType::End)],
        parent_blocks: vec![PathParentBlock::new(PathId(3), BlockId(3))],
      },
    ]
  }

  #[test]
  fn test_valid_workflow_has_no_errors() {
    assert_eq!(validate(&split_workflow()), vec![]);
  }

  #[test]
  fn test_position_gap_detected() {
    let mut paths = split_workflow();
    paths[0].blocks[2].position = 5;

    let errors = validate(&paths);
    assert!(errors.contains(&ModelError::PositionGap {
      path_id: PathId(1),
      expected: 2,
      found: 5,
    }));
  }

  #[test]
  fn test_missing_begin_and_bad_terminal() {
    let mut paths = split_workflow();
    paths[1].blocks[0].block_type = BlockType::Step;
    paths[2].blocks[1].block_type = BlockType::Step;

    let errors = validate(&paths);
    assert!(errors.contains(&ModelError::MissingBegin { path_id: PathId(2) }));
    assert!(errors.contains(&ModelError::InvalidTerminal {
      path_id: PathId(3),
      block_type: BlockType::Step,
    }));
  }

  #[test]
  fn test_lone_begin_is_not_closed() {
    let paths = vec![Path {
      id: PathId(9),
      name: "stub".to_string(),
      workflow_id: WorkflowId(1),
      blocks: vec![block(90, 9, 0, BlockType::Begin)],
      parent_blocks: vec![],
    }];

    assert_eq!(
      validate(&paths),
      vec![ModelError::InvalidTerminal {
        path_id: PathId(9),
        block_type: BlockType::Begin,
      }]
    );
  }

  #[test]
  fn test_child_paths_on_content_block() {
    let mut paths = split_workflow();
    paths[0].blocks[1]
      .child_paths
      .push(PathParentBlock::new(PathId(2), BlockId(2)));

    let errors = validate(&paths);
    assert!(errors.contains(&ModelError::UnexpectedChildPaths {
      block_id: BlockId(2),
      block_type: BlockType::Step,
    }));
  }

  #[test]
  fn test_asymmetric_edge_detected() {
    let mut paths = split_workflow();
    paths[2].parent_blocks.clear();

    let errors = validate(&paths);
    assert!(errors.contains(&ModelError::AsymmetricEdge {
      block_id: BlockId(3),
      path_id: PathId(3),
    }));
  }

  #[test]
  fn test_shared_block_detected() {
    let mut paths = split_workflow();
    let stolen = paths[1].blocks[1].clone();
    paths[2].blocks.insert(1, stolen);
    paths[2].blocks[2].position = 2;

    let errors = validate(&paths);
    assert!(errors.iter().any(|e| matches!(
      e,
      ModelError::SharedBlock { block_id, .. } if *block_id == BlockId(11)
    )));
  }

  #[test]
  fn test_merge_parent_must_be_merge_block() {
    let mut paths = split_workflow();
    paths[1].blocks[1].child_paths = vec![PathParentBlock::new(PathId(4), BlockId(11))];
    paths[2].blocks[1].child_paths = vec![PathParentBlock::new(PathId(4), BlockId(21))];
    paths[2].blocks[1].block_type = BlockType::Merge;
    paths.push(Path {
      id: PathId(4),
      name: "Merge".to_string(),
      workflow_id: WorkflowId(1),
      blocks: vec![block(40, 4, 0, BlockType::Begin), block(41, 4, 1, BlockType::End)],
      parent_blocks: vec![
        PathParentBlock::new(PathId(4), BlockId(11)),
        PathParentBlock::new(PathId(4), BlockId(21)),
      ],
    });

    let errors = validate(&paths);
    assert!(errors.contains(&ModelError::MergeParentNotMerge {
      path_id: PathId(4),
      block_id: BlockId(11),
      block_type: BlockType::End,
    }));
    // END with children is also flagged
    assert!(errors.contains(&ModelError::UnexpectedChildPaths {
      block_id: BlockId(11),
      block_type: BlockType::End,
    }));
  }

  #[test]
  fn test_merge_fed_from_its_own_end_is_a_cycle() {
    let mut paths = split_workflow();
    paths[1].blocks[1].block_type = BlockType::Merge;
    paths[2].blocks[1].block_type = BlockType::Merge;
    paths[1].blocks[1].child_paths = vec![PathParentBlock::new(PathId(4), BlockId(11))];
    paths[2].blocks[1].child_paths = vec![PathParentBlock::new(PathId(4), BlockId(21))];

    let mut merge_end = block(41, 4, 1, BlockType::Merge);
    merge_end.child_paths = vec![PathParentBlock::new(PathId(4), BlockId(41))];
    paths.push(Path {
      id: PathId(4),
      name: "Merge".to_string(),
      workflow_id: WorkflowId(1),
      blocks: vec![block(40, 4, 0, BlockType::Begin), merge_end],
      parent_blocks: vec![
        PathParentBlock::new(PathId(4), BlockId(11)),
        PathParentBlock::new(PathId(4), BlockId(21)),
        PathParentBlock::new(PathId(4), BlockId(41)),
      ],
    });

    assert_eq!(validate(&paths), vec![ModelError::Cycle { path_id: PathId(4) }]);
  }
}
