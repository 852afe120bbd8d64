//! Request and response bodies of the workflow store service.

use serde::{Deserialize, Serialize};

use pathweave_model::{BlockId, BlockType, Path, PathId, WorkflowId};

/// Response of `GET /paths?workflow_id=W`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathsResponse {
  pub paths: Vec<Path>,
}

/// Body of `POST /paths/minimal`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateMinimalPath {
  pub name: String,
  pub workflow_id: WorkflowId,
}

/// Body of `POST /blocks/move`.
///
/// Blocks are inserted, in list order, before the destination's terminal block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveBlocks {
  pub block_ids: Vec<BlockId>,
  pub destination_path_id: PathId,
}

/// Body of `POST /paths/connect`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectPaths {
  pub child_path_ids: Vec<PathId>,
  pub destination_path_id: PathId,
  /// Block whose edges to the child paths are removed first.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub source_block_id: Option<BlockId>,
}

/// Body of `POST /paths/merge`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateMergePath {
  pub name: String,
  pub workflow_id: WorkflowId,
  pub parent_blocks: Vec<BlockId>,
}

/// Body of `PATCH /paths/merge/:merge_path_id`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UpdateMerge {
  pub parents_to_connect: Vec<BlockId>,
  pub parents_to_disconnect: Vec<BlockId>,
}

/// Body of `PATCH /blocks/:block_id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateBlockType {
  #[serde(rename = "type")]
  pub block_type: BlockType,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_connect_paths_omits_absent_source() {
    let body = ConnectPaths {
      child_path_ids: vec![PathId(4), PathId(5)],
      destination_path_id: PathId(1),
      source_block_id: None,
    };
    let value = serde_json::to_value(&body).unwrap();
    assert_eq!(
      value,
      serde_json::json!({ "child_path_ids": [4, 5], "destination_path_id": 1 })
    );
  }

  #[test]
  fn test_update_block_type_uses_type_key() {
    let body = UpdateBlockType {
      block_type: BlockType::Path,
    };
    assert_eq!(
      serde_json::to_value(body).unwrap(),
      serde_json::json!({ "type": "PATH" })
    );
  }
}
