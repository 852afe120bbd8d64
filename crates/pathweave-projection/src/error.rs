use pathweave_model::{BlockId, PathId};

/// Reasons an event could not be applied to the projection.
///
/// A failed event leaves the projection untouched.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProjectionError {
  /// The event targets a path the projection does not hold.
  #[error("path {path_id} is not in the projection")]
  PathNotFound { path_id: PathId },

  /// A new subpath hangs from a block the projection does not hold.
  #[error("block {block_id} is not in the projection")]
  BlockNotFound { block_id: BlockId },

  /// The path is already in the projection.
  #[error("path {path_id} is already in the projection")]
  DuplicatePath { path_id: PathId },

  /// A parentless path arrived while a root is already present.
  #[error("path {path_id} has no parent block and the projection already has a root")]
  DetachedPath { path_id: PathId },
}
