use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! id_type {
  ($(#[$meta:meta])* $name:ident) => {
    $(#[$meta])*
    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct $name(pub i64);

    impl fmt::Display for $name {
      fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
      }
    }

    impl From<i64> for $name {
      fn from(value: i64) -> Self {
        Self(value)
      }
    }

    impl From<$name> for i64 {
      fn from(value: $name) -> Self {
        value.0
      }
    }
  };
}

id_type!(
  /// Identifier of a workflow.
  WorkflowId
);
id_type!(
  /// Identifier of a path.
  PathId
);
id_type!(
  /// Identifier of a block.
  BlockId
);
