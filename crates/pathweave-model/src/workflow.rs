use serde::{Deserialize, Serialize};

use crate::ids::WorkflowId;

/// Root container of a set of paths.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workflow {
  pub id: WorkflowId,
  pub title: String,
}
