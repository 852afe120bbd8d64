use serde::{Deserialize, Serialize};

/// What happens to selection state when a commit fails in transport.
///
/// Validation failures never touch selection, and a successful commit
/// always clears it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionPolicy {
  /// Keep the selection so the gesture can be retried.
  #[default]
  PreserveOnFailure,
  /// Clear the selection after every commit attempt.
  ResetAlways,
}

/// Settings of a [`WorkflowEditor`](crate::WorkflowEditor).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
  pub selection_policy: SelectionPolicy,
  /// Branch names used when a split does not name its branches.
  pub default_branch_names: Vec<String>,
  /// Name given to new merge paths.
  pub merge_path_name: String,
}

impl Default for EditorConfig {
  fn default() -> Self {
    Self {
      selection_policy: SelectionPolicy::default(),
      default_branch_names: vec!["If".to_string(), "Else".to_string()],
      merge_path_name: "Merge".to_string(),
    }
  }
}
