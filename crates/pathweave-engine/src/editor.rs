//! Editing session over one workflow.
//!
//! The `WorkflowEditor` owns the cached path set, the selection state
//! machines and the navigation projection. Every gesture follows the same
//! pattern: run the engine against the store, and only on success replace
//! the cache wholesale with the store's answer, patch the projection and
//! publish the change events.

use pathweave_model::{
  BlockId, GraphEvent, Path, PathId, WorkflowGraph, WorkflowId, diff_paths, validate,
};
use pathweave_projection::{BlockLocation, TreeProjection, TreeView};
use pathweave_store::WorkflowStore;
use tracing::{debug, error, info, instrument, warn};

use crate::config::{EditorConfig, SelectionPolicy};
use crate::error::{EngineError, SelectionError, ValidationError};
use crate::events::{GraphNotifier, NoopNotifier};
use crate::merge::merge_paths;
use crate::merge_update::update_merge;
use crate::selection::{MergeUpdate, PathSelection};
use crate::split::{SplitRequest, create_parallel_paths};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Gesture {
  Split,
  Merge,
  MergeUpdate,
}

impl Gesture {
  fn name(self) -> &'static str {
    match self {
      Gesture::Split => "split",
      Gesture::Merge => "merge",
      Gesture::MergeUpdate => "merge_update",
    }
  }
}

/// Editing session for one workflow.
///
/// Generic over `N: GraphNotifier` to allow different ways of publishing
/// change events. Use [`WorkflowEditor::load`] to discard them.
pub struct WorkflowEditor<S: WorkflowStore, N: GraphNotifier = NoopNotifier> {
  store: S,
  notifier: N,
  config: EditorConfig,
  workflow_id: WorkflowId,
  paths: Vec<Path>,
  projection: TreeProjection,
  selection: PathSelection,
  merge_update: MergeUpdate,
}

impl<S: WorkflowStore> WorkflowEditor<S, NoopNotifier> {
  /// Fetch a workflow's paths and start a session that publishes nothing.
  pub async fn load(
    store: S,
    workflow_id: WorkflowId,
    config: EditorConfig,
  ) -> Result<Self, EngineError> {
    Self::load_with_notifier(store, workflow_id, config, NoopNotifier).await
  }
}

impl<S: WorkflowStore, N: GraphNotifier> WorkflowEditor<S, N> {
  /// Fetch a workflow's paths and start a session.
  ///
  /// The notifier first receives a `GraphReloaded` carrying the loaded paths.
  #[instrument(skip(store, config, notifier))]
  pub async fn load_with_notifier(
    store: S,
    workflow_id: WorkflowId,
    config: EditorConfig,
    notifier: N,
  ) -> Result<Self, EngineError> {
    let mut paths = store.fetch_paths(workflow_id).await?;
    normalize(&mut paths);
    report_violations(&paths);

    let projection = TreeProjection::from_paths(&paths);
    notifier.notify(GraphEvent::GraphReloaded {
      paths: paths.clone(),
    });
    info!(paths = paths.len(), "workflow loaded");

    Ok(Self {
      store,
      notifier,
      config,
      workflow_id,
      paths,
      projection,
      selection: PathSelection::new(),
      merge_update: MergeUpdate::new(),
    })
  }

  pub fn workflow_id(&self) -> WorkflowId {
    self.workflow_id
  }

  /// The cached authoritative paths.
  pub fn paths(&self) -> &[Path] {
    &self.paths
  }

  pub fn graph(&self) -> WorkflowGraph<'_> {
    WorkflowGraph::new(&self.paths)
  }

  pub fn projection(&self) -> &TreeProjection {
    &self.projection
  }

  pub fn selection(&self) -> &PathSelection {
    &self.selection
  }

  pub fn merge_update(&self) -> &MergeUpdate {
    &self.merge_update
  }

  pub fn config(&self) -> &EditorConfig {
    &self.config
  }

  pub fn store(&self) -> &S {
    &self.store
  }

  /// The projected navigation tree.
  pub fn tree(&self) -> Option<TreeView> {
    self.projection.view()
  }

  /// The projected tree pruned to blocks matching `term`.
  pub fn search(&self, term: &str) -> Option<TreeView> {
    self.projection.filter(term)
  }

  pub fn locate_block(&self, block_id: BlockId) -> Option<BlockLocation> {
    self.projection.locate_block(block_id)
  }

  /// Fetch the paths again and replace the cache.
  pub async fn refresh(&mut self) -> Result<(), EngineError> {
    let paths = self.store.fetch_paths(self.workflow_id).await?;
    self.replace_paths(paths);
    Ok(())
  }

  /// Whether `path_id` may be toggled into the current merge selection.
  pub fn can_select(&self, path_id: PathId) -> bool {
    let Some(parent) = self.graph().split_point(path_id) else {
      return false;
    };
    self
      .selection
      .parent_block_id()
      .is_none_or(|adopted| adopted == parent)
  }

  /// Toggle a branch in the merge selection.
  ///
  /// The branch's terminal block and split block are read from the cache.
  pub fn toggle_path(&mut self, path_id: PathId) -> Result<(), EngineError> {
    let graph = WorkflowGraph::new(&self.paths);
    let path = graph
      .path(path_id)
      .ok_or(ValidationError::UnknownPath { path_id })?;
    let parent_block_id = graph
      .split_point(path_id)
      .ok_or(SelectionError::NotABranch { path_id })?;
    let end_block_id = path
      .terminal_block()
      .map(|b| b.id)
      .ok_or(SelectionError::NoEndBlock { path_id })?;

    self
      .selection
      .toggle(path_id, end_block_id, parent_block_id)?;
    debug!(%path_id, selected = self.selection.len(), "toggled path");
    Ok(())
  }

  /// Toggle the branch that `block_id` closes.
  pub fn toggle_end_block(&mut self, block_id: BlockId) -> Result<(), EngineError> {
    let graph = WorkflowGraph::new(&self.paths);
    let owner = graph
      .owner(block_id)
      .ok_or(ValidationError::UnknownBlock { block_id })?;
    if owner.terminal_block().map(|b| b.id) != Some(block_id) {
      return Err(
        ValidationError::NotJoinable {
          block_id,
          reason: "not the terminal block of its path",
        }
        .into(),
      );
    }
    let path_id = owner.id;
    self.toggle_path(path_id)
  }

  pub fn reset_selection(&mut self) {
    self.selection.reset();
  }

  /// Whether enough branches are selected to merge.
  pub fn can_merge(&self) -> bool {
    self.selection.len() >= 2
  }

  /// Split a path at `position` with the configured branch names.
  pub async fn split_path(
    &mut self,
    parent_path_id: PathId,
    position: u32,
  ) -> Result<(), EngineError> {
    let request = SplitRequest::new(parent_path_id, position)
      .with_names(self.config.default_branch_names.iter().cloned());
    self.split(&request).await
  }

  /// Split a path into parallel branches.
  pub async fn split(&mut self, request: &SplitRequest) -> Result<(), EngineError> {
    let result = create_parallel_paths(&self.store, &self.paths, request).await;
    self.settle(result, Gesture::Split)
  }

  /// Merge the selected branches into a new merge path.
  pub async fn merge_selected(&mut self) -> Result<(), EngineError> {
    let result = merge_paths(
      &self.store,
      &self.paths,
      &self.selection,
      &self.config.merge_path_name,
    )
    .await;
    self.settle(result, Gesture::Merge)
  }

  /// Start editing the parent blocks of `merge_path_id`.
  pub fn activate_merge_update(
    &mut self,
    merge_path_id: PathId,
    trigger_path_id: PathId,
  ) -> Result<(), EngineError> {
    let path = self
      .paths
      .iter()
      .find(|p| p.id == merge_path_id)
      .ok_or(ValidationError::UnknownPath {
        path_id: merge_path_id,
      })?;
    if !path.is_merge() {
      return Err(
        ValidationError::NotAMergePath {
          path_id: merge_path_id,
        }
        .into(),
      );
    }

    let original = path.parent_block_ids();
    self
      .merge_update
      .activate(merge_path_id, original, trigger_path_id);
    debug!(%merge_path_id, %trigger_path_id, "merge update activated");
    Ok(())
  }

  /// Start a merge update of `merge_path_id` whose selection is `desired`.
  ///
  /// The session is triggered from the path owning the first desired block.
  /// Nothing is sent until [`commit_merge_update`](Self::commit_merge_update).
  pub fn stage_merge_update(
    &mut self,
    merge_path_id: PathId,
    desired: &[BlockId],
  ) -> Result<(), EngineError> {
    let trigger_path_id = match desired.first() {
      Some(&block_id) => self
        .graph()
        .owner(block_id)
        .map(|p| p.id)
        .ok_or(ValidationError::UnknownBlock { block_id })?,
      None => merge_path_id,
    };
    self.activate_merge_update(merge_path_id, trigger_path_id)?;

    let current = self
      .graph()
      .path(merge_path_id)
      .map(Path::parent_block_ids)
      .unwrap_or_default();
    for block_id in current {
      if !desired.contains(&block_id) && self.merge_update.is_selected(block_id) {
        self.merge_update.toggle(block_id)?;
      }
    }
    for &block_id in desired {
      if !self.merge_update.is_selected(block_id) {
        self.merge_update.toggle(block_id)?;
      }
    }
    Ok(())
  }

  pub fn toggle_merge_parent(&mut self, block_id: BlockId) -> Result<(), EngineError> {
    self.merge_update.toggle(block_id)?;
    Ok(())
  }

  pub fn cancel_merge_update(&mut self) {
    self.merge_update.reset();
  }

  /// Send the merge update delta to the store.
  pub async fn commit_merge_update(&mut self) -> Result<(), EngineError> {
    let result = update_merge(&self.store, &self.paths, &self.merge_update).await;
    self.settle(result, Gesture::MergeUpdate)
  }

  fn settle(
    &mut self,
    result: Result<Vec<Path>, EngineError>,
    gesture: Gesture,
  ) -> Result<(), EngineError> {
    match result {
      Ok(paths) => {
        self.replace_paths(paths);
        self.reset_for(gesture);
        Ok(())
      }
      Err(e) => {
        if e.is_transport() {
          error!(gesture = gesture.name(), error = %e, "store request failed");
          if self.config.selection_policy == SelectionPolicy::ResetAlways {
            self.reset_for(gesture);
          }
        } else {
          warn!(gesture = gesture.name(), error = %e, "gesture rejected");
        }
        Err(e)
      }
    }
  }

  fn reset_for(&mut self, gesture: Gesture) {
    match gesture {
      Gesture::Split => {}
      Gesture::Merge => self.selection.reset(),
      Gesture::MergeUpdate => self.merge_update.reset(),
    }
  }

  fn replace_paths(&mut self, mut paths: Vec<Path>) {
    normalize(&mut paths);
    report_violations(&paths);

    let mut events = diff_paths(&self.paths, &paths).into_events(&paths);
    debug!(events = events.len(), "graph changed");

    if events.iter().any(|event| self.projection.apply(event).is_err()) {
      // Resync everyone from the authoritative set.
      self.projection.rebuild(&paths);
      events = vec![GraphEvent::GraphReloaded {
        paths: paths.clone(),
      }];
    }

    self.paths = paths;
    for event in events {
      self.notifier.notify(event);
    }
  }
}

fn normalize(paths: &mut [Path]) {
  for path in paths {
    path.sort_blocks();
  }
}

fn report_violations(paths: &[Path]) {
  for violation in validate(paths) {
    warn!(error = %violation, "graph invariant violated");
  }
}
