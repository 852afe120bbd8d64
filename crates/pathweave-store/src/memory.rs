use std::collections::{BTreeMap, HashMap, HashSet};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::debug;

use pathweave_model::{
  Block, BlockId, BlockType, Path, PathId, PathParentBlock, Workflow, WorkflowId,
};

use crate::error::StoreError;
use crate::types::{
  ConnectPaths, CreateMergePath, CreateMinimalPath, MoveBlocks, UpdateBlockType, UpdateMerge,
};
use crate::WorkflowStore;

/// A workflow and its paths, as persisted by the CLI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
  pub workflow: Workflow,
  pub paths: Vec<Path>,
}

/// In-memory workflow store.
///
/// Applies the same rules as the remote service, so it is suitable for tests
/// and for editing snapshot files locally. Edges are kept in one list and
/// materialized onto both ends when paths are read.
#[derive(Debug, Default)]
pub struct InMemoryWorkflowStore {
  state: Mutex<State>,
}

#[derive(Debug, Default)]
struct State {
  workflows: BTreeMap<WorkflowId, Workflow>,
  /// Paths without edges; blocks sorted by position.
  paths: BTreeMap<PathId, Path>,
  edges: Vec<PathParentBlock>,
  /// Type a block had before it first fed a merge path.
  joined_from: HashMap<BlockId, BlockType>,
  next_id: i64,
  requests: usize,
  failures_pending: usize,
}

impl InMemoryWorkflowStore {
  pub fn new() -> Self {
    Self::default()
  }

  /// Create a store holding one snapshot.
  pub fn from_snapshot(snapshot: Snapshot) -> Self {
    let mut state = State::default();
    let mut max_id = snapshot.workflow.id.0;

    for mut path in snapshot.paths {
      max_id = max_id.max(path.id.0);
      state.edges.append(&mut path.parent_blocks);
      for block in &mut path.blocks {
        max_id = max_id.max(block.id.0);
        block.child_paths.clear();
      }
      path.sort_blocks();
      state.paths.insert(path.id, path);
    }

    state.next_id = max_id + 1;
    state
      .workflows
      .insert(snapshot.workflow.id, snapshot.workflow);

    Self {
      state: Mutex::new(state),
    }
  }

  /// Create a workflow with its root path (`BEGIN`, `LAST`).
  pub async fn create_workflow(&self, title: impl Into<String>) -> (Workflow, Path) {
    let mut state = self.state.lock().await;
    let workflow = Workflow {
      id: WorkflowId(state.allocate()),
      title: title.into(),
    };
    state.workflows.insert(workflow.id, workflow.clone());
    let root_id = state.insert_path("Main", workflow.id, BlockType::Last);
    let root = state.materialize(root_id);
    (workflow, root)
  }

  /// Insert a content block just before the terminal block of a path.
  ///
  /// Ordinary authoring is not part of the store contract; this exists to
  /// seed graphs locally.
  pub async fn append_block(
    &self,
    path_id: PathId,
    block_type: BlockType,
    title: impl Into<String>,
  ) -> Result<Block, StoreError> {
    if !block_type.is_content() {
      return Err(StoreError::rejected(format!(
        "only content blocks can be appended, got {block_type:?}"
      )));
    }

    let mut state = self.state.lock().await;
    state.terminal_of(path_id)?;
    let block_id = BlockId(state.allocate());
    let path = state
      .paths
      .get_mut(&path_id)
      .ok_or_else(|| StoreError::not_found("path", path_id))?;

    let insert_at = path.blocks.len() - 1;
    let block = Block::new(block_id, path_id, path.workflow_id, 0, block_type).with_title(title);
    path.blocks.insert(insert_at, block);
    renumber(&mut path.blocks);

    debug!(%path_id, %block_id, "appended block");
    Ok(path.blocks[insert_at].clone())
  }

  /// Export a workflow and its paths.
  pub async fn snapshot(&self, workflow_id: WorkflowId) -> Result<Snapshot, StoreError> {
    let state = self.state.lock().await;
    let workflow = state
      .workflows
      .get(&workflow_id)
      .cloned()
      .ok_or_else(|| StoreError::not_found("workflow", workflow_id))?;
    Ok(Snapshot {
      workflow,
      paths: state.workflow_paths(workflow_id),
    })
  }

  /// Number of requests received through [`WorkflowStore`].
  pub async fn request_count(&self) -> usize {
    self.state.lock().await.requests
  }

  /// Make the next `count` requests fail with [`StoreError::Unavailable`].
  pub async fn fail_next_requests(&self, count: usize) {
    self.state.lock().await.failures_pending = count;
  }
}

impl State {
  fn allocate(&mut self) -> i64 {
    self.next_id = self.next_id.max(1);
    let id = self.next_id;
    self.next_id += 1;
    id
  }

  fn begin_request(&mut self) -> Result<(), StoreError> {
    self.requests += 1;
    if self.failures_pending > 0 {
      self.failures_pending -= 1;
      return Err(StoreError::Unavailable {
        message: "injected failure".to_string(),
      });
    }
    Ok(())
  }

  fn insert_path(&mut self, name: &str, workflow_id: WorkflowId, terminal: BlockType) -> PathId {
    let path_id = PathId(self.allocate());
    let begin = Block::new(BlockId(self.allocate()), path_id, workflow_id, 0, BlockType::Begin);
    let end = Block::new(BlockId(self.allocate()), path_id, workflow_id, 1, terminal);
    self.paths.insert(
      path_id,
      Path {
        id: path_id,
        name: name.to_string(),
        workflow_id,
        blocks: vec![begin, end],
        parent_blocks: vec![],
      },
    );
    path_id
  }

  fn materialize(&self, path_id: PathId) -> Path {
    let mut path = self.paths[&path_id].clone();
    path.parent_blocks = self
      .edges
      .iter()
      .filter(|e| e.path_id == path_id)
      .cloned()
      .collect();
    for block in &mut path.blocks {
      block.child_paths = self.children_of(block.id);
    }
    path
  }

  fn children_of(&self, block_id: BlockId) -> Vec<PathParentBlock> {
    self
      .edges
      .iter()
      .filter(|e| e.block_id == block_id)
      .cloned()
      .collect()
  }

  fn workflow_paths(&self, workflow_id: WorkflowId) -> Vec<Path> {
    self
      .paths
      .values()
      .filter(|p| p.workflow_id == workflow_id)
      .map(|p| self.materialize(p.id))
      .collect()
  }

  fn require_workflow(&self, workflow_id: WorkflowId) -> Result<(), StoreError> {
    if self.workflows.contains_key(&workflow_id) {
      Ok(())
    } else {
      Err(StoreError::not_found("workflow", workflow_id))
    }
  }

  fn require_path(&self, path_id: PathId) -> Result<&Path, StoreError> {
    self
      .paths
      .get(&path_id)
      .ok_or_else(|| StoreError::not_found("path", path_id))
  }

  fn locate(&self, block_id: BlockId) -> Result<(PathId, usize), StoreError> {
    self
      .paths
      .values()
      .find_map(|p| {
        p.blocks
          .iter()
          .position(|b| b.id == block_id)
          .map(|i| (p.id, i))
      })
      .ok_or_else(|| StoreError::not_found("block", block_id))
  }

  fn block_mut(&mut self, block_id: BlockId) -> Result<&mut Block, StoreError> {
    let (path_id, index) = self.locate(block_id)?;
    self
      .paths
      .get_mut(&path_id)
      .and_then(|p| p.blocks.get_mut(index))
      .ok_or_else(|| StoreError::not_found("block", block_id))
  }

  /// The terminal block of a path, which must be end-type.
  fn terminal_of(&self, path_id: PathId) -> Result<BlockId, StoreError> {
    let path = self.require_path(path_id)?;
    match path.blocks.last() {
      Some(block) if block.is_end_type() => Ok(block.id),
      _ => Err(StoreError::rejected(format!(
        "path {path_id} has no terminal block"
      ))),
    }
  }

  /// A block may feed a merge if it is end-type, branches nowhere else and
  /// does not lie in or below the merge path.
  fn require_joinable(
    &self,
    block_id: BlockId,
    merge_path_id: Option<PathId>,
  ) -> Result<(), StoreError> {
    let (owner, index) = self.locate(block_id)?;
    if !self.paths[&owner].blocks[index].is_end_type() {
      return Err(StoreError::rejected(format!(
        "block {block_id} is not an end-type block"
      )));
    }
    if let Some(merge_path_id) = merge_path_id
      && (owner == merge_path_id || self.descendants(merge_path_id).contains(&owner))
    {
      return Err(StoreError::rejected(format!(
        "block {block_id} lies downstream of merge path {merge_path_id}"
      )));
    }
    if self
      .edges
      .iter()
      .any(|e| e.block_id == block_id && Some(e.path_id) != merge_path_id)
    {
      return Err(StoreError::rejected(format!(
        "block {block_id} already has child paths"
      )));
    }
    Ok(())
  }

  /// Paths reachable from `path_id` through one or more edges.
  fn descendants(&self, path_id: PathId) -> HashSet<PathId> {
    let mut seen = HashSet::new();
    let mut stack = vec![path_id];
    while let Some(current) = stack.pop() {
      let Some(path) = self.paths.get(&current) else {
        continue;
      };
      for block in &path.blocks {
        for edge in self.edges.iter().filter(|e| e.block_id == block.id) {
          if seen.insert(edge.path_id) {
            stack.push(edge.path_id);
          }
        }
      }
    }
    seen
  }

  /// Turn `block_id` into a `MERGE` block, remembering what it was.
  fn mark_merge(&mut self, block_id: BlockId) -> Result<(), StoreError> {
    let block = self.block_mut(block_id)?;
    let previous = block.block_type;
    block.block_type = BlockType::Merge;
    if previous != BlockType::Merge {
      self.joined_from.insert(block_id, previous);
    }
    Ok(())
  }

  /// Give a block that no longer feeds anything back its former type.
  fn unmark_merge(&mut self, block_id: BlockId) -> Result<(), StoreError> {
    let restored = self
      .joined_from
      .remove(&block_id)
      .unwrap_or(BlockType::End);
    self.block_mut(block_id)?.block_type = restored;
    Ok(())
  }

  fn has_edge(&self, block_id: BlockId, path_id: PathId) -> bool {
    self
      .edges
      .iter()
      .any(|e| e.block_id == block_id && e.path_id == path_id)
  }

  fn add_edge(&mut self, block_id: BlockId, path_id: PathId) {
    if !self.has_edge(block_id, path_id) {
      self.edges.push(PathParentBlock::new(path_id, block_id));
    }
  }

  fn remove_edge(&mut self, block_id: BlockId, path_id: PathId) {
    self
      .edges
      .retain(|e| !(e.block_id == block_id && e.path_id == path_id));
  }
}

fn renumber(blocks: &mut [Block]) {
  for (index, block) in blocks.iter_mut().enumerate() {
    block.position = index as u32;
  }
}

#[async_trait]
impl WorkflowStore for InMemoryWorkflowStore {
  async fn fetch_paths(&self, workflow_id: WorkflowId) -> Result<Vec<Path>, StoreError> {
    let mut state = self.state.lock().await;
    state.begin_request()?;
    state.require_workflow(workflow_id)?;
    Ok(state.workflow_paths(workflow_id))
  }

  async fn create_minimal_path(&self, request: &CreateMinimalPath) -> Result<Path, StoreError> {
    let mut state = self.state.lock().await;
    state.begin_request()?;
    state.require_workflow(request.workflow_id)?;

    let path_id = state.insert_path(&request.name, request.workflow_id, BlockType::End);
    debug!(%path_id, name = %request.name, "created minimal path");
    Ok(state.materialize(path_id))
  }

  async fn move_blocks(&self, request: &MoveBlocks) -> Result<(), StoreError> {
    let mut state = self.state.lock().await;
    state.begin_request()?;
    let destination = request.destination_path_id;
    state.terminal_of(destination)?;

    // Validate everything before touching any path.
    for (i, block_id) in request.block_ids.iter().enumerate() {
      if request.block_ids[..i].contains(block_id) {
        return Err(StoreError::rejected(format!("block {block_id} listed twice")));
      }
      let (owner, index) = state.locate(*block_id)?;
      let block = &state.paths[&owner].blocks[index];
      if !block.block_type.is_content() {
        return Err(StoreError::rejected(format!(
          "block {block_id} of type {:?} cannot be moved",
          block.block_type
        )));
      }
      if owner == destination {
        return Err(StoreError::rejected(format!(
          "block {block_id} is already in path {destination}"
        )));
      }
    }

    let mut moved = Vec::with_capacity(request.block_ids.len());
    for block_id in &request.block_ids {
      let (owner, index) = state.locate(*block_id)?;
      if let Some(path) = state.paths.get_mut(&owner) {
        let mut block = path.blocks.remove(index);
        renumber(&mut path.blocks);
        block.path_id = destination;
        moved.push(block);
      }
    }

    if let Some(path) = state.paths.get_mut(&destination) {
      let insert_at = path.blocks.len() - 1;
      path.blocks.splice(insert_at..insert_at, moved);
      renumber(&mut path.blocks);
    }

    debug!(
      destination_path_id = %destination,
      count = request.block_ids.len(),
      "moved blocks"
    );
    Ok(())
  }

  async fn connect_paths(&self, request: &ConnectPaths) -> Result<(), StoreError> {
    let mut state = self.state.lock().await;
    state.begin_request()?;
    let terminal = state.terminal_of(request.destination_path_id)?;

    for child in &request.child_path_ids {
      state.require_path(*child)?;
      if *child == request.destination_path_id {
        return Err(StoreError::rejected(format!(
          "path {child} cannot follow itself"
        )));
      }
    }
    if let Some(source) = request.source_block_id {
      state.locate(source)?;
    }

    for child in &request.child_path_ids {
      if let Some(source) = request.source_block_id {
        state.remove_edge(source, *child);
      }
      state.add_edge(terminal, *child);
    }
    Ok(())
  }

  async fn create_merge_path(&self, request: &CreateMergePath) -> Result<Path, StoreError> {
    let mut state = self.state.lock().await;
    state.begin_request()?;
    state.require_workflow(request.workflow_id)?;

    let mut parents: Vec<BlockId> = Vec::with_capacity(request.parent_blocks.len());
    for block_id in &request.parent_blocks {
      if !parents.contains(block_id) {
        parents.push(*block_id);
      }
    }
    if parents.len() < 2 {
      return Err(StoreError::rejected("a merge needs at least two parent blocks"));
    }
    for block_id in &parents {
      state.require_joinable(*block_id, None)?;
    }

    let path_id = state.insert_path(&request.name, request.workflow_id, BlockType::End);
    for block_id in parents {
      state.add_edge(block_id, path_id);
      state.mark_merge(block_id)?;
    }

    debug!(%path_id, "created merge path");
    Ok(state.materialize(path_id))
  }

  async fn update_merge(
    &self,
    merge_path_id: PathId,
    request: &UpdateMerge,
  ) -> Result<(), StoreError> {
    let mut state = self.state.lock().await;
    state.begin_request()?;
    state.require_path(merge_path_id)?;

    for block_id in &request.parents_to_disconnect {
      if !state.has_edge(*block_id, merge_path_id) {
        return Err(StoreError::rejected(format!(
          "block {block_id} is not a parent of merge path {merge_path_id}"
        )));
      }
    }

    let mut parents: Vec<BlockId> = state
      .edges
      .iter()
      .filter(|e| e.path_id == merge_path_id)
      .map(|e| e.block_id)
      .collect();
    parents.retain(|b| !request.parents_to_disconnect.contains(b));
    for block_id in &request.parents_to_connect {
      state.require_joinable(*block_id, Some(merge_path_id))?;
      if !parents.contains(block_id) {
        parents.push(*block_id);
      }
    }
    if parents.len() < 2 {
      return Err(StoreError::rejected(format!(
        "merge path {merge_path_id} would have {} parent(s)",
        parents.len()
      )));
    }

    for block_id in &request.parents_to_disconnect {
      state.remove_edge(*block_id, merge_path_id);
      if state.children_of(*block_id).is_empty() {
        state.unmark_merge(*block_id)?;
      }
    }
    for block_id in &request.parents_to_connect {
      state.add_edge(*block_id, merge_path_id);
      state.mark_merge(*block_id)?;
    }
    Ok(())
  }

  async fn update_block_type(
    &self,
    block_id: BlockId,
    request: &UpdateBlockType,
  ) -> Result<Block, StoreError> {
    let mut state = self.state.lock().await;
    state.begin_request()?;

    let block = state.block_mut(block_id)?;
    block.block_type = request.block_type;
    let mut block = block.clone();
    block.child_paths = state.children_of(block_id);
    Ok(block)
  }
}
