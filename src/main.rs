use std::path::{Path as FsPath, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use pathweave_engine::{EditorConfig, SplitRequest, WorkflowEditor};
use pathweave_model::{BlockId, BlockType, PathId, WorkflowId, validate};
use pathweave_store::{
  HttpStoreConfig, HttpWorkflowStore, InMemoryWorkflowStore, Snapshot, WorkflowStore,
};

/// Pathweave - edit branching workflow graphs
#[derive(Parser)]
#[command(name = "pathweave")]
#[command(version, about, long_about = None)]
struct Cli {
  /// Path to the data directory (default: ~/.pathweave)
  #[arg(long, global = true)]
  data_dir: Option<PathBuf>,

  /// Base URL of a remote workflow store. Snapshot files are used when unset.
  #[arg(long, global = true, env = "PATHWEAVE_STORE_URL")]
  store_url: Option<String>,

  /// Workflow to edit on the remote store
  #[arg(long, global = true)]
  workflow: Option<i64>,

  /// Snapshot file (default: <data-dir>/workflow.json)
  #[arg(long, global = true)]
  snapshot: Option<PathBuf>,

  #[command(subcommand)]
  command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
  /// Create a new workflow snapshot with an empty root path
  Init {
    #[arg(long)]
    title: String,
  },

  /// Append a step before the terminal block of a path (snapshot only)
  AddStep {
    #[arg(long)]
    path: i64,

    #[arg(long)]
    title: String,

    /// Add a delay instead of a step
    #[arg(long)]
    delay: bool,
  },

  /// Print the navigation tree
  Tree {
    /// Keep only blocks matching this term, and the blocks leading to them
    #[arg(long)]
    filter: Option<String>,
  },

  /// Check the graph invariants
  Validate,

  /// Split a path into parallel branches
  Split {
    #[arg(long)]
    path: i64,

    #[arg(long)]
    position: u32,

    /// Branch names (default from config: If,Else)
    #[arg(long, value_delimiter = ',')]
    names: Option<Vec<String>>,

    /// Index of the branch receiving the blocks after the split point
    #[arg(long, default_value_t = 0)]
    move_to: usize,
  },

  /// Merge the branches closed by the given end blocks
  Merge {
    #[arg(long = "end-block", required = true, num_args = 1..)]
    end_blocks: Vec<i64>,
  },

  /// Set the parent blocks of an existing merge path
  UpdateMerge {
    #[arg(long)]
    merge_path: i64,

    #[arg(long = "end-block", required = true, num_args = 1..)]
    end_blocks: Vec<i64>,
  },
}

/// A gesture applied through a [`WorkflowEditor`].
enum Gesture {
  Split(SplitRequest),
  Merge(Vec<BlockId>),
  UpdateMerge {
    merge_path_id: PathId,
    end_blocks: Vec<BlockId>,
  },
}

fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("pathweave=info")),
    )
    .with_writer(std::io::stderr)
    .init();

  let Cli {
    data_dir,
    store_url,
    workflow,
    snapshot,
    command,
  } = Cli::parse();

  let data_dir = match data_dir {
    Some(dir) => dir,
    None => dirs::home_dir()
      .context("could not determine home directory")?
      .join(".pathweave"),
  };
  let snapshot_file = snapshot.unwrap_or_else(|| data_dir.join("workflow.json"));

  let Some(command) = command else {
    println!("pathweave - use --help to see available commands");
    return Ok(());
  };

  let rt = tokio::runtime::Runtime::new()?;
  rt.block_on(async {
    let backend = Backend {
      store_url,
      workflow: workflow.map(WorkflowId),
      snapshot_file,
      config: load_config(&data_dir).await?,
    };
    run(backend, command).await
  })
}

struct Backend {
  store_url: Option<String>,
  workflow: Option<WorkflowId>,
  snapshot_file: PathBuf,
  config: EditorConfig,
}

async fn run(backend: Backend, command: Commands) -> Result<()> {
  match command {
    Commands::Init { title } => init(&backend, title).await,
    Commands::AddStep { path, title, delay } => {
      let block_type = if delay {
        BlockType::Delay
      } else {
        BlockType::Step
      };
      add_step(&backend, PathId(path), block_type, title).await
    }
    Commands::Tree { filter } => tree(&backend, filter).await,
    Commands::Validate => validate_graph(&backend).await,
    Commands::Split {
      path,
      position,
      names,
      move_to,
    } => {
      let names = names.unwrap_or_else(|| backend.config.default_branch_names.clone());
      let request = SplitRequest::new(PathId(path), position)
        .with_names(names)
        .moving_to(move_to);
      edit(&backend, Gesture::Split(request)).await
    }
    Commands::Merge { end_blocks } => {
      let end_blocks = end_blocks.into_iter().map(BlockId).collect();
      edit(&backend, Gesture::Merge(end_blocks)).await
    }
    Commands::UpdateMerge {
      merge_path,
      end_blocks,
    } => {
      let gesture = Gesture::UpdateMerge {
        merge_path_id: PathId(merge_path),
        end_blocks: end_blocks.into_iter().map(BlockId).collect(),
      };
      edit(&backend, gesture).await
    }
  }
}

async fn init(backend: &Backend, title: String) -> Result<()> {
  ensure_local(backend, "init")?;
  if tokio::fs::try_exists(&backend.snapshot_file).await? {
    bail!(
      "snapshot already exists: {}",
      backend.snapshot_file.display()
    );
  }

  let store = InMemoryWorkflowStore::new();
  let (workflow, root) = store.create_workflow(title).await;
  save_snapshot(&store, workflow.id, &backend.snapshot_file).await?;

  eprintln!("Created workflow {} ({})", workflow.id, workflow.title);
  eprintln!("Root path: {}", root.id);
  Ok(())
}

async fn add_step(
  backend: &Backend,
  path_id: PathId,
  block_type: BlockType,
  title: String,
) -> Result<()> {
  ensure_local(backend, "add-step")?;
  let (store, workflow_id) = open_snapshot(&backend.snapshot_file).await?;
  let block = store
    .append_block(path_id, block_type, title)
    .await
    .with_context(|| format!("failed to add block to path {path_id}"))?;
  save_snapshot(&store, workflow_id, &backend.snapshot_file).await?;

  eprintln!("Added block {} at position {}", block.id, block.position);
  Ok(())
}

async fn tree(backend: &Backend, filter: Option<String>) -> Result<()> {
  let view = match &backend.store_url {
    Some(url) => {
      let store = http_store(url)?;
      let editor = WorkflowEditor::load(store, remote_workflow(backend)?, backend.config.clone())
        .await
        .context("failed to load workflow")?;
      render(&editor, filter.as_deref())
    }
    None => {
      let (store, workflow_id) = open_snapshot(&backend.snapshot_file).await?;
      let editor = WorkflowEditor::load(store, workflow_id, backend.config.clone())
        .await
        .context("failed to load workflow")?;
      render(&editor, filter.as_deref())
    }
  };

  match view {
    Some(view) => print!("{view}"),
    None => eprintln!("No matching blocks"),
  }
  Ok(())
}

fn render<S: WorkflowStore>(editor: &WorkflowEditor<S>, filter: Option<&str>) -> Option<String> {
  let view = match filter {
    Some(term) => editor.search(term),
    None => editor.tree(),
  };
  view.map(|v| v.to_string())
}

async fn validate_graph(backend: &Backend) -> Result<()> {
  let paths = match &backend.store_url {
    Some(url) => http_store(url)?
      .fetch_paths(remote_workflow(backend)?)
      .await
      .context("failed to fetch paths")?,
    None => {
      let (store, workflow_id) = open_snapshot(&backend.snapshot_file).await?;
      store
        .fetch_paths(workflow_id)
        .await
        .context("failed to read paths")?
    }
  };

  let violations = validate(&paths);
  if violations.is_empty() {
    eprintln!("{} paths, no violations", paths.len());
    return Ok(());
  }
  for violation in &violations {
    println!("{violation}");
  }
  bail!("{} invariant violations", violations.len())
}

async fn edit(backend: &Backend, gesture: Gesture) -> Result<()> {
  match &backend.store_url {
    Some(url) => {
      let store = http_store(url)?;
      let mut editor =
        WorkflowEditor::load(store, remote_workflow(backend)?, backend.config.clone())
          .await
          .context("failed to load workflow")?;
      apply(&mut editor, gesture).await?;
      print_tree(&editor);
    }
    None => {
      let (store, workflow_id) = open_snapshot(&backend.snapshot_file).await?;
      let mut editor = WorkflowEditor::load(store.clone(), workflow_id, backend.config.clone())
        .await
        .context("failed to load workflow")?;
      apply(&mut editor, gesture).await?;
      save_snapshot(&store, workflow_id, &backend.snapshot_file).await?;
      print_tree(&editor);
    }
  }
  Ok(())
}

async fn apply<S: WorkflowStore>(editor: &mut WorkflowEditor<S>, gesture: Gesture) -> Result<()> {
  match gesture {
    Gesture::Split(request) => {
      editor
        .split(&request)
        .await
        .with_context(|| format!("failed to split path {}", request.parent_path_id))?;
      eprintln!(
        "Split path {} into {} branches",
        request.parent_path_id,
        request.paths_to_create.len()
      );
    }
    Gesture::Merge(end_blocks) => {
      for block_id in end_blocks {
        editor
          .toggle_end_block(block_id)
          .with_context(|| format!("cannot select end block {block_id}"))?;
      }
      let count = editor.selection().len();
      editor.merge_selected().await.context("failed to merge")?;
      eprintln!("Merged {count} branches");
    }
    Gesture::UpdateMerge {
      merge_path_id,
      end_blocks,
    } => {
      editor
        .stage_merge_update(merge_path_id, &end_blocks)
        .with_context(|| format!("cannot update merge path {merge_path_id}"))?;
      editor
        .commit_merge_update()
        .await
        .with_context(|| format!("failed to update merge path {merge_path_id}"))?;
      eprintln!("Merge path {merge_path_id} now has {} parents", end_blocks.len());
    }
  }
  Ok(())
}

fn print_tree<S: WorkflowStore>(editor: &WorkflowEditor<S>) {
  if let Some(view) = editor.tree() {
    print!("{view}");
  }
}

fn ensure_local(backend: &Backend, command: &str) -> Result<()> {
  if backend.store_url.is_some() {
    bail!("{command} only works on snapshot files");
  }
  Ok(())
}

fn remote_workflow(backend: &Backend) -> Result<WorkflowId> {
  backend
    .workflow
    .context("--workflow is required with a remote store")
}

fn http_store(url: &str) -> Result<HttpWorkflowStore> {
  HttpWorkflowStore::new(HttpStoreConfig {
    base_url: url.to_string(),
    timeout_ms: None,
  })
  .with_context(|| format!("invalid store url: {url}"))
}

async fn load_config(data_dir: &FsPath) -> Result<EditorConfig> {
  let file = data_dir.join("config.json");
  if !tokio::fs::try_exists(&file).await? {
    return Ok(EditorConfig::default());
  }

  let content = tokio::fs::read_to_string(&file)
    .await
    .with_context(|| format!("failed to read config file: {}", file.display()))?;
  serde_json::from_str(&content)
    .with_context(|| format!("failed to parse config file: {}", file.display()))
}

async fn open_snapshot(file: &FsPath) -> Result<(Arc<InMemoryWorkflowStore>, WorkflowId)> {
  let content = tokio::fs::read_to_string(file)
    .await
    .with_context(|| format!("failed to read snapshot file: {}", file.display()))?;
  let snapshot: Snapshot = serde_json::from_str(&content)
    .with_context(|| format!("failed to parse snapshot file: {}", file.display()))?;

  let workflow_id = snapshot.workflow.id;
  Ok((
    Arc::new(InMemoryWorkflowStore::from_snapshot(snapshot)),
    workflow_id,
  ))
}

async fn save_snapshot(
  store: &InMemoryWorkflowStore,
  workflow_id: WorkflowId,
  file: &FsPath,
) -> Result<()> {
  let snapshot = store.snapshot(workflow_id).await?;
  if let Some(dir) = file.parent() {
    tokio::fs::create_dir_all(dir)
      .await
      .with_context(|| format!("failed to create directory: {}", dir.display()))?;
  }
  tokio::fs::write(file, serde_json::to_string_pretty(&snapshot)?)
    .await
    .with_context(|| format!("failed to write snapshot file: {}", file.display()))?;
  debug!(file = %file.display(), "snapshot saved");
  Ok(())
}
