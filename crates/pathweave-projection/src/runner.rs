//! Projection runner fed by a graph event channel.
//!
//! The `ProjectionRunner` owns an mpsc channel of [`GraphEvent`]s and applies
//! each one to a shared [`TreeProjection`]. The editor's channel notifier
//! writes into the other end.

use std::sync::Arc;

use pathweave_model::GraphEvent;
use tokio::sync::{RwLock, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::tree::TreeProjection;

/// Counters reported when a runner stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunnerStats {
  pub applied: usize,
  pub dropped: usize,
}

/// Applies graph events to a shared projection until cancelled.
///
/// # Usage
///
/// ```ignore
/// let runner = ProjectionRunner::new(TreeProjection::from_paths(&paths));
/// let projection = runner.projection();
/// let notifier = ChannelNotifier::new(runner.sender());
///
/// let cancel = CancellationToken::new();
/// tokio::spawn(runner.start(cancel.clone()));
/// ```
pub struct ProjectionRunner {
  sender: mpsc::UnboundedSender<GraphEvent>,
  receiver: mpsc::UnboundedReceiver<GraphEvent>,
  projection: Arc<RwLock<TreeProjection>>,
}

impl ProjectionRunner {
  pub fn new(projection: TreeProjection) -> Self {
    let (sender, receiver) = mpsc::unbounded_channel();
    Self {
      sender,
      receiver,
      projection: Arc::new(RwLock::new(projection)),
    }
  }

  /// Get a sender handle for publishing events to this runner.
  pub fn sender(&self) -> mpsc::UnboundedSender<GraphEvent> {
    self.sender.clone()
  }

  /// Shared handle to the projection the runner patches.
  pub fn projection(&self) -> Arc<RwLock<TreeProjection>> {
    Arc::clone(&self.projection)
  }

  /// Start the apply loop.
  ///
  /// Runs until the token is cancelled or every sender handed out by
  /// [`sender`](Self::sender) is dropped.
  pub async fn start(self, cancel: CancellationToken) -> RunnerStats {
    let Self {
      sender,
      mut receiver,
      projection,
    } = self;
    drop(sender);

    info!("starting projection runner");
    let mut stats = RunnerStats::default();

    loop {
      tokio::select! {
          _ = cancel.cancelled() => {
              info!(applied = stats.applied, dropped = stats.dropped, "projection runner cancelled");
              break;
          }
          event = receiver.recv() => {
              match event {
                  Some(event) => {
                      let mut tree = projection.write().await;
                      match tree.apply(&event) {
                          Ok(()) => stats.applied += 1,
                          Err(_) => stats.dropped += 1,
                      }
                  }
                  None => {
                      info!(applied = stats.applied, dropped = stats.dropped, "projection runner channel closed");
                      break;
                  }
              }
          }
      }
    }

    stats
  }
}
