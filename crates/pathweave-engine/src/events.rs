//! Graph change notifiers.
//!
//! After every committed mutation the editor diffs the old and new path sets
//! and hands each resulting [`GraphEvent`] to its notifier, so rendering
//! layers and projection runners can follow the graph.

use pathweave_model::GraphEvent;
use tokio::sync::mpsc;

/// Receiver of graph change events.
///
/// The editor calls `notify` once per event, in application order.
pub trait GraphNotifier: Send + Sync {
  fn notify(&self, event: GraphEvent);
}

/// A notifier that discards all events.
#[derive(Debug, Clone, Default)]
pub struct NoopNotifier;

impl GraphNotifier for NoopNotifier {
  fn notify(&self, _event: GraphEvent) {}
}

/// A notifier that sends events to an unbounded channel.
///
/// Pair it with a projection runner's sender, or drain the receiver directly.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
  sender: mpsc::UnboundedSender<GraphEvent>,
}

impl ChannelNotifier {
  pub fn new(sender: mpsc::UnboundedSender<GraphEvent>) -> Self {
    Self { sender }
  }

  /// Create a notifier together with the receiving end of its channel.
  pub fn channel() -> (Self, mpsc::UnboundedReceiver<GraphEvent>) {
    let (sender, receiver) = mpsc::unbounded_channel();
    (Self::new(sender), receiver)
  }
}

impl GraphNotifier for ChannelNotifier {
  fn notify(&self, event: GraphEvent) {
    // Receiver may have been dropped
    let _ = self.sender.send(event);
  }
}

#[cfg(test)]
mod tests {
  use pathweave_model::PathId;

  use super::*;

  #[test]
  fn test_channel_notifier_delivers_in_order() {
    let (notifier, mut receiver) = ChannelNotifier::channel();
    notifier.notify(GraphEvent::PathRemoved { path_id: PathId(1) });
    notifier.notify(GraphEvent::PathRemoved { path_id: PathId(2) });

    assert_eq!(
      receiver.try_recv().unwrap(),
      GraphEvent::PathRemoved { path_id: PathId(1) }
    );
    assert_eq!(
      receiver.try_recv().unwrap(),
      GraphEvent::PathRemoved { path_id: PathId(2) }
    );
  }

  #[test]
  fn test_channel_notifier_ignores_closed_receiver() {
    let (notifier, receiver) = ChannelNotifier::channel();
    drop(receiver);
    notifier.notify(GraphEvent::PathRemoved { path_id: PathId(1) });
  }
}
