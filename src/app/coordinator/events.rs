//! Events posted from workers to the coordinator
//!
//! Workers never touch presentation state. Each one posts its result here
//! and the coordinator applies it on its own loop.

use std::path::PathBuf;

use tokio::sync::mpsc;
use tracing::debug;

use crate::app::reconcile::Reconciliation;
use crate::app::task::TaskId;
use crate::errors::{ArchiveResult, LayoutResult, NetworkResult};

/// A message from a background worker
#[derive(Debug)]
pub enum UiEvent {
    /// Folder layout pass finished
    LayoutFinished(LayoutResult<Vec<PathBuf>>),
    /// One product check finished
    CheckCompleted(Reconciliation),
    /// Bytes received so far for a running download
    DownloadProgress {
        id: TaskId,
        bytes: u64,
        total: Option<u64>,
    },
    /// A download ended
    DownloadFinished {
        id: TaskId,
        result: NetworkResult<u64>,
    },
    /// An archive extraction ended
    ExtractionFinished {
        archive: PathBuf,
        destination: PathBuf,
        result: ArchiveResult<usize>,
    },
}

impl UiEvent {
    /// Whether this is the last event its worker posts
    pub fn is_terminal(&self) -> bool {
        !matches!(self, UiEvent::DownloadProgress { .. })
    }
}

/// Multi-producer handle onto the coordinator's single-consumer queue
#[derive(Debug, Clone)]
pub struct TaskQueue {
    sender: mpsc::UnboundedSender<UiEvent>,
}

impl TaskQueue {
    /// Create a queue and the receiver the coordinator drains
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<UiEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }

    /// Post an event; dropped silently once the coordinator is gone
    pub fn post(&self, event: UiEvent) {
        if let Err(e) = self.sender.send(event) {
            debug!("Coordinator gone, dropping event: {:?}", e.0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_events_arrive_in_order() {
        let (queue, mut receiver) = TaskQueue::channel();
        let producer = queue.clone();

        producer.post(UiEvent::DownloadProgress {
            id: TaskId(1),
            bytes: 10,
            total: None,
        });
        producer.post(UiEvent::DownloadFinished {
            id: TaskId(1),
            result: Ok(10),
        });

        let first = receiver.recv().await.unwrap();
        assert!(!first.is_terminal());
        let second = receiver.recv().await.unwrap();
        assert!(second.is_terminal());
    }

    #[test]
    fn test_post_after_receiver_dropped() {
        let (queue, receiver) = TaskQueue::channel();
        drop(receiver);
        queue.post(UiEvent::LayoutFinished(Ok(Vec::new())));
    }
}
