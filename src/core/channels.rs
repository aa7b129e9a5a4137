//! Channel bundle for inter-task communication
//!
//! Scheduler -> delivery task: notifications (bounded mpsc).
//! main -> every task: shutdown (broadcast).

use tokio::sync::{broadcast, mpsc};

use crate::notify::Notification;

/// Default channel capacity for bounded channels
pub const DEFAULT_CHANNEL_CAPACITY: usize = 256;

/// Bundle of all inter-task communication channels
#[derive(Debug)]
pub struct ChannelBundle {
    pub notification_tx: mpsc::Sender<Notification>,
    pub notification_rx: mpsc::Receiver<Notification>,

    /// Shutdown broadcast: main -> all tasks
    pub shutdown_tx: broadcast::Sender<()>,
}

impl ChannelBundle {
    pub fn new(capacity: usize) -> Self {
        let (notification_tx, notification_rx) = mpsc::channel(capacity.max(1));
        let (shutdown_tx, _) = broadcast::channel(1);

        Self {
            notification_tx,
            notification_rx,
            shutdown_tx,
        }
    }

    pub fn subscribe_shutdown(&self) -> broadcast::Receiver<()> {
        self.shutdown_tx.subscribe()
    }
}

impl Default for ChannelBundle {
    fn default() -> Self {
        Self::new(DEFAULT_CHANNEL_CAPACITY)
    }
}
