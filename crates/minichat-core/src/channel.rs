use thiserror::Error;
use tokio::sync::{broadcast, mpsc};

use crate::types::{SessionCommand, SessionEvent, SessionSnapshot};

/// Receiver half handed to presentation subscribers.
pub type EventStream = broadcast::Receiver<SessionEvent>;

/// Errors returned when queueing session commands.
#[derive(Debug, Error)]
pub enum SessionChannelError {
    /// The command loop has stopped.
    #[error("session command queue is closed")]
    Closed,
}

/// Fan-out of session events. A session owns one; every view subscribes to it.
#[derive(Clone, Debug)]
pub struct SessionEvents {
    tx: broadcast::Sender<SessionEvent>,
}

impl SessionEvents {
    /// Keep up to `capacity` undelivered events per subscriber before it lags.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> EventStream {
        self.tx.subscribe()
    }

    /// Publish one event. Returns the number of subscribers that received it.
    pub fn emit(&self, event: SessionEvent) -> usize {
        self.tx.send(event).unwrap_or(0)
    }

    /// Publish a post-mutation snapshot.
    pub fn publish_snapshot(&self, snapshot: SessionSnapshot) -> usize {
        self.emit(SessionEvent::Snapshot(Box::new(snapshot)))
    }
}

/// Frontend half of the bounded queue feeding the session command loop.
#[derive(Clone, Debug)]
pub struct CommandQueue {
    tx: mpsc::Sender<SessionCommand>,
}

impl CommandQueue {
    pub fn bounded(capacity: usize) -> (Self, mpsc::Receiver<SessionCommand>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }

    /// Queue a command, waiting while the loop is saturated.
    pub async fn send(&self, command: SessionCommand) -> Result<(), SessionChannelError> {
        self.tx
            .send(command)
            .await
            .map_err(|_| SessionChannelError::Closed)
    }
}
