use std::sync::Arc;

use minichat_core::{
    ChatApi, CommandQueue, EventStream, SessionChannelError, SessionCommand, SessionEvents,
    SyncConfig, command_action,
};
use minichat_platform::IdentityStore;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::session::ChatSession;

const COMMAND_BUFFER: usize = 128;
const EVENT_BUFFER: usize = 512;

/// Frontend handle to a running session command loop.
pub struct SessionRuntimeHandle<A: ChatApi> {
    commands: CommandQueue,
    session: ChatSession<A>,
}

impl<A: ChatApi> Clone for SessionRuntimeHandle<A> {
    fn clone(&self) -> Self {
        Self {
            commands: self.commands.clone(),
            session: self.session.clone(),
        }
    }
}

impl<A: ChatApi> SessionRuntimeHandle<A> {
    pub async fn send(&self, command: SessionCommand) -> Result<(), SessionChannelError> {
        self.commands.send(command).await
    }

    pub fn subscribe(&self) -> EventStream {
        self.session.subscribe()
    }

    /// Direct access for synchronous reads (snapshot, typing state).
    pub fn session(&self) -> &ChatSession<A> {
        &self.session
    }
}

/// Start a session and its command loop on the current tokio runtime.
pub fn spawn_runtime<A: ChatApi>(
    api: A,
    identity: Arc<dyn IdentityStore>,
    config: SyncConfig,
) -> SessionRuntimeHandle<A> {
    let (commands, command_rx) = CommandQueue::bounded(COMMAND_BUFFER);
    let events = SessionEvents::new(EVENT_BUFFER);
    let session = ChatSession::with_events(api, identity, config, events);
    let runtime = SessionRuntime {
        session: session.clone(),
        command_rx,
    };
    tokio::spawn(async move {
        runtime.run().await;
    });

    SessionRuntimeHandle { commands, session }
}

struct SessionRuntime<A: ChatApi> {
    session: ChatSession<A>,
    command_rx: mpsc::Receiver<SessionCommand>,
}

impl<A: ChatApi> SessionRuntime<A> {
    async fn run(mut self) {
        while let Some(command) = self.command_rx.recv().await {
            let action = command_action(&command);
            debug!(action, "session command received");
            match command {
                SessionCommand::Shutdown => break,
                // Cheap and order-sensitive relative to a following send.
                SessionCommand::ComposerChanged { text } => self.session.composer_changed(&text),
                command => {
                    let session = self.session.clone();
                    tokio::spawn(async move {
                        if let Err(err) = session.dispatch(command).await {
                            warn!(action, error = %err, "session command failed");
                        }
                    });
                }
            }
        }
        self.session.shutdown();
    }
}
