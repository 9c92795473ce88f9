use std::{
    sync::{
        Arc, Mutex, MutexGuard, PoisonError, Weak,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use minichat_core::{
    ChatApi, ConversationId, ConversationSummary, EventStream, LoadMode, Scope, SessionCommand,
    SessionError, SessionEvent, SessionEvents, SessionSnapshot, SessionState, SyncConfig,
    UserId,
};
use minichat_platform::{IdentityStore, persist_acting_user_id};
use tokio::time::Instant;
use tracing::{debug, trace, warn};

use crate::poller::{PollerHandle, spawn_poller};

const DEFAULT_EVENT_CAPACITY: usize = 256;

const INIT_FALLBACK: &str = "Failed to init";
const CONVERSATIONS_FALLBACK: &str = "Failed to load conversations";
const MESSAGES_FALLBACK: &str = "Failed to load messages";
const SEND_FALLBACK: &str = "Failed to send message";
const CREATE_FALLBACK: &str = "Failed to create conversation";

pub(crate) struct SessionInner<A: ChatApi> {
    api: A,
    identity: Arc<dyn IdentityStore>,
    config: SyncConfig,
    state: Mutex<SessionState>,
    events: SessionEvents,
    poller: Mutex<Option<PollerHandle>>,
    /// Set once by `shutdown`, only while the poller lock is held.
    shut_down: AtomicBool,
    started_at: Instant,
}

/// Client session orchestrating fetches against a [`ChatApi`].
///
/// Each flow may run concurrently with others. State lives behind a mutex that is
/// never held across an await; responses of superseded fetches are dropped by the
/// state reducer. Every state change publishes a [`SessionEvent::Snapshot`].
pub struct ChatSession<A: ChatApi> {
    inner: Arc<SessionInner<A>>,
}

impl<A: ChatApi> Clone for ChatSession<A> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<A: ChatApi> ChatSession<A> {
    pub fn new(api: A, identity: Arc<dyn IdentityStore>, config: SyncConfig) -> Self {
        Self::with_events(api, identity, config, SessionEvents::new(DEFAULT_EVENT_CAPACITY))
    }

    /// Build a session that publishes on an existing event fan-out.
    pub fn with_events(
        api: A,
        identity: Arc<dyn IdentityStore>,
        config: SyncConfig,
        events: SessionEvents,
    ) -> Self {
        Self {
            inner: Arc::new(SessionInner {
                api,
                identity,
                config,
                state: Mutex::new(SessionState::new(&config)),
                events,
                poller: Mutex::new(None),
                shut_down: AtomicBool::new(false),
                started_at: Instant::now(),
            }),
        }
    }

    pub(crate) fn from_inner(inner: Arc<SessionInner<A>>) -> Self {
        Self { inner }
    }

    pub(crate) fn downgrade(&self) -> Weak<SessionInner<A>> {
        Arc::downgrade(&self.inner)
    }

    pub fn api(&self) -> &A {
        &self.inner.api
    }

    pub fn config(&self) -> &SyncConfig {
        &self.inner.config
    }

    pub fn subscribe(&self) -> EventStream {
        self.inner.events.subscribe()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.lock_state().snapshot()
    }

    /// `true` while a poll task is scheduled.
    pub fn is_polling(&self) -> bool {
        lock(&self.inner.poller).is_some()
    }

    /// `true` once [`shutdown`](Self::shutdown) ran.
    pub fn is_shut_down(&self) -> bool {
        self.inner.shut_down.load(Ordering::SeqCst)
    }

    /// Run one command through its flow after the lifecycle guard.
    pub async fn dispatch(&self, command: SessionCommand) -> Result<(), SessionError> {
        if matches!(command, SessionCommand::Shutdown) {
            self.shutdown();
            return Ok(());
        }
        self.guard(&command)?;
        match command {
            SessionCommand::SwitchUser { user_id } => self.switch_user(user_id).await,
            SessionCommand::SelectConversation { conversation_id } => {
                self.select_conversation(conversation_id).await
            }
            SessionCommand::CreateConversation { participant_id } => {
                self.create_conversation(participant_id).await.map(|_| ())
            }
            SessionCommand::LoadMoreConversations => self.load_more_conversations().await,
            SessionCommand::LoadOlderMessages => self.load_older_messages().await,
            SessionCommand::ComposerChanged { text } => {
                self.composer_changed(&text);
                Ok(())
            }
            SessionCommand::SendMessage { body } => self.send_message(&body).await,
            SessionCommand::Shutdown => Ok(()),
        }
    }

    /// Switch the acting user: persist, reset, then load profile, directory and the
    /// first conversation page.
    ///
    /// Failures end up in the conversation scope; the session still reaches `Ready`.
    pub async fn switch_user(&self, user_id: UserId) -> Result<(), SessionError> {
        if user_id <= 0 {
            return Err(SessionError::InvalidUserId(user_id));
        }
        self.ensure_running()?;
        if let Err(err) = persist_acting_user_id(self.inner.identity.as_ref(), user_id) {
            warn!(user_id, error = %err, "failed to persist acting user");
        }

        let (epoch, phase_event) = self.update(|state| state.begin_user_switch(user_id));
        self.inner.events.emit(phase_event);
        self.reschedule_poller();

        let result = self.load_profile_and_conversations(user_id, epoch).await;
        if !self.is_current(epoch) {
            trace!(user_id, "user switch superseded");
            return Ok(());
        }

        if let Err(err) = &result {
            let text = err.scope_text(INIT_FALLBACK);
            self.update(|state| state.finish_action(Scope::Conversations, epoch, Some(text)));
        }
        if let Some(event) = self.update(|state| state.finish_init(epoch)) {
            debug!(user_id, "session ready");
            self.inner.events.emit(event);
        }
        result
    }

    async fn load_profile_and_conversations(
        &self,
        user_id: UserId,
        epoch: u64,
    ) -> Result<(), SessionError> {
        let (me, users) = tokio::try_join!(
            self.inner.api.fetch_current_user(user_id),
            self.inner.api.fetch_users(user_id, true),
        )?;
        if !self.update(|state| state.apply_profile(epoch, me, users)) {
            return Ok(());
        }
        self.fetch(Scope::Conversations, LoadMode::Reset)
            .await
            .map(|_| ())
    }

    /// Select a conversation and load its newest messages.
    pub async fn select_conversation(
        &self,
        conversation_id: ConversationId,
    ) -> Result<(), SessionError> {
        self.guard(&SessionCommand::SelectConversation { conversation_id })?;
        self.update(|state| state.select_conversation(conversation_id));
        self.reschedule_poller();
        self.fetch(Scope::Messages, LoadMode::Reset).await.map(|_| ())
    }

    /// Create a conversation, refresh the list and select it.
    ///
    /// Returns `None` when a user switch superseded the flow after creation.
    pub async fn create_conversation(
        &self,
        participant_id: UserId,
    ) -> Result<Option<ConversationSummary>, SessionError> {
        self.guard(&SessionCommand::CreateConversation { participant_id })?;
        let (acting, epoch) = {
            let state = self.lock_state();
            (state.acting_user_id(), state.epoch())
        };
        let Some(acting) = acting else {
            return Ok(None);
        };

        self.update(|state| state.begin_action(Scope::Conversations));
        let created = self.inner.api.create_conversation(acting, participant_id).await;
        let conversation = match created {
            Ok(conversation) => conversation,
            Err(err) => {
                let err = SessionError::from(err);
                let text = err.scope_text(CREATE_FALLBACK);
                self.update(|state| state.finish_action(Scope::Conversations, epoch, Some(text)));
                return Err(err);
            }
        };
        if !self.update(|state| state.finish_action(Scope::Conversations, epoch, None)) {
            return Ok(None);
        }
        debug!(conversation_id = conversation.id, participant_id, "conversation created");

        self.fetch(Scope::Conversations, LoadMode::Reset).await?;
        if !self.is_current(epoch) {
            return Ok(None);
        }
        self.select_conversation(conversation.id).await?;
        Ok(Some(conversation))
    }

    /// Append the next conversation page; no request when nothing more is available.
    pub async fn load_more_conversations(&self) -> Result<(), SessionError> {
        self.guard(&SessionCommand::LoadMoreConversations)?;
        self.fetch(Scope::Conversations, LoadMode::Append)
            .await
            .map(|_| ())
    }

    /// Append the next (older) message page of the selected conversation.
    pub async fn load_older_messages(&self) -> Result<(), SessionError> {
        self.guard(&SessionCommand::LoadOlderMessages)?;
        self.fetch(Scope::Messages, LoadMode::Append).await.map(|_| ())
    }

    /// Feed composer text into the typing gate.
    pub fn composer_changed(&self, text: &str) {
        let now_ms = self.now_ms();
        self.lock_state().on_composer_changed(text, now_ms);
    }

    /// `true` while typing suppression is active.
    pub fn is_typing(&self) -> bool {
        let now_ms = self.now_ms();
        self.lock_state().is_typing(now_ms)
    }

    /// Send a trimmed message to the selected conversation, then refresh messages and
    /// conversations. No-op without a selection.
    pub async fn send_message(&self, body: &str) -> Result<(), SessionError> {
        let body = body.trim();
        if body.is_empty() {
            return Err(SessionError::EmptyMessage);
        }
        self.guard(&SessionCommand::SendMessage {
            body: body.to_owned(),
        })?;

        let (acting, conversation_id, epoch) = {
            let state = self.lock_state();
            (
                state.acting_user_id(),
                state.selected_conversation_id(),
                state.epoch(),
            )
        };
        let (Some(acting), Some(conversation_id)) = (acting, conversation_id) else {
            return Ok(());
        };

        self.update(|state| {
            state.clear_typing();
            state.begin_action(Scope::Messages);
        });
        match self.inner.api.send_message(acting, conversation_id, body).await {
            Ok(message) => {
                debug!(message_id = message.id, conversation_id, "message sent");
                self.update(|state| state.finish_action(Scope::Messages, epoch, None));
            }
            Err(err) => {
                let err = SessionError::from(err);
                let text = err.scope_text(SEND_FALLBACK);
                self.update(|state| state.finish_action(Scope::Messages, epoch, Some(text)));
                return Err(err);
            }
        }

        if !self.is_current(epoch) {
            return Ok(());
        }
        self.refresh_messages_then_conversations().await
    }

    /// One poll tick: refresh messages, then conversations, unless the user is typing.
    ///
    /// Returns `true` when the refresh ran.
    pub async fn poll_tick(&self) -> Result<bool, SessionError> {
        let now_ms = self.now_ms();
        let (selected, typing) = {
            let state = self.lock_state();
            (state.selected_conversation_id(), state.is_typing(now_ms))
        };
        if selected.is_none() {
            return Ok(false);
        }
        self.inner.events.emit(SessionEvent::PollTick { skipped: typing });
        if typing {
            trace!("poll tick skipped while typing");
            return Ok(false);
        }

        self.refresh_messages_then_conversations().await?;
        Ok(true)
    }

    /// Stop the poller for good. In-flight requests complete and are discarded or
    /// applied as usual, but no flow can start polling again.
    pub fn shutdown(&self) {
        let mut poller = lock(&self.inner.poller);
        self.inner.shut_down.store(true, Ordering::SeqCst);
        if let Some(previous) = poller.take() {
            previous.cancel();
        }
        debug!("session shut down");
    }

    /// Reset-refresh both scopes in order. The conversation refresh runs even when
    /// the message refresh failed; the first error is returned.
    async fn refresh_messages_then_conversations(&self) -> Result<(), SessionError> {
        let messages = self.fetch(Scope::Messages, LoadMode::Reset).await;
        let conversations = self.fetch(Scope::Conversations, LoadMode::Reset).await;
        messages.and(conversations).map(|_| ())
    }

    /// Issue one list fetch and apply it. Returns `Ok(false)` when nothing was applied
    /// (no-op request or superseded response).
    async fn fetch(&self, scope: Scope, mode: LoadMode) -> Result<bool, SessionError> {
        let Some(request) = self.update(|state| state.begin_fetch(scope, mode)) else {
            trace!(?scope, ?mode, "fetch skipped");
            return Ok(false);
        };
        debug!(
            ?scope,
            ?mode,
            conversation_id = request.conversation_id,
            has_cursor = request.cursor.is_some(),
            "fetch issued"
        );

        let api = &self.inner.api;
        let (result, fallback) = match (scope, request.conversation_id) {
            (Scope::Messages, Some(conversation_id)) => (
                api.fetch_messages(
                    request.acting_user_id,
                    conversation_id,
                    request.limit,
                    request.cursor.as_ref(),
                )
                .await
                .map(|page| self.update(|state| state.apply_messages_page(&request.ticket, page))),
                MESSAGES_FALLBACK,
            ),
            _ => (
                api.fetch_conversations(
                    request.acting_user_id,
                    request.limit,
                    request.cursor.as_ref(),
                )
                .await
                .map(|page| {
                    self.update(|state| state.apply_conversations_page(&request.ticket, page))
                }),
                CONVERSATIONS_FALLBACK,
            ),
        };

        match result {
            Ok(applied) => Ok(applied),
            Err(err) => {
                let err = SessionError::from(err);
                let text = err.scope_text(fallback);
                if self.update(|state| state.fail_fetch(&request.ticket, text)) {
                    warn!(?scope, error = %err, "fetch failed");
                    Err(err)
                } else {
                    Ok(false)
                }
            }
        }
    }

    fn guard(&self, command: &SessionCommand) -> Result<(), SessionError> {
        self.ensure_running()?;
        self.lock_state().check(command)
    }

    fn ensure_running(&self) -> Result<(), SessionError> {
        if self.is_shut_down() {
            return Err(SessionError::ShutDown);
        }
        Ok(())
    }

    fn is_current(&self, epoch: u64) -> bool {
        self.lock_state().is_current(epoch)
    }

    /// Replace the poll task: a new one runs only while a conversation is selected.
    fn reschedule_poller(&self) {
        let selected = self.lock_state().selected_conversation_id();
        let mut poller = lock(&self.inner.poller);
        if let Some(previous) = poller.take() {
            previous.cancel();
        }
        if selected.is_some() && !self.is_shut_down() {
            let period = Duration::from_millis(self.inner.config.polling_interval_ms.max(1));
            *poller = Some(spawn_poller(self.downgrade(), period));
        }
    }

    fn now_ms(&self) -> u64 {
        u64::try_from(self.inner.started_at.elapsed().as_millis()).unwrap_or(u64::MAX)
    }

    fn lock_state(&self) -> MutexGuard<'_, SessionState> {
        lock(&self.inner.state)
    }

    /// Mutate state and publish the resulting snapshot.
    fn update<R>(&self, mutate: impl FnOnce(&mut SessionState) -> R) -> R {
        let (result, snapshot) = {
            let mut state = self.lock_state();
            let result = mutate(&mut state);
            (result, state.snapshot())
        };
        trace!(
            conversations = snapshot.conversations.len(),
            messages = snapshot.messages.len(),
            "publishing snapshot"
        );
        self.inner.events.publish_snapshot(snapshot);
        result
    }
}

impl<A: ChatApi> Drop for SessionInner<A> {
    fn drop(&mut self) {
        if let Some(poller) = lock(&self.poller).take() {
            poller.cancel();
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
