//! Session state reducer: owns list/cursor/selection state for one client session.
//!
//! The reducer is synchronous. Async flows ask it for a [`FetchRequest`], perform the
//! request, and hand the result back together with the request's [`FetchTicket`]; the
//! reducer drops results whose ticket was superseded in the meantime.

use tracing::{debug, trace};

use crate::{
    error::SessionError,
    paging::{LoadMode, PagedList},
    state_machine::SessionStateMachine,
    typing::TypingGate,
    types::{
        ConversationId, ConversationSummary, ConversationView, Cursor, Message, MessageView,
        Page, Scope, ScopeStatus, SessionCommand, SessionEvent, SessionPhase, SessionSnapshot,
        SyncConfig, User, UserId,
    },
};

/// Identity of one issued fetch; used to discard superseded responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchTicket {
    pub scope: Scope,
    pub mode: LoadMode,
    epoch: u64,
    generation: u64,
}

/// Everything a flow needs to perform one list fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub ticket: FetchTicket,
    pub acting_user_id: UserId,
    /// Set for message fetches.
    pub conversation_id: Option<ConversationId>,
    pub cursor: Option<Cursor>,
    pub limit: u16,
}

/// Mutable session state shared by all flows.
#[derive(Debug, Clone)]
pub struct SessionState {
    machine: SessionStateMachine,
    epoch: u64,
    acting_user_id: Option<UserId>,
    me: Option<User>,
    all_users: Vec<User>,
    conversations: PagedList<ConversationSummary>,
    conversations_generation: u64,
    selected_conversation_id: Option<ConversationId>,
    selection_epoch: u64,
    messages: PagedList<Message>,
    messages_generation: u64,
    left: ScopeStatus,
    right: ScopeStatus,
    typing: TypingGate,
    conversation_page_size: u16,
    message_page_size: u16,
}

impl SessionState {
    pub fn new(config: &SyncConfig) -> Self {
        Self {
            machine: SessionStateMachine::default(),
            epoch: 0,
            acting_user_id: None,
            me: None,
            all_users: Vec::new(),
            conversations: PagedList::default(),
            conversations_generation: 0,
            selected_conversation_id: None,
            selection_epoch: 0,
            messages: PagedList::default(),
            messages_generation: 0,
            left: ScopeStatus::default(),
            right: ScopeStatus::default(),
            typing: TypingGate::new(config.typing_idle_timeout_ms),
            conversation_page_size: PagedList::<ConversationSummary>::bounded_page_limit(
                config.conversation_page_size,
            ),
            message_page_size: PagedList::<Message>::bounded_page_limit(
                config.message_page_size,
            ),
        }
    }

    pub fn phase(&self) -> SessionPhase {
        self.machine.phase()
    }

    pub fn check(&self, command: &SessionCommand) -> Result<(), SessionError> {
        self.machine.check(command)
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// `true` while no user switch happened since `epoch` was captured.
    pub fn is_current(&self, epoch: u64) -> bool {
        self.epoch == epoch
    }

    pub fn acting_user_id(&self) -> Option<UserId> {
        self.acting_user_id
    }

    pub fn me(&self) -> Option<&User> {
        self.me.as_ref()
    }

    pub fn conversations(&self) -> &PagedList<ConversationSummary> {
        &self.conversations
    }

    pub fn messages(&self) -> &PagedList<Message> {
        &self.messages
    }

    pub fn selected_conversation_id(&self) -> Option<ConversationId> {
        self.selected_conversation_id
    }

    pub fn scope_status(&self, scope: Scope) -> &ScopeStatus {
        match scope {
            Scope::Conversations => &self.left,
            Scope::Messages => &self.right,
        }
    }

    /// Derived from the loaded conversation list; absent when not loaded.
    pub fn selected_participant(&self) -> Option<&User> {
        let selected = self.selected_conversation_id?;
        self.conversations
            .find(selected)
            .map(|conversation| &conversation.participant)
    }

    /// Start a user switch: invalidate every outstanding flow and clear per-user state.
    ///
    /// Returns the new epoch and the lifecycle event to publish.
    pub fn begin_user_switch(&mut self, user_id: UserId) -> (u64, SessionEvent) {
        self.epoch += 1;
        self.acting_user_id = Some(user_id);
        self.me = None;
        self.selected_conversation_id = None;
        self.selection_epoch += 1;
        self.conversations.clear();
        self.conversations_generation += 1;
        self.messages.clear();
        self.messages_generation += 1;
        self.left = ScopeStatus {
            loading: true,
            error: None,
        };
        self.right = ScopeStatus::default();
        self.typing.clear();
        debug!(user_id, epoch = self.epoch, "session user switch started");
        (self.epoch, self.machine.begin_init(user_id))
    }

    /// Store profile and directory fetched for `epoch`. Returns `false` when stale.
    pub fn apply_profile(&mut self, epoch: u64, me: User, users: Vec<User>) -> bool {
        if !self.is_current(epoch) {
            trace!(epoch, "dropping stale profile response");
            return false;
        }
        self.me = Some(me);
        self.all_users = users;
        true
    }

    /// Finish initialization for `epoch`; `None` when a newer switch superseded it.
    pub fn finish_init(&mut self, epoch: u64) -> Option<SessionEvent> {
        if !self.is_current(epoch) {
            return None;
        }
        self.left.loading = false;
        let acting_user_id = self.acting_user_id?;
        self.machine.finish_init(acting_user_id).ok()
    }

    /// Select a conversation: message state is cleared and in-flight message fetches
    /// are invalidated. Returns the new selection epoch.
    pub fn select_conversation(&mut self, conversation_id: ConversationId) -> u64 {
        self.selected_conversation_id = Some(conversation_id);
        self.selection_epoch += 1;
        self.messages.clear();
        self.messages_generation += 1;
        self.right.loading = false;
        debug!(
            conversation_id,
            participant_known = self.selected_participant().is_some(),
            "conversation selected"
        );
        self.selection_epoch
    }

    /// Issue a list fetch for `scope`, or `None` when it would be a no-op.
    ///
    /// Clears the scope's previous error and marks it loading.
    pub fn begin_fetch(&mut self, scope: Scope, mode: LoadMode) -> Option<FetchRequest> {
        let acting_user_id = self.acting_user_id?;
        let (cursor, conversation_id, limit) = match scope {
            Scope::Conversations => (
                self.conversations.request_cursor(mode)?,
                None,
                self.conversation_page_size,
            ),
            Scope::Messages => (
                self.messages.request_cursor(mode)?,
                Some(self.selected_conversation_id?),
                self.message_page_size,
            ),
        };

        let generation = match scope {
            Scope::Conversations => {
                self.conversations_generation += 1;
                self.conversations_generation
            }
            Scope::Messages => {
                self.messages_generation += 1;
                self.messages_generation
            }
        };
        let status = self.scope_status_mut(scope);
        status.loading = true;
        status.error = None;

        Some(FetchRequest {
            ticket: FetchTicket {
                scope,
                mode,
                epoch: self.epoch,
                generation,
            },
            acting_user_id,
            conversation_id,
            cursor,
            limit,
        })
    }

    /// `true` when `ticket` is still the newest fetch of its scope.
    pub fn is_ticket_current(&self, ticket: &FetchTicket) -> bool {
        let generation = match ticket.scope {
            Scope::Conversations => self.conversations_generation,
            Scope::Messages => self.messages_generation,
        };
        self.is_current(ticket.epoch) && ticket.generation == generation
    }

    pub fn apply_conversations_page(
        &mut self,
        ticket: &FetchTicket,
        page: Page<ConversationSummary>,
    ) -> bool {
        if ticket.scope != Scope::Conversations || !self.is_ticket_current(ticket) {
            trace!(?ticket, "dropping superseded conversations page");
            return false;
        }
        self.conversations.apply_page(ticket.mode, page);
        self.left.loading = false;
        debug!(
            count = self.conversations.len(),
            has_more = self.conversations.has_more(),
            "conversation list updated"
        );
        true
    }

    pub fn apply_messages_page(&mut self, ticket: &FetchTicket, page: Page<Message>) -> bool {
        if ticket.scope != Scope::Messages || !self.is_ticket_current(ticket) {
            trace!(?ticket, "dropping superseded messages page");
            return false;
        }
        self.messages.apply_page(ticket.mode, page);
        self.right.loading = false;
        debug!(
            count = self.messages.len(),
            has_more = self.messages.has_more(),
            "message list updated"
        );
        true
    }

    /// Record a failed fetch in its scope unless it was superseded.
    pub fn fail_fetch(&mut self, ticket: &FetchTicket, text: String) -> bool {
        if !self.is_ticket_current(ticket) {
            return false;
        }
        let status = self.scope_status_mut(ticket.scope);
        status.loading = false;
        status.error = Some(text);
        true
    }

    /// Start a non-list action (send, create) on `scope`.
    pub fn begin_action(&mut self, scope: Scope) {
        let status = self.scope_status_mut(scope);
        status.loading = true;
        status.error = None;
    }

    /// End a non-list action started in `epoch`; failures land in the scope's slot.
    pub fn finish_action(&mut self, scope: Scope, epoch: u64, error: Option<String>) -> bool {
        if !self.is_current(epoch) {
            return false;
        }
        let status = self.scope_status_mut(scope);
        status.loading = false;
        if error.is_some() {
            status.error = error;
        }
        true
    }

    pub fn on_composer_changed(&mut self, text: &str, now_ms: u64) {
        self.typing.on_input(text, now_ms);
    }

    pub fn clear_typing(&mut self) {
        self.typing.clear();
    }

    pub fn is_typing(&self, now_ms: u64) -> bool {
        self.typing.is_typing(now_ms)
    }

    /// Current immutable snapshot for rendering.
    pub fn snapshot(&self) -> SessionSnapshot {
        let me_id = self.me.as_ref().map(|me| me.id).or(self.acting_user_id);
        let mut users_for_new_chat: Vec<User> = self
            .all_users
            .iter()
            .filter(|user| Some(user.id) != me_id)
            .cloned()
            .collect();
        users_for_new_chat.sort_by_key(|user| user.id);

        let own_id = self.me.as_ref().map(|me| me.id);
        let messages = self
            .messages
            .items()
            .iter()
            .rev()
            .map(|message| MessageView {
                id: message.id,
                sender: message.sender.clone(),
                body: message.body.clone(),
                created_at: message.created_at.clone(),
                is_own: own_id == Some(message.sender.id),
            })
            .collect();

        SessionSnapshot {
            phase: self.phase(),
            acting_user_id: self.acting_user_id,
            me: self.me.clone(),
            all_users: self.all_users.clone(),
            users_for_new_chat,
            conversations: self
                .conversations
                .items()
                .iter()
                .map(|summary| ConversationView {
                    is_selected: Some(summary.id) == self.selected_conversation_id,
                    summary: summary.clone(),
                })
                .collect(),
            conversations_has_more: self.conversations.has_more(),
            selected_conversation_id: self.selected_conversation_id,
            selected_participant: self.selected_participant().cloned(),
            selection_epoch: self.selection_epoch,
            messages,
            messages_has_more: self.messages.has_more(),
            left: self.left.clone(),
            right: self.right.clone(),
            can_send: self.selected_conversation_id.is_some() && !self.right.loading,
        }
    }

    fn scope_status_mut(&mut self, scope: Scope) -> &mut ScopeStatus {
        match scope {
            Scope::Conversations => &mut self.left,
            Scope::Messages => &mut self.right,
        }
    }
}
