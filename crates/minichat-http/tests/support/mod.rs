#![allow(dead_code)]

use std::{
    collections::{HashMap, VecDeque},
    sync::{Arc, Mutex},
    time::Duration,
};

use minichat_core::{
    ChatApi, ConversationId, ConversationSummary, Cursor, LastMessage, Message, Page,
    RequestError, User, UserId,
};

/// Operation names used for call counting and failure injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    CurrentUser,
    Users,
    Conversations,
    CreateConversation,
    Messages,
    SendMessage,
}

/// One recorded API call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    CurrentUser {
        acting: UserId,
    },
    Users {
        acting: UserId,
        include_self: bool,
    },
    Conversations {
        acting: UserId,
        limit: u16,
        cursor: Option<Cursor>,
    },
    CreateConversation {
        acting: UserId,
        participant_id: UserId,
    },
    Messages {
        acting: UserId,
        conversation_id: ConversationId,
        limit: u16,
        cursor: Option<Cursor>,
    },
    SendMessage {
        acting: UserId,
        conversation_id: ConversationId,
        body: String,
    },
}

impl Call {
    pub fn op(&self) -> Op {
        match self {
            Call::CurrentUser { .. } => Op::CurrentUser,
            Call::Users { .. } => Op::Users,
            Call::Conversations { .. } => Op::Conversations,
            Call::CreateConversation { .. } => Op::CreateConversation,
            Call::Messages { .. } => Op::Messages,
            Call::SendMessage { .. } => Op::SendMessage,
        }
    }
}

#[derive(Debug, Clone)]
struct StoredConversation {
    id: ConversationId,
    members: (UserId, UserId),
    updated_at: String,
}

#[derive(Default)]
struct Backend {
    users: Vec<User>,
    conversations: Vec<StoredConversation>,
    messages: Vec<Message>,
    clock: u32,
    next_conversation_id: ConversationId,
    next_message_id: i64,
    calls: Vec<Call>,
    failures: HashMap<Op, VecDeque<RequestError>>,
    message_delays: HashMap<ConversationId, Duration>,
    profile_delays: HashMap<UserId, Duration>,
}

impl Backend {
    fn tick(&mut self) -> String {
        self.clock += 1;
        format!(
            "2024-01-01T{:02}:{:02}:{:02}Z",
            self.clock / 3600,
            (self.clock / 60) % 60,
            self.clock % 60
        )
    }

    fn user(&self, id: UserId) -> Result<User, RequestError> {
        self.users
            .iter()
            .find(|user| user.id == id)
            .cloned()
            .ok_or_else(|| RequestError::status(404, "User not found"))
    }

    fn take_failure(&mut self, op: Op) -> Result<(), RequestError> {
        match self.failures.get_mut(&op).and_then(VecDeque::pop_front) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn summary(
        &self,
        conversation: &StoredConversation,
        acting: UserId,
    ) -> Result<ConversationSummary, RequestError> {
        let other = if conversation.members.0 == acting {
            conversation.members.1
        } else {
            conversation.members.0
        };
        let last = self
            .messages
            .iter()
            .filter(|message| message.conversation_id == conversation.id)
            .max_by(|a, b| (&a.created_at, a.id).cmp(&(&b.created_at, b.id)));
        Ok(ConversationSummary {
            id: conversation.id,
            participant: self.user(other)?,
            last_message: last.map(|message| LastMessage {
                id: message.id,
                body: message.body.clone(),
                sender_id: message.sender.id,
                created_at: message.created_at.clone(),
            }),
            last_message_at: last.map(|message| message.created_at.clone()),
            updated_at: conversation.updated_at.clone(),
        })
    }
}

/// Newest-first keyset page over `(timestamp, id)` keys.
fn paginate<T: Clone>(
    mut rows: Vec<(String, i64, T)>,
    limit: u16,
    cursor: Option<&Cursor>,
) -> Page<T> {
    rows.sort_by(|a, b| (&b.0, b.1).cmp(&(&a.0, a.1)));
    let after: Vec<(String, i64, T)> = rows
        .into_iter()
        .filter(|(at, id, _)| match cursor {
            Some(cursor) => (at.as_str(), *id) < (cursor.cursor_at.as_str(), cursor.cursor_id),
            None => true,
        })
        .collect();
    let limit = usize::from(limit);
    let has_more = after.len() > limit;
    let page: Vec<(String, i64, T)> = after.into_iter().take(limit).collect();
    let next_cursor = page.last().map(|(at, id, _)| Cursor {
        cursor_at: at.clone(),
        cursor_id: *id,
    });
    Page {
        items: page.into_iter().map(|(_, _, item)| item).collect(),
        next_cursor,
        has_more,
    }
}

/// In-memory backend implementing the chat API contract.
#[derive(Clone, Default)]
pub struct FakeChatApi {
    backend: Arc<Mutex<Backend>>,
}

impl FakeChatApi {
    pub fn with_users(names: &[&str]) -> Self {
        let api = Self::default();
        {
            let mut backend = api.lock();
            backend.next_conversation_id = 1;
            backend.next_message_id = 1;
            backend.users = names
                .iter()
                .enumerate()
                .map(|(index, name)| User {
                    id: index as UserId + 1,
                    name: (*name).to_owned(),
                })
                .collect();
        }
        api
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Backend> {
        self.backend.lock().expect("fake backend lock")
    }

    pub fn add_conversation(&self, a: UserId, b: UserId) -> ConversationId {
        let mut backend = self.lock();
        let id = backend.next_conversation_id;
        backend.next_conversation_id += 1;
        let updated_at = backend.tick();
        backend.conversations.push(StoredConversation {
            id,
            members: (a, b),
            updated_at,
        });
        id
    }

    pub fn add_message(&self, conversation_id: ConversationId, sender: UserId, body: &str) -> i64 {
        let mut backend = self.lock();
        let sender = backend.user(sender).expect("sender should exist");
        let id = backend.next_message_id;
        backend.next_message_id += 1;
        let created_at = backend.tick();
        if let Some(conversation) = backend
            .conversations
            .iter_mut()
            .find(|conversation| conversation.id == conversation_id)
        {
            conversation.updated_at = created_at.clone();
        }
        backend.messages.push(Message {
            id,
            conversation_id,
            sender,
            body: body.to_owned(),
            created_at,
        });
        id
    }

    pub fn fail_next(&self, op: Op, error: RequestError) {
        self.lock().failures.entry(op).or_default().push_back(error);
    }

    pub fn delay_messages(&self, conversation_id: ConversationId, delay: Duration) {
        self.lock().message_delays.insert(conversation_id, delay);
    }

    pub fn delay_current_user(&self, acting: UserId, delay: Duration) {
        self.lock().profile_delays.insert(acting, delay);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.lock().calls.clone()
    }

    pub fn count(&self, op: Op) -> usize {
        self.lock().calls.iter().filter(|call| call.op() == op).count()
    }

    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    fn record(&self, call: Call) -> Result<(), RequestError> {
        let mut backend = self.lock();
        let op = call.op();
        backend.calls.push(call);
        backend.take_failure(op)
    }
}

impl ChatApi for FakeChatApi {
    async fn fetch_current_user(&self, acting: UserId) -> Result<User, RequestError> {
        let recorded = self.record(Call::CurrentUser { acting });
        let delay = self.lock().profile_delays.get(&acting).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        recorded?;
        self.lock().user(acting)
    }

    async fn fetch_users(
        &self,
        acting: UserId,
        include_self: bool,
    ) -> Result<Vec<User>, RequestError> {
        self.record(Call::Users {
            acting,
            include_self,
        })?;
        Ok(self
            .lock()
            .users
            .iter()
            .filter(|user| include_self || user.id != acting)
            .cloned()
            .collect())
    }

    async fn fetch_conversations(
        &self,
        acting: UserId,
        limit: u16,
        cursor: Option<&Cursor>,
    ) -> Result<Page<ConversationSummary>, RequestError> {
        self.record(Call::Conversations {
            acting,
            limit,
            cursor: cursor.cloned(),
        })?;
        let backend = self.lock();
        let mut rows = Vec::new();
        for conversation in &backend.conversations {
            if conversation.members.0 == acting || conversation.members.1 == acting {
                rows.push((
                    conversation.updated_at.clone(),
                    conversation.id,
                    backend.summary(conversation, acting)?,
                ));
            }
        }
        Ok(paginate(rows, limit, cursor))
    }

    async fn create_conversation(
        &self,
        acting: UserId,
        participant_id: UserId,
    ) -> Result<ConversationSummary, RequestError> {
        self.record(Call::CreateConversation {
            acting,
            participant_id,
        })?;
        self.lock().user(participant_id)?;
        let id = self.add_conversation(acting, participant_id);
        let backend = self.lock();
        let stored = backend
            .conversations
            .iter()
            .find(|conversation| conversation.id == id)
            .cloned()
            .ok_or_else(|| RequestError::status(500, "lost conversation"))?;
        backend.summary(&stored, acting)
    }

    async fn fetch_messages(
        &self,
        acting: UserId,
        conversation_id: ConversationId,
        limit: u16,
        cursor: Option<&Cursor>,
    ) -> Result<Page<Message>, RequestError> {
        self.record(Call::Messages {
            acting,
            conversation_id,
            limit,
            cursor: cursor.cloned(),
        })?;
        let delay = self.lock().message_delays.get(&conversation_id).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let backend = self.lock();
        let rows = backend
            .messages
            .iter()
            .filter(|message| message.conversation_id == conversation_id)
            .map(|message| (message.created_at.clone(), message.id, message.clone()))
            .collect();
        Ok(paginate(rows, limit, cursor))
    }

    async fn send_message(
        &self,
        acting: UserId,
        conversation_id: ConversationId,
        body: &str,
    ) -> Result<Message, RequestError> {
        self.record(Call::SendMessage {
            acting,
            conversation_id,
            body: body.to_owned(),
        })?;
        let id = self.add_message(conversation_id, acting, body);
        self.lock()
            .messages
            .iter()
            .find(|message| message.id == id)
            .cloned()
            .ok_or_else(|| RequestError::status(500, "lost message"))
    }
}
