use serde::{Deserialize, Serialize};

/// Numeric user identifier (always `> 0` for real users).
pub type UserId = i64;
/// Numeric conversation identifier.
pub type ConversationId = i64;
/// Numeric message identifier.
pub type MessageId = i64;

/// Chat user as returned by the backend.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub name: String,
}

/// Opaque pagination boundary returned by list endpoints.
///
/// `cursor_at` is kept as the exact string the server sent so re-encoding is lossless.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Cursor {
    /// ISO-8601 timestamp of the last item in the page.
    pub cursor_at: String,
    /// Id of the last item in the page (tie breaker for equal timestamps).
    pub cursor_id: i64,
}

/// One page of a cursor-paginated list.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    #[serde(default)]
    pub next_cursor: Option<Cursor>,
    pub has_more: bool,
}

/// Preview of the newest message inside a conversation summary.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LastMessage {
    pub id: MessageId,
    pub body: String,
    pub sender_id: UserId,
    pub created_at: String,
}

/// Conversation row for the left-hand list.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ConversationSummary {
    pub id: ConversationId,
    /// The other side of the conversation.
    pub participant: User,
    #[serde(default)]
    pub last_message: Option<LastMessage>,
    #[serde(default)]
    pub last_message_at: Option<String>,
    pub updated_at: String,
}

/// Immutable chat message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: MessageId,
    pub conversation_id: ConversationId,
    pub sender: User,
    pub body: String,
    pub created_at: String,
}

/// Items with a stable identity key.
pub trait Identified {
    fn identity(&self) -> i64;
}

impl Identified for ConversationSummary {
    fn identity(&self) -> i64 {
        self.id
    }
}

impl Identified for Message {
    fn identity(&self) -> i64 {
        self.id
    }
}

/// Session lifecycle reported to presentation layers.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum SessionPhase {
    /// No acting user has been chosen yet.
    Uninitialized,
    /// Profile, directory and first conversation page are loading for this user.
    Initializing { acting_user_id: UserId },
    /// Initialization finished (successfully or with a scoped error).
    Ready,
}

/// The two independent list scopes of the session.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Scope {
    /// Conversation list, profile and conversation creation ("left" panel).
    Conversations,
    /// Message list and sending ("right" panel).
    Messages,
}

/// Loading/error slot owned by one scope.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScopeStatus {
    pub loading: bool,
    pub error: Option<String>,
}

/// Runtime tuning for the synchronization core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncConfig {
    /// Period between poll ticks.
    pub polling_interval_ms: u64,
    /// Page size used for the conversation list.
    pub conversation_page_size: u16,
    /// Page size used for the message list.
    pub message_page_size: u16,
    /// Idle time after the last composer change before typing suppression lifts.
    pub typing_idle_timeout_ms: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            polling_interval_ms: 2_000,
            conversation_page_size: 20,
            message_page_size: 30,
            typing_idle_timeout_ms: 1_000,
        }
    }
}

/// Command channel input accepted by the session runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCommand {
    /// Switch the acting user and reload everything for them.
    SwitchUser { user_id: UserId },
    /// Select a conversation and load its newest messages.
    SelectConversation { conversation_id: ConversationId },
    /// Create a conversation with another user and select it.
    CreateConversation { participant_id: UserId },
    /// Append the next page of conversations.
    LoadMoreConversations,
    /// Append the next (older) page of messages.
    LoadOlderMessages,
    /// Composer text changed.
    ComposerChanged { text: String },
    /// Send a message to the selected conversation.
    SendMessage { body: String },
    /// Stop the poller and the command loop.
    Shutdown,
}

/// Message row in display (oldest first) order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageView {
    pub id: MessageId,
    pub sender: User,
    pub body: String,
    pub created_at: String,
    /// Sent by the acting user.
    pub is_own: bool,
}

/// Conversation row with selection marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationView {
    pub summary: ConversationSummary,
    pub is_selected: bool,
}

/// Full immutable view of the session published after every state change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub phase: SessionPhase,
    pub acting_user_id: Option<UserId>,
    pub me: Option<User>,
    pub all_users: Vec<User>,
    pub users_for_new_chat: Vec<User>,
    pub conversations: Vec<ConversationView>,
    pub conversations_has_more: bool,
    pub selected_conversation_id: Option<ConversationId>,
    pub selected_participant: Option<User>,
    /// Bumped whenever the selection changes, so views can reset scroll tracking.
    pub selection_epoch: u64,
    pub messages: Vec<MessageView>,
    pub messages_has_more: bool,
    pub left: ScopeStatus,
    pub right: ScopeStatus,
    pub can_send: bool,
}

/// Event channel output emitted by the session runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// Lifecycle transition.
    PhaseChanged { phase: SessionPhase },
    /// Fresh snapshot after a state mutation.
    Snapshot(Box<SessionSnapshot>),
    /// A poll tick fired.
    PollTick {
        /// `true` when typing suppression skipped the refresh.
        skipped: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_conversation_page_wire_shape() {
        let raw = r#"{
            "items": [{
                "id": 7,
                "participant": {"id": 2, "name": "Bob"},
                "lastMessage": {
                    "id": 3, "body": "yo", "senderId": 2, "createdAt": "2024-01-01T00:00:03Z"
                },
                "lastMessageAt": "2024-01-01T00:00:03Z",
                "updatedAt": "2024-01-01T00:00:03Z"
            }],
            "nextCursor": {"cursorAt": "2024-01-01T00:00:03Z", "cursorId": 7},
            "hasMore": true
        }"#;

        let page: Page<ConversationSummary> =
            serde_json::from_str(raw).expect("page should decode");
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].participant.name, "Bob");
        assert_eq!(
            page.items[0].last_message.as_ref().map(|m| m.sender_id),
            Some(2)
        );
        assert_eq!(
            page.next_cursor,
            Some(Cursor {
                cursor_at: "2024-01-01T00:00:03Z".into(),
                cursor_id: 7,
            })
        );
        assert!(page.has_more);
    }

    #[test]
    fn null_cursor_and_empty_conversation_decode_as_absent() {
        let raw = r#"{
            "items": [{
                "id": 1,
                "participant": {"id": 2, "name": "Bob"},
                "lastMessage": null,
                "lastMessageAt": null,
                "updatedAt": "2024-01-01T00:00:00Z"
            }],
            "nextCursor": null,
            "hasMore": false
        }"#;

        let page: Page<ConversationSummary> =
            serde_json::from_str(raw).expect("page should decode");
        assert_eq!(page.next_cursor, None);
        assert_eq!(page.items[0].last_message, None);
        assert_eq!(page.items[0].last_message_at, None);
    }

    #[test]
    fn sync_config_defaults_follow_ui_page_sizes() {
        let cfg = SyncConfig::default();
        assert_eq!(cfg.polling_interval_ms, 2_000);
        assert_eq!(cfg.conversation_page_size, 20);
        assert_eq!(cfg.message_page_size, 30);
        assert_eq!(cfg.typing_idle_timeout_ms, 1_000);
    }
}
