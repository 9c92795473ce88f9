use std::future::Future;

use crate::{
    error::RequestError,
    types::{ConversationId, ConversationSummary, Cursor, Message, Page, User, UserId},
};

/// Backend operations used by the session, one per HTTP capability.
///
/// Every call is made on behalf of `acting`, the acting user id. Implementations never
/// retry; every failure is reported as a [`RequestError`].
pub trait ChatApi: Send + Sync + 'static {
    fn fetch_current_user(
        &self,
        acting: UserId,
    ) -> impl Future<Output = Result<User, RequestError>> + Send;

    /// Full user directory; `include_self` keeps the acting user in the result.
    fn fetch_users(
        &self,
        acting: UserId,
        include_self: bool,
    ) -> impl Future<Output = Result<Vec<User>, RequestError>> + Send;

    fn fetch_conversations(
        &self,
        acting: UserId,
        limit: u16,
        cursor: Option<&Cursor>,
    ) -> impl Future<Output = Result<Page<ConversationSummary>, RequestError>> + Send;

    /// Not idempotent: calling twice may create two conversations.
    fn create_conversation(
        &self,
        acting: UserId,
        participant_id: UserId,
    ) -> impl Future<Output = Result<ConversationSummary, RequestError>> + Send;

    /// Messages newest first.
    fn fetch_messages(
        &self,
        acting: UserId,
        conversation_id: ConversationId,
        limit: u16,
        cursor: Option<&Cursor>,
    ) -> impl Future<Output = Result<Page<Message>, RequestError>> + Send;

    fn send_message(
        &self,
        acting: UserId,
        conversation_id: ConversationId,
        body: &str,
    ) -> impl Future<Output = Result<Message, RequestError>> + Send;
}
