use std::time::Duration;

use minichat_core::{
    ChatApi, ConversationId, ConversationSummary, Cursor, Message, Page, RequestError, User,
    UserId, encode_cursor, normalize_error_response,
};
use reqwest::{
    Method,
    header::{CACHE_CONTROL, CONTENT_TYPE},
};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use tracing::debug;
use url::Url;

/// Header carrying the acting user id on every request.
pub const USER_ID_HEADER: &str = "x-user-id";

#[derive(Deserialize)]
struct UserEnvelope {
    user: User,
}

#[derive(Deserialize)]
struct ItemsEnvelope<T> {
    items: Vec<T>,
}

#[derive(Deserialize)]
struct ConversationEnvelope {
    conversation: ConversationSummary,
}

#[derive(Deserialize)]
struct MessageEnvelope {
    message: Message,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateConversationBody {
    participant_id: UserId,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SendMessageBody<'a> {
    conversation_id: ConversationId,
    body: &'a str,
}

/// `ChatApi` over the backend's JSON HTTP interface.
#[derive(Debug, Clone)]
pub struct HttpChatApi {
    client: reqwest::Client,
    api_base: String,
}

impl HttpChatApi {
    /// Build a client for `{base_url}/api`, with an optional per-request timeout.
    pub fn new(base_url: &Url, request_timeout: Option<Duration>) -> Result<Self, RequestError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = request_timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|err| RequestError::transport(format!("failed to build http client: {err}")))?;

        Ok(Self {
            client,
            api_base: format!("{}/api", base_url.as_str().trim_end_matches('/')),
        })
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        acting: UserId,
        body: Option<serde_json::Value>,
    ) -> Result<T, RequestError> {
        let url = format!("{}{path}", self.api_base);
        let mut request = self
            .client
            .request(method.clone(), &url)
            .header(USER_ID_HEADER, acting.to_string())
            .header(CONTENT_TYPE, "application/json")
            .header(CACHE_CONTROL, "no-store");
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request.send().await.map_err(map_transport_error)?;
        let status = response.status().as_u16();
        let bytes = response.bytes().await.map_err(map_transport_error)?;
        debug!(%method, path, status, acting, "api request finished");

        if !(200..300).contains(&status) {
            return Err(normalize_error_response(status, &bytes));
        }

        serde_json::from_slice::<T>(&bytes).map_err(|err| {
            RequestError::decode(Some(status), format!("invalid response body: {err}"))
        })
    }
}

impl ChatApi for HttpChatApi {
    async fn fetch_current_user(&self, acting: UserId) -> Result<User, RequestError> {
        let envelope: UserEnvelope = self
            .request(Method::GET, "/users/me", acting, None)
            .await?;
        Ok(envelope.user)
    }

    async fn fetch_users(
        &self,
        acting: UserId,
        include_self: bool,
    ) -> Result<Vec<User>, RequestError> {
        let path = if include_self {
            "/users?includeMe=1"
        } else {
            "/users"
        };
        let envelope: ItemsEnvelope<User> = self.request(Method::GET, path, acting, None).await?;
        Ok(envelope.items)
    }

    async fn fetch_conversations(
        &self,
        acting: UserId,
        limit: u16,
        cursor: Option<&Cursor>,
    ) -> Result<Page<ConversationSummary>, RequestError> {
        let path = format!("/conversations{}", page_query(limit, cursor));
        self.request(Method::GET, &path, acting, None).await
    }

    async fn create_conversation(
        &self,
        acting: UserId,
        participant_id: UserId,
    ) -> Result<ConversationSummary, RequestError> {
        let body = to_body(&CreateConversationBody { participant_id })?;
        let envelope: ConversationEnvelope = self
            .request(Method::POST, "/conversations", acting, Some(body))
            .await?;
        Ok(envelope.conversation)
    }

    async fn fetch_messages(
        &self,
        acting: UserId,
        conversation_id: ConversationId,
        limit: u16,
        cursor: Option<&Cursor>,
    ) -> Result<Page<Message>, RequestError> {
        let path = format!(
            "/conversations/{conversation_id}/messages{}",
            page_query(limit, cursor)
        );
        self.request(Method::GET, &path, acting, None).await
    }

    async fn send_message(
        &self,
        acting: UserId,
        conversation_id: ConversationId,
        body: &str,
    ) -> Result<Message, RequestError> {
        let body = to_body(&SendMessageBody {
            conversation_id,
            body,
        })?;
        let envelope: MessageEnvelope = self
            .request(Method::POST, "/messages", acting, Some(body))
            .await?;
        Ok(envelope.message)
    }
}

/// `?limit=N` followed by the encoded cursor, if any.
fn page_query(limit: u16, cursor: Option<&Cursor>) -> String {
    format!("?limit={limit}{}", encode_cursor(cursor))
}

fn to_body<T: Serialize>(value: &T) -> Result<serde_json::Value, RequestError> {
    serde_json::to_value(value)
        .map_err(|err| RequestError::decode(None, format!("failed to encode request body: {err}")))
}

fn map_transport_error(err: reqwest::Error) -> RequestError {
    if err.is_timeout() {
        RequestError::transport("Request timed out")
    } else {
        RequestError::transport(format!("Network error: {err}"))
    }
}
