//! REST client for the chat server.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use parley_shared::constants::{DEFAULT_API_URL, REQUEST_TIMEOUT_SECS};
use parley_shared::model::{AttachmentRef, Channel, FriendAction, FriendRequest, Message, User};
use parley_shared::types::{ChannelId, FriendRequestId, MessageId, UserId};

use crate::error::ApiError;

/// One page of channel history, oldest message first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HistoryPage {
    pub messages: Vec<Message>,
    /// Cursor for the next older page; `None` when history is exhausted.
    pub next_cursor: Option<String>,
}

/// Body of `POST /messages/{channel}`.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    pub content: String,
    pub reply_to_id: Option<MessageId>,
    pub attachment_url: Option<String>,
}

/// Everything the engine asks of the server over HTTP.
#[async_trait]
pub trait ChatApi: Send + Sync {
    async fn list_channels(&self) -> Result<Vec<Channel>, ApiError>;
    async fn create_direct_channel(&self, user: &UserId) -> Result<Channel, ApiError>;
    async fn create_group_channel(&self, name: &str, members: &[UserId]) -> Result<Channel, ApiError>;

    async fn fetch_history(&self, channel: &ChannelId, cursor: Option<&str>) -> Result<HistoryPage, ApiError>;
    async fn send_message(&self, channel: &ChannelId, body: &SendMessageRequest) -> Result<Message, ApiError>;
    async fn edit_message(&self, id: &MessageId, content: &str) -> Result<Message, ApiError>;
    async fn delete_message(&self, id: &MessageId) -> Result<(), ApiError>;

    async fn list_friends(&self) -> Result<Vec<User>, ApiError>;
    async fn list_pending_requests(&self) -> Result<Vec<FriendRequest>, ApiError>;
    async fn list_blocked(&self) -> Result<Vec<User>, ApiError>;
    async fn send_friend_request(&self, receiver: &UserId) -> Result<(), ApiError>;
    async fn respond_friend_request(&self, request: &FriendRequestId, action: FriendAction) -> Result<(), ApiError>;
    async fn remove_friend(&self, friend: &UserId) -> Result<(), ApiError>;
    async fn block_user(&self, user: &UserId) -> Result<(), ApiError>;
    async fn unblock_user(&self, user: &UserId) -> Result<(), ApiError>;

    async fn upload_file(&self, file_name: &str, bytes: Vec<u8>) -> Result<AttachmentRef, ApiError>;
}

// ---------------------------------------------------------------------------
// reqwest implementation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub base_url: String,
    pub token: String,
    pub timeout: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_URL.to_string(),
            token: String::new(),
            timeout: Duration::from_secs(REQUEST_TIMEOUT_SECS),
        }
    }
}

#[derive(Debug, Clone)]
pub struct HttpChatApi {
    config: ApiConfig,
    client: Client,
}

/// History is served either as a bare array or wrapped with a cursor.
#[derive(Deserialize)]
#[serde(untagged)]
enum HistoryBody {
    Bare(Vec<Message>),
    Paged {
        messages: Vec<Message>,
        #[serde(default, rename = "nextCursor")]
        next_cursor: Option<String>,
    },
}

impl From<HistoryBody> for HistoryPage {
    fn from(body: HistoryBody) -> Self {
        match body {
            HistoryBody::Bare(messages) => HistoryPage {
                messages,
                next_cursor: None,
            },
            HistoryBody::Paged {
                messages,
                next_cursor,
            } => HistoryPage {
                messages,
                next_cursor,
            },
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DirectChannelBody<'a> {
    user_id: &'a UserId,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GroupChannelBody<'a> {
    name: &'a str,
    member_ids: &'a [UserId],
}

#[derive(Serialize)]
struct EditBody<'a> {
    content: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FriendRequestBody<'a> {
    receiver_id: &'a UserId,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RespondBody<'a> {
    request_id: &'a FriendRequestId,
    action: FriendAction,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct BlockBody<'a> {
    user_id: &'a UserId,
}

impl HttpChatApi {
    pub fn new(config: ApiConfig) -> Result<Self, ApiError> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { config, client })
    }

    pub fn set_token(&mut self, token: impl Into<String>) {
        self.config.token = token.into();
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        let token = self.config.token.trim();
        if token.is_empty() {
            request
        } else {
            request.bearer_auth(token)
        }
    }

    async fn send(&self, request: RequestBuilder, what: &'static str) -> Result<Response, ApiError> {
        let resp = self.authorized(request).send().await?;
        let status = resp.status();
        debug!(request = what, status = status.as_u16(), "API response");
        if status.is_success() {
            return Ok(resp);
        }
        let body = resp.text().await.unwrap_or_default();
        Err(ApiError::from_status(status.as_u16(), body))
    }

    async fn json<T: DeserializeOwned>(&self, request: RequestBuilder, what: &'static str) -> Result<T, ApiError> {
        let resp = self.send(request, what).await?;
        let bytes = resp.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

#[async_trait]
impl ChatApi for HttpChatApi {
    async fn list_channels(&self) -> Result<Vec<Channel>, ApiError> {
        self.json(self.client.get(self.url("/channels")), "list channels")
            .await
    }

    async fn create_direct_channel(&self, user: &UserId) -> Result<Channel, ApiError> {
        let request = self
            .client
            .post(self.url("/channels/direct"))
            .json(&DirectChannelBody { user_id: user });
        self.json(request, "create direct channel").await
    }

    async fn create_group_channel(&self, name: &str, members: &[UserId]) -> Result<Channel, ApiError> {
        let request = self
            .client
            .post(self.url("/channels/group"))
            .json(&GroupChannelBody {
                name,
                member_ids: members,
            });
        self.json(request, "create group channel").await
    }

    async fn fetch_history(&self, channel: &ChannelId, cursor: Option<&str>) -> Result<HistoryPage, ApiError> {
        let mut request = self.client.get(self.url(&format!("/messages/{channel}")));
        if let Some(cursor) = cursor {
            request = request.query(&[("cursor", cursor)]);
        }
        let body: HistoryBody = self.json(request, "fetch history").await?;
        Ok(body.into())
    }

    async fn send_message(&self, channel: &ChannelId, body: &SendMessageRequest) -> Result<Message, ApiError> {
        let request = self
            .client
            .post(self.url(&format!("/messages/{channel}")))
            .json(body);
        self.json(request, "send message").await
    }

    async fn edit_message(&self, id: &MessageId, content: &str) -> Result<Message, ApiError> {
        let request = self
            .client
            .put(self.url(&format!("/messages/{id}")))
            .json(&EditBody { content });
        self.json(request, "edit message").await
    }

    async fn delete_message(&self, id: &MessageId) -> Result<(), ApiError> {
        let request = self.client.delete(self.url(&format!("/messages/{id}")));
        self.send(request, "delete message").await?;
        Ok(())
    }

    async fn list_friends(&self) -> Result<Vec<User>, ApiError> {
        self.json(self.client.get(self.url("/friends")), "list friends")
            .await
    }

    async fn list_pending_requests(&self) -> Result<Vec<FriendRequest>, ApiError> {
        self.json(self.client.get(self.url("/friends/pending")), "list pending requests")
            .await
    }

    async fn list_blocked(&self) -> Result<Vec<User>, ApiError> {
        self.json(self.client.get(self.url("/friends/blocked")), "list blocked")
            .await
    }

    async fn send_friend_request(&self, receiver: &UserId) -> Result<(), ApiError> {
        let request = self
            .client
            .post(self.url("/friends/request"))
            .json(&FriendRequestBody { receiver_id: receiver });
        self.send(request, "send friend request").await?;
        Ok(())
    }

    async fn respond_friend_request(&self, request_id: &FriendRequestId, action: FriendAction) -> Result<(), ApiError> {
        let request = self
            .client
            .post(self.url("/friends/respond"))
            .json(&RespondBody {
                request_id,
                action,
            });
        self.send(request, "respond friend request").await?;
        Ok(())
    }

    async fn remove_friend(&self, friend: &UserId) -> Result<(), ApiError> {
        let request = self.client.delete(self.url(&format!("/friends/{friend}")));
        self.send(request, "remove friend").await?;
        Ok(())
    }

    async fn block_user(&self, user: &UserId) -> Result<(), ApiError> {
        let request = self
            .client
            .post(self.url("/friends/block"))
            .json(&BlockBody { user_id: user });
        self.send(request, "block user").await?;
        Ok(())
    }

    async fn unblock_user(&self, user: &UserId) -> Result<(), ApiError> {
        let request = self.client.delete(self.url(&format!("/friends/block/{user}")));
        self.send(request, "unblock user").await?;
        Ok(())
    }

    async fn upload_file(&self, file_name: &str, bytes: Vec<u8>) -> Result<AttachmentRef, ApiError> {
        let size = bytes.len() as u64;
        let part = multipart::Part::bytes(bytes).file_name(file_name.to_string());
        let form = multipart::Form::new().part("file", part);
        let request = self.client.post(self.url("/upload")).multipart(form);
        let mut attachment: AttachmentRef = self.json(request, "upload file").await?;
        if attachment.file_name.is_none() {
            attachment.file_name = Some(file_name.to_string());
        }
        attachment.size.get_or_insert(size);
        Ok(attachment)
    }
}
