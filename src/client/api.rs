//! Portal API Client
//!
//! The four backend calls the messaging engine depends on, behind the
//! [`PortalApi`] trait so the engine can run against the real REST backend
//! ([`HttpPortalApi`]) or an in-memory fake in tests.
//!
//! | Call | Endpoint |
//! |------|----------|
//! | `list_contacts` | `GET /contacts?role={role}` |
//! | `fetch_messages` | `GET /messages?pregnancyId={id}&otherUserId={id}` |
//! | `send_message` | `POST /messages` |
//! | `mark_read` | `POST /messages/{id}/read` |
//!
//! User and pregnancy ids are expected to be UUIDs. List responses are
//! decoded entry by entry: an entry that does not fit the model (a non-UUID
//! id, a missing field) is logged and skipped instead of failing the whole
//! list.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::client::config::Config;
use crate::shared::messaging::{
    Contact, ConversationKey, Message, MessageId, Role, SendMessageRequest,
};

/// Failures talking to the portal backend
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ApiError {
    #[error("Not authenticated")]
    NotAuthenticated,
    #[error("Network error: {0}")]
    Network(String),
    #[error("Request failed: {status} - {body}")]
    Status { status: u16, body: String },
    #[error("Failed to parse response: {0}")]
    Decode(String),
}

impl ApiError {
    /// Whether retrying the same call later may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            ApiError::Network(_) => true,
            ApiError::Status { status, .. } => *status >= 500 || *status == 429 || *status == 408,
            ApiError::NotAuthenticated | ApiError::Decode(_) => false,
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ApiError::Decode(err.to_string())
        } else {
            ApiError::Network(err.to_string())
        }
    }
}

/// Backend operations used by the messaging engine.
#[async_trait]
pub trait PortalApi: Send + Sync {
    /// Users of `role` visible to the signed-in user, in directory order.
    async fn list_contacts(&self, role: Role) -> Result<Vec<Contact>, ApiError>;

    /// Full ordered snapshot of one conversation.
    async fn fetch_messages(&self, key: ConversationKey) -> Result<Vec<Message>, ApiError>;

    /// Submit a message; the backend assigns id and timestamp.
    async fn send_message(&self, request: &SendMessageRequest) -> Result<Message, ApiError>;

    /// Acknowledge an inbound message. Idempotent on the server.
    async fn mark_read(&self, id: MessageId) -> Result<(), ApiError>;
}

/// Envelopes some deployments wrap list responses in
#[derive(Deserialize)]
#[serde(untagged)]
enum ListBody<T> {
    Bare(Vec<T>),
    Data { data: Vec<T> },
    Contacts { contacts: Vec<T> },
    Messages { messages: Vec<T> },
}

impl<T> ListBody<T> {
    fn into_vec(self) -> Vec<T> {
        match self {
            ListBody::Bare(items)
            | ListBody::Data { data: items }
            | ListBody::Contacts { contacts: items }
            | ListBody::Messages { messages: items } => items,
        }
    }
}

impl ListBody<Value> {
    /// Decode each entry on its own, skipping the ones that do not fit `T`.
    fn decode_items<T: DeserializeOwned>(self, kind: &'static str) -> Vec<T> {
        let raw = self.into_vec();
        let total = raw.len();
        let items: Vec<T> = raw
            .into_iter()
            .enumerate()
            .filter_map(|(index, entry)| match serde_json::from_value(entry) {
                Ok(item) => Some(item),
                Err(e) => {
                    tracing::warn!(kind, index, error = %e, "skipping undecodable list entry");
                    None
                }
            })
            .collect();
        if items.len() < total {
            tracing::debug!(kind, total, kept = items.len(), "list decoded with skipped entries");
        }
        items
    }
}

/// REST implementation of [`PortalApi`]
#[derive(Debug, Clone)]
pub struct HttpPortalApi {
    config: Config,
    client: Client,
}

impl HttpPortalApi {
    pub fn new(config: Config) -> Result<Self, ApiError> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.request_timeout() {
            builder = builder.timeout(timeout);
        }
        let client = builder.build()?;
        Ok(Self { config, client })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn authorized(&self, request: RequestBuilder) -> Result<RequestBuilder, ApiError> {
        let token = self.config.get_token().ok_or(ApiError::NotAuthenticated)?;
        Ok(request.header("Authorization", format!("Bearer {}", token)))
    }

    async fn check(response: Response) -> Result<Response, ApiError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        if status == StatusCode::UNAUTHORIZED {
            return Err(ApiError::NotAuthenticated);
        }
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| status.to_string());
        Err(ApiError::Status {
            status: status.as_u16(),
            body,
        })
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
        let bytes = Self::check(response).await?.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| ApiError::Decode(e.to_string()))
    }
}

#[async_trait]
impl PortalApi for HttpPortalApi {
    async fn list_contacts(&self, role: Role) -> Result<Vec<Contact>, ApiError> {
        let url = self.config.api_url("/contacts");
        let request = self
            .authorized(self.client.get(&url))?
            .query(&[("role", role.as_query())]);
        let response = request.send().await?;
        let body: ListBody<Value> = Self::decode(response).await?;
        Ok(body.decode_items("contact"))
    }

    async fn fetch_messages(&self, key: ConversationKey) -> Result<Vec<Message>, ApiError> {
        let url = self.config.api_url("/messages");
        let request = self.authorized(self.client.get(&url))?.query(&[
            ("pregnancyId", key.pregnancy_id.to_string()),
            ("otherUserId", key.counterpart_id.to_string()),
        ]);
        let response = request.send().await?;
        let body: ListBody<Value> = Self::decode(response).await?;
        Ok(body.decode_items("message"))
    }

    async fn send_message(&self, request: &SendMessageRequest) -> Result<Message, ApiError> {
        let url = self.config.api_url("/messages");
        tracing::debug!(
            pregnancy_id = %request.pregnancy_id,
            to_user_id = %request.to_user_id,
            "sending message"
        );
        let response = self
            .authorized(self.client.post(&url))?
            .json(request)
            .send()
            .await?;
        Self::decode(response).await
    }

    async fn mark_read(&self, id: MessageId) -> Result<(), ApiError> {
        let url = self.config.api_url(&format!("/messages/{}/read", id));
        let response = self.authorized(self.client.post(&url))?.send().await?;
        Self::check(response).await?;
        Ok(())
    }
}
