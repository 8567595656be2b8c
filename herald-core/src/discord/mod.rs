//! Outbound Discord messaging.
//!
//! The dispatcher talks to Discord through the [`Messenger`] trait: create a
//! message or edit a previously sent one, either way getting the resulting
//! message id back. [`DiscordClient`] is the REST implementation.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

/// A fully built notification message for one delivery setting.
///
/// `content` already includes the mention suffix when a role is set;
/// `mention_role` additionally scopes the allowed-mentions restriction so
/// nothing but that single role can ping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    pub content: String,
    pub mention_role: Option<i64>,
}

/// Errors that can occur during message delivery.
#[derive(Debug, Error)]
pub enum SendError {
    /// HTTP request error
    #[error("HTTP request error: {0}")]
    Request(#[from] reqwest::Error),

    /// Delivery failed (non-2xx status)
    #[error("message delivery failed with status {status}: {body}")]
    Delivery { status: u16, body: String },

    /// The API responded without a usable message id
    #[error("malformed message response: {0}")]
    MalformedResponse(String),
}

/// Message transport seam.
#[async_trait]
pub trait Messenger: Send + Sync {
    /// Create a message in `channel_id`, returning the new message id.
    async fn send(&self, channel_id: i64, message: &OutboundMessage) -> Result<i64, SendError>;

    /// Edit an existing message in place, returning its id.
    async fn edit(
        &self,
        channel_id: i64,
        message_id: i64,
        message: &OutboundMessage,
    ) -> Result<i64, SendError>;
}

/// Discord REST API implementation of [`Messenger`].
pub struct DiscordClient {
    api_base: Url,
    token: String,
    http_client: reqwest::Client,
}

impl DiscordClient {
    pub fn new(api_base: Url, token: String) -> Self {
        Self {
            api_base,
            token,
            http_client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(30))
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
        }
    }

    fn channel_messages_url(&self, channel_id: i64) -> String {
        format!(
            "{}/channels/{}/messages",
            self.api_base.as_str().trim_end_matches('/'),
            channel_id
        )
    }

    async fn execute(&self, request: reqwest::RequestBuilder) -> Result<i64, SendError> {
        let response = request
            .header(reqwest::header::AUTHORIZATION, format!("Bot {}", self.token))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SendError::Delivery {
                status: status.as_u16(),
                body,
            });
        }

        let message: MessageResponse = response.json().await?;
        message
            .id
            .parse()
            .map_err(|_| SendError::MalformedResponse(message.id))
    }
}

#[async_trait]
impl Messenger for DiscordClient {
    async fn send(&self, channel_id: i64, message: &OutboundMessage) -> Result<i64, SendError> {
        let payload = MessagePayload::from(message);
        self.execute(
            self.http_client
                .post(self.channel_messages_url(channel_id))
                .json(&payload),
        )
        .await
    }

    async fn edit(
        &self,
        channel_id: i64,
        message_id: i64,
        message: &OutboundMessage,
    ) -> Result<i64, SendError> {
        let payload = MessagePayload::from(message);
        self.execute(
            self.http_client
                .patch(format!(
                    "{}/{}",
                    self.channel_messages_url(channel_id),
                    message_id
                ))
                .json(&payload),
        )
        .await
    }
}

// Wire types for the messages endpoint.

#[derive(Debug, Serialize)]
struct MessagePayload<'a> {
    content: &'a str,
    allowed_mentions: AllowedMentions,
}

#[derive(Debug, Serialize)]
struct AllowedMentions {
    parse: Vec<String>,
    roles: Vec<String>,
}

impl<'a> From<&'a OutboundMessage> for MessagePayload<'a> {
    fn from(message: &'a OutboundMessage) -> Self {
        Self {
            content: &message.content,
            allowed_mentions: AllowedMentions {
                // An empty parse list disables everyone/here and any mention
                // not explicitly listed in roles.
                parse: Vec::new(),
                roles: message
                    .mention_role
                    .iter()
                    .map(|role| role.to_string())
                    .collect(),
            },
        }
    }
}

#[derive(Debug, Deserialize)]
struct MessageResponse {
    id: String,
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use serde_json::json;

    #[test]
    fn payload_scopes_mentions_to_the_single_role() {
        let message = OutboundMessage {
            content: "A Helltide surges through scosglen!\n<@&42>".to_string(),
            mention_role: Some(42),
        };
        let payload = serde_json::to_value(MessagePayload::from(&message)).unwrap();

        assert_eq!(
            payload,
            json!({
                "content": "A Helltide surges through scosglen!\n<@&42>",
                "allowed_mentions": { "parse": [], "roles": ["42"] }
            })
        );
    }

    #[test]
    fn payload_without_role_allows_no_mentions() {
        let message = OutboundMessage {
            content: "plain notice".to_string(),
            mention_role: None,
        };
        let payload = serde_json::to_value(MessagePayload::from(&message)).unwrap();

        assert_eq!(payload["allowed_mentions"]["roles"], json!([]));
    }
}
