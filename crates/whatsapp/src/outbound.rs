use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;
use tracing::info;

use inmobot_core::domain::profile::SenderId;

/// Provider-assigned id for a delivered message. Empty when the provider did
/// not return one.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DeliveryId(pub String);

#[derive(Debug, Error)]
pub enum SendError {
    #[error("outbound request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("provider rejected message: status {status}: {detail}")]
    Rejected { status: u16, detail: String },
}

#[async_trait]
pub trait MessageSender: Send + Sync {
    async fn send_text(&self, to: &SenderId, body: &str) -> Result<DeliveryId, SendError>;
}

/// Sends through the Cloud API `/{phone_number_id}/messages` endpoint.
pub struct CloudApiSender {
    http: reqwest::Client,
    api_base_url: String,
    phone_number_id: String,
    access_token: SecretString,
}

impl CloudApiSender {
    pub fn new(
        api_base_url: impl Into<String>,
        phone_number_id: impl Into<String>,
        access_token: SecretString,
        timeout: Duration,
    ) -> Result<Self, SendError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            api_base_url: api_base_url.into(),
            phone_number_id: phone_number_id.into(),
            access_token,
        })
    }
}

#[derive(Debug, Deserialize)]
struct SendResponse {
    #[serde(default)]
    messages: Vec<SentMessage>,
}

#[derive(Debug, Deserialize)]
struct SentMessage {
    id: String,
}

#[async_trait]
impl MessageSender for CloudApiSender {
    async fn send_text(&self, to: &SenderId, body: &str) -> Result<DeliveryId, SendError> {
        let url = format!("{}/{}/messages", self.api_base_url, self.phone_number_id);
        let response = self
            .http
            .post(&url)
            .bearer_auth(self.access_token.expose_secret())
            .json(&json!({
                "messaging_product": "whatsapp",
                "recipient_type": "individual",
                "to": to.0,
                "type": "text",
                "text": { "body": body },
            }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(SendError::Rejected { status: status.as_u16(), detail });
        }

        let parsed: SendResponse = response.json().await?;
        let delivery_id =
            parsed.messages.into_iter().next().map(|message| message.id).unwrap_or_default();

        info!(
            event_name = "channel.outbound.sent",
            sender_id = %to.0,
            delivery_id = %delivery_id,
            "outbound message delivered"
        );

        Ok(DeliveryId(delivery_id))
    }
}

/// Records nothing and always succeeds; used when running without provider
/// credentials and in tests that only care about orchestration behavior.
#[derive(Default)]
pub struct NoopMessageSender;

#[async_trait]
impl MessageSender for NoopMessageSender {
    async fn send_text(&self, to: &SenderId, _body: &str) -> Result<DeliveryId, SendError> {
        info!(
            event_name = "channel.outbound.noop",
            sender_id = %to.0,
            "noop sender swallowed outbound message"
        );
        Ok(DeliveryId::default())
    }
}
