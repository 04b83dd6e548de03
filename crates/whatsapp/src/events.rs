use serde::Deserialize;
use tracing::debug;

use inmobot_core::domain::profile::SenderId;

/// One inbound chat message as the orchestrator consumes it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InboundMessageEvent {
    pub sender_id: SenderId,
    pub body: String,
    pub message_id: String,
}

/// Webhook subscription handshake query (`GET /webhook`).
#[derive(Clone, Debug, Deserialize)]
pub struct VerificationQuery {
    #[serde(rename = "hub.mode")]
    pub mode: Option<String>,
    #[serde(rename = "hub.verify_token")]
    pub verify_token: Option<String>,
    #[serde(rename = "hub.challenge")]
    pub challenge: Option<String>,
}

impl VerificationQuery {
    /// The challenge to echo back if the handshake matches the configured
    /// token, `None` otherwise.
    pub fn accept(&self, expected_token: &str) -> Option<&str> {
        let subscribe = self.mode.as_deref() == Some("subscribe");
        let token_matches = self.verify_token.as_deref() == Some(expected_token);
        if subscribe && token_matches {
            self.challenge.as_deref()
        } else {
            None
        }
    }
}

// Cloud API webhook envelope. Only text messages matter here; delivery
// statuses and media messages are skipped with a debug trace.

#[derive(Clone, Debug, Deserialize)]
pub struct WebhookPayload {
    #[serde(default)]
    pub object: String,
    #[serde(default)]
    pub entry: Vec<WebhookEntry>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct WebhookEntry {
    #[serde(default)]
    pub changes: Vec<WebhookChange>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct WebhookChange {
    pub value: ChangeValue,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ChangeValue {
    #[serde(default)]
    pub messages: Vec<IncomingMessage>,
    #[serde(default)]
    pub statuses: Vec<serde_json::Value>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct IncomingMessage {
    pub from: String,
    pub id: String,
    #[serde(rename = "type", default)]
    pub message_type: String,
    pub text: Option<TextBody>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct TextBody {
    pub body: String,
}

/// Flattens a webhook payload into the text-message events it carries.
/// Status-only deliveries produce an empty vector.
pub fn parse_webhook_payload(payload: &WebhookPayload) -> Vec<InboundMessageEvent> {
    let mut events = Vec::new();

    for entry in &payload.entry {
        for change in &entry.changes {
            if !change.value.statuses.is_empty() {
                debug!(
                    event_name = "channel.webhook.status_skipped",
                    count = change.value.statuses.len(),
                    "skipping delivery status entries"
                );
            }

            for message in &change.value.messages {
                let Some(text) = &message.text else {
                    debug!(
                        event_name = "channel.webhook.non_text_skipped",
                        message_type = %message.message_type,
                        message_id = %message.id,
                        "skipping non-text message"
                    );
                    continue;
                };
                if text.body.trim().is_empty() {
                    continue;
                }

                events.push(InboundMessageEvent {
                    sender_id: SenderId(message.from.clone()),
                    body: text.body.clone(),
                    message_id: message.id.clone(),
                });
            }
        }
    }

    events
}
