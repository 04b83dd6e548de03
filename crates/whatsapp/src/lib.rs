//! WhatsApp Cloud API channel: inbound webhook payload handling and outbound
//! message delivery. Transport details stop here; the agent crate only sees
//! `InboundMessageEvent` and the `MessageSender` seam.

pub mod events;
pub mod outbound;

pub use events::{parse_webhook_payload, InboundMessageEvent, VerificationQuery, WebhookPayload};
pub use outbound::{CloudApiSender, DeliveryId, MessageSender, NoopMessageSender, SendError};
