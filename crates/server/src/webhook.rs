use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use inmobot_agent::DialogueOrchestrator;
use inmobot_whatsapp::events::{parse_webhook_payload, VerificationQuery, WebhookPayload};
use tracing::{error, info};

#[derive(Clone)]
pub struct WebhookState {
    pub orchestrator: Arc<DialogueOrchestrator>,
    pub verify_token: String,
}

pub fn router(state: WebhookState) -> Router {
    Router::new()
        .route("/webhook", get(verify).post(receive))
        .with_state(state)
}

/// Subscription handshake. The provider calls this once with the configured
/// verify token and expects the raw challenge echoed back.
async fn verify(
    State(state): State<WebhookState>,
    Query(query): Query<VerificationQuery>,
) -> (StatusCode, String) {
    match query.accept(&state.verify_token) {
        Some(challenge) => {
            info!(event_name = "channel.webhook.verified");
            (StatusCode::OK, challenge.to_string())
        }
        None => {
            info!(event_name = "channel.webhook.verification_rejected");
            (StatusCode::FORBIDDEN, String::new())
        }
    }
}

/// Inbound delivery. Always acknowledges with 200 immediately; anything else
/// makes the provider retry and, eventually, disable the subscription. The
/// actual conversation runs happen on spawned tasks, one per message event.
async fn receive(
    State(state): State<WebhookState>,
    Json(payload): Json<WebhookPayload>,
) -> StatusCode {
    let events = parse_webhook_payload(&payload);
    info!(event_name = "channel.webhook.received", events = events.len());

    for event in events {
        let orchestrator = state.orchestrator.clone();
        tokio::spawn(async move {
            let sender = event.sender_id.0.clone();
            if let Err(err) = orchestrator.handle_inbound(event).await {
                error!(
                    event_name = "channel.webhook.run_failed",
                    sender = %sender,
                    error = %err,
                );
            }
        });
    }

    StatusCode::OK
}
