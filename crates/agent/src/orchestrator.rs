use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use inmobot_core::domain::message::Message;
use inmobot_core::domain::profile::Profile;
use inmobot_db::{ProfileStore, RepositoryError};
use inmobot_whatsapp::events::InboundMessageEvent;
use inmobot_whatsapp::outbound::{MessageSender, SendError};
use tracing::{debug, info, warn};

use crate::extract::{normalize_text, EntityExtractor};
use crate::history::build_history;
use crate::llm::{ContentBlock, ModelClient, ModelError, ModelRequest, Role, Turn};
use crate::merge::merge;
use crate::prompt::render_system_prompt;
use crate::tools::{ToolContext, ToolOutcome, ToolRegistry};

// Greeting-only messages get a canned welcome without spending a model call.
const GREETINGS: &[&str] = &[
    "hola",
    "hola!",
    "buenas",
    "buenos dias",
    "buenas tardes",
    "buenas noches",
    "que tal",
    "saludos",
    "hey",
];

const GREETING_REPLIES: &[&str] = &[
    "¡Hola! Soy el asistente de Inmobiliaria del Valle. ¿Qué tipo de propiedad está buscando?",
    "¡Hola, qué gusto saludarle! ¿Busca casa, departamento o terreno?",
    "¡Buen día! Con gusto le ayudo a encontrar propiedad. ¿Qué anda buscando y en qué zona?",
];

// Canned replies for when the model path is unavailable. Which one goes out
// depends on how much of the search profile is already known.
const FALLBACK_KNOWN_SEARCH: &str =
    "Gracias por la información. En un momento le comparto opciones que se ajustan a lo \
     que busca. ¿Hay algo más que deba tomar en cuenta?";
const FALLBACK_NEED_DETAILS: &str =
    "Gracias por escribir. Para ayudarle mejor, ¿me cuenta qué tipo de propiedad busca \
     y en qué zona?";

#[derive(Debug, thiserror::Error)]
pub enum OrchestratorError {
    #[error(transparent)]
    Store(#[from] RepositoryError),
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error(transparent)]
    Send(#[from] SendError),
}

#[derive(Clone, Debug)]
pub struct OrchestratorConfig {
    pub history_limit: usize,
    pub max_tool_iterations: usize,
    pub tool_timeout_secs: u64,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self { history_limit: 10, max_tool_iterations: 6, tool_timeout_secs: 15 }
    }
}

/// Drives one conversation run per inbound message: profile load, lexical
/// extraction, the model tool loop, and exactly one outbound reply.
///
/// Runs for the same sender are serialized through a per-sender mutex so
/// concurrent webhook deliveries cannot interleave profile writes. Runs for
/// different senders proceed in parallel.
pub struct DialogueOrchestrator {
    store: Arc<dyn ProfileStore>,
    model: Arc<dyn ModelClient>,
    sender: Arc<dyn MessageSender>,
    tools: ToolRegistry,
    extractor: EntityExtractor,
    config: OrchestratorConfig,
    sender_locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl DialogueOrchestrator {
    pub fn new(
        store: Arc<dyn ProfileStore>,
        model: Arc<dyn ModelClient>,
        sender: Arc<dyn MessageSender>,
        tools: ToolRegistry,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            store,
            model,
            sender,
            tools,
            extractor: EntityExtractor::new(),
            config,
            sender_locks: Mutex::new(HashMap::new()),
        }
    }

    fn sender_lock(&self, sender_id: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.sender_locks.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        locks.entry(sender_id.to_string()).or_default().clone()
    }

    fn release_sender_lock(&self, sender_id: &str, lock: Arc<tokio::sync::Mutex<()>>) {
        let mut locks = self.sender_locks.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        drop(lock);
        // New clones are only handed out under the map lock, so a strong
        // count of one means nobody else is waiting and the entry can go.
        if locks.get(sender_id).is_some_and(|entry| Arc::strong_count(entry) == 1) {
            locks.remove(sender_id);
        }
    }

    /// Entry point for one inbound message. Always attempts to produce exactly
    /// one reply; a store outage downgrades the run to stateless operation
    /// instead of silencing the conversation.
    pub async fn handle_inbound(
        &self,
        event: InboundMessageEvent,
    ) -> Result<(), OrchestratorError> {
        let sender_key = event.sender_id.0.clone();
        let lock = self.sender_lock(&sender_key);
        let result = {
            let _guard = lock.lock().await;
            self.run_locked(event).await
        };
        self.release_sender_lock(&sender_key, lock);
        result
    }

    async fn run_locked(&self, event: InboundMessageEvent) -> Result<(), OrchestratorError> {
        // Webhook providers redeliver on slow acknowledgements; a message id
        // already in the log means this run already happened.
        match self.store.message_exists(&event.sender_id, &event.message_id).await {
            Ok(true) => {
                debug!(
                    event_name = "agent.run.duplicate_skipped",
                    sender = %event.sender_id.0,
                    message_id = %event.message_id,
                );
                return Ok(());
            }
            Ok(false) => {}
            Err(error) => {
                warn!(event_name = "agent.run.dedup_check_failed", error = %error);
            }
        }

        let (mut profile, degraded) = match self.store.get_profile(&event.sender_id).await {
            Ok(Some(profile)) => (profile, false),
            Ok(None) => (Profile::new(event.sender_id.clone()), false),
            Err(error) => {
                warn!(event_name = "agent.run.store_degraded", error = %error);
                (Profile::new(event.sender_id.clone()), true)
            }
        };

        if !degraded {
            let inbound =
                Message::inbound(event.sender_id.clone(), &event.body, &event.message_id);
            if let Err(error) = self.store.append_message(inbound).await {
                warn!(event_name = "agent.run.inbound_persist_failed", error = %error);
            }
        }

        if is_greeting_only(&event.body) {
            let reply = GREETING_REPLIES[fastrand::usize(..GREETING_REPLIES.len())];
            info!(event_name = "agent.run.greeting_short_circuit", sender = %event.sender_id.0);
            self.deliver(&event, reply, degraded).await?;
            return Ok(());
        }

        let detected = self.extractor.detect(&event.body, &profile);
        let (merged, changed) = merge(&profile, &detected);
        if changed {
            info!(
                event_name = "agent.profile.updated",
                sender = %event.sender_id.0,
                stage = merged.stage.as_str(),
                override_pass = detected.is_override,
            );
        }
        // Persisted on every run, not only on attribute changes, so the
        // `updated_at` stamp doubles as a last-contact marker.
        if !degraded {
            if let Err(error) = self.store.put_profile(merged.clone()).await {
                warn!(event_name = "agent.profile.persist_failed", error = %error);
            }
        }
        profile = merged;

        let stored = if degraded {
            Vec::new()
        } else {
            match self.store.recent_messages(&event.sender_id, self.config.history_limit).await {
                Ok(messages) => messages,
                Err(error) => {
                    warn!(event_name = "agent.run.history_load_failed", error = %error);
                    Vec::new()
                }
            }
        };
        // The inbound message may already be in the log; drop it from the
        // window so it is not replayed twice.
        let stored: Vec<Message> = stored
            .into_iter()
            .filter(|message| message.external_id != event.message_id)
            .collect();
        let mut turns = build_history(&stored, &event.body, self.config.history_limit);

        let reply = match self.run_tool_loop(&event, &mut profile, &mut turns, degraded).await {
            Ok(Some(text)) => text,
            Ok(None) => choose_fallback(&profile).to_string(),
            Err(error) => {
                warn!(event_name = "agent.run.model_failed", error = %error);
                choose_fallback(&profile).to_string()
            }
        };

        self.deliver(&event, &reply, degraded).await?;
        Ok(())
    }

    /// Bounded completion loop. Each iteration re-renders the system prompt
    /// from the latest profile so tool writes are visible to the next call.
    /// Returns `None` when the loop exhausts its budget without a text reply.
    async fn run_tool_loop(
        &self,
        event: &InboundMessageEvent,
        profile: &mut Profile,
        turns: &mut Vec<Turn>,
        degraded: bool,
    ) -> Result<Option<String>, ModelError> {
        let context = ToolContext { sender_id: event.sender_id.clone() };
        let tool_timeout = Duration::from_secs(self.config.tool_timeout_secs);

        for iteration in 0..self.config.max_tool_iterations {
            let request = ModelRequest {
                system: render_system_prompt(profile),
                tools: self.tools.specs(),
                turns: turns.clone(),
            };
            let response = self.model.complete(request).await?;

            if !response.has_tool_use() {
                return Ok(match response.first_text() {
                    Some(text) if !text.trim().is_empty() => Some(text.to_string()),
                    _ => None,
                });
            }

            let mut results: Vec<ContentBlock> = Vec::new();
            for block in &response.content {
                let ContentBlock::ToolUse { id, name, input } = block else {
                    continue;
                };
                debug!(
                    event_name = "agent.tools.invoked",
                    tool = %name,
                    iteration,
                    sender = %event.sender_id.0,
                );
                let outcome =
                    match tokio::time::timeout(
                        tool_timeout,
                        self.tools.dispatch(name, &context, input.clone()),
                    )
                    .await
                    {
                        Ok(outcome) => outcome,
                        Err(_) => ToolOutcome::error(format!(
                            "tool {name} timed out after {}s",
                            self.config.tool_timeout_secs
                        )),
                    };
                results.push(ContentBlock::ToolResult {
                    tool_use_id: id.clone(),
                    content: outcome.into_transcript(),
                });
            }

            turns.push(Turn { role: Role::Assistant, content: response.content });
            turns.push(Turn { role: Role::User, content: results });

            if !degraded {
                if let Ok(Some(latest)) = self.store.get_profile(&event.sender_id).await {
                    *profile = latest;
                }
            }
        }

        warn!(
            event_name = "agent.run.tool_loop_exhausted",
            sender = %event.sender_id.0,
            iterations = self.config.max_tool_iterations,
        );
        Ok(None)
    }

    async fn deliver(
        &self,
        event: &InboundMessageEvent,
        reply: &str,
        degraded: bool,
    ) -> Result<(), OrchestratorError> {
        let delivery = self.sender.send_text(&event.sender_id, reply).await?;
        info!(
            event_name = "agent.run.reply_sent",
            sender = %event.sender_id.0,
            delivery_id = %delivery.0,
        );
        if !degraded {
            let outbound = Message::outbound(event.sender_id.clone(), reply, delivery.0);
            if let Err(error) = self.store.append_message(outbound).await {
                warn!(event_name = "agent.run.outbound_persist_failed", error = %error);
            }
        }
        Ok(())
    }
}

fn is_greeting_only(text: &str) -> bool {
    let normalized = normalize_text(text);
    let trimmed = normalized.trim().trim_end_matches(['!', '.', '?']).trim();
    GREETINGS.contains(&trimmed)
}

fn choose_fallback(profile: &Profile) -> &'static str {
    if profile.property_type.is_some() && profile.zone.is_some() {
        FALLBACK_KNOWN_SEARCH
    } else {
        FALLBACK_NEED_DETAILS
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use inmobot_core::domain::message::Direction;
    use inmobot_core::domain::profile::{SenderId, Stage};
    use inmobot_db::{InMemoryProfileStore, ProfileStore, RepositoryError};
    use inmobot_whatsapp::events::InboundMessageEvent;
    use inmobot_whatsapp::outbound::{DeliveryId, MessageSender, SendError};
    use serde_json::json;

    use crate::llm::{
        ContentBlock, ModelClient, ModelError, ModelRequest, ModelResponse, StopReason,
    };
    use crate::tools::{ToolRegistry, UpdateProfileTool};

    use super::{DialogueOrchestrator, OrchestratorConfig};

    struct ScriptedModel {
        responses: Mutex<Vec<ModelResponse>>,
        calls: AtomicUsize,
    }

    impl ScriptedModel {
        fn new(mut responses: Vec<ModelResponse>) -> Self {
            responses.reverse();
            Self { responses: Mutex::new(responses), calls: AtomicUsize::new(0) }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ModelClient for ScriptedModel {
        async fn complete(&self, _request: ModelRequest) -> Result<ModelResponse, ModelError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.responses
                .lock()
                .unwrap()
                .pop()
                .ok_or_else(|| ModelError::Decode("script exhausted".to_string()))
        }
    }

    /// Model that asks for the same tool forever; used to prove the loop cap.
    struct LoopingModel {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ModelClient for LoopingModel {
        async fn complete(&self, _request: ModelRequest) -> Result<ModelResponse, ModelError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(ModelResponse {
                stop_reason: StopReason::ToolUse,
                content: vec![ContentBlock::ToolUse {
                    id: "toolu_loop".to_string(),
                    name: "no_such_tool".to_string(),
                    input: json!({}),
                }],
            })
        }
    }

    #[derive(Default)]
    struct RecordingSender {
        sent: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl MessageSender for RecordingSender {
        async fn send_text(&self, _to: &SenderId, body: &str) -> Result<DeliveryId, SendError> {
            self.sent.lock().unwrap().push(body.to_string());
            Ok(DeliveryId(format!("wamid.out.{}", self.sent.lock().unwrap().len())))
        }
    }

    fn event(body: &str, message_id: &str) -> InboundMessageEvent {
        InboundMessageEvent {
            sender_id: SenderId("5213312345678".to_string()),
            body: body.to_string(),
            message_id: message_id.to_string(),
        }
    }

    fn text_response(text: &str) -> ModelResponse {
        ModelResponse {
            stop_reason: StopReason::EndTurn,
            content: vec![ContentBlock::Text { text: text.to_string() }],
        }
    }

    fn orchestrator(
        store: Arc<dyn ProfileStore>,
        model: Arc<dyn ModelClient>,
        sender: Arc<RecordingSender>,
        tools: ToolRegistry,
    ) -> DialogueOrchestrator {
        DialogueOrchestrator::new(
            store,
            model,
            sender,
            tools,
            OrchestratorConfig::default(),
        )
    }

    #[tokio::test]
    async fn greeting_short_circuits_without_a_model_call() {
        let store = Arc::new(InMemoryProfileStore::new());
        let model = Arc::new(ScriptedModel::new(vec![]));
        let sender = Arc::new(RecordingSender::default());
        let orchestrator =
            orchestrator(store.clone(), model.clone(), sender.clone(), ToolRegistry::new(vec![]));

        orchestrator.handle_inbound(event("Hola!", "wamid.1")).await.unwrap();

        assert_eq!(model.calls(), 0);
        let sent = sender.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert!(super::GREETING_REPLIES.contains(&sent[0].as_str()));

        // Both legs still land in the log; the profile stays untouched.
        let log = store
            .recent_messages(&SenderId("5213312345678".to_string()), 10)
            .await
            .unwrap();
        assert_eq!(log.len(), 2);
        assert!(store
            .get_profile(&SenderId("5213312345678".to_string()))
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn plain_message_gets_a_model_reply_and_both_legs_persist() {
        let store = Arc::new(InMemoryProfileStore::new());
        let model = Arc::new(ScriptedModel::new(vec![text_response("¿En qué zona le gustaría?")]));
        let sender = Arc::new(RecordingSender::default());
        let orchestrator =
            orchestrator(store.clone(), model.clone(), sender.clone(), ToolRegistry::new(vec![]));

        orchestrator.handle_inbound(event("busco casa", "wamid.2")).await.unwrap();

        assert_eq!(model.calls(), 1);
        assert_eq!(sender.sent.lock().unwrap().len(), 1);

        let log = store.recent_messages(&event("", "").sender_id, 10).await.unwrap();
        assert_eq!(log.len(), 2);
        assert_eq!(log[0].direction, Direction::Inbound);
        assert_eq!(log[1].direction, Direction::Outbound);
        assert_eq!(log[1].body, "¿En qué zona le gustaría?");
    }

    #[tokio::test]
    async fn lexical_extraction_lands_on_the_profile_before_the_model_runs() {
        let store = Arc::new(InMemoryProfileStore::new());
        let model = Arc::new(ScriptedModel::new(vec![text_response("Perfecto, le busco opciones.")]));
        let sender = Arc::new(RecordingSender::default());
        let orchestrator =
            orchestrator(store.clone(), model, sender, ToolRegistry::new(vec![]));

        orchestrator
            .handle_inbound(event("terreno en Zapopan de 2 millones", "wamid.3"))
            .await
            .unwrap();

        let profile = store
            .get_profile(&SenderId("5213312345678".to_string()))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(profile.property_type.as_deref(), Some("terreno"));
        assert_eq!(profile.zone.as_deref(), Some("Zapopan"));
        assert_eq!(profile.budget.as_deref(), Some("2 millones"));
        assert_eq!(profile.stage, Stage::Searching);
    }

    #[tokio::test]
    async fn tool_loop_is_capped_and_falls_back_to_a_canned_reply() {
        let store = Arc::new(InMemoryProfileStore::new());
        let model = Arc::new(LoopingModel { calls: AtomicUsize::new(0) });
        let sender = Arc::new(RecordingSender::default());
        let orchestrator =
            orchestrator(store, model.clone(), sender.clone(), ToolRegistry::new(vec![]));

        orchestrator.handle_inbound(event("busco depa", "wamid.4")).await.unwrap();

        assert_eq!(model.calls.load(Ordering::SeqCst), 6);
        let sent = sender.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0], super::FALLBACK_NEED_DETAILS);
    }

    #[tokio::test]
    async fn fallback_acknowledges_an_already_known_search() {
        let store = Arc::new(InMemoryProfileStore::new());
        // Script exhaustion makes the model path fail outright.
        let model = Arc::new(ScriptedModel::new(vec![]));
        let sender = Arc::new(RecordingSender::default());
        let orchestrator =
            orchestrator(store, model, sender.clone(), ToolRegistry::new(vec![]));

        orchestrator
            .handle_inbound(event("quiero una casa en chapala", "wamid.5"))
            .await
            .unwrap();

        let sent = sender.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0], super::FALLBACK_KNOWN_SEARCH);
    }

    #[tokio::test]
    async fn duplicate_delivery_of_the_same_message_id_is_skipped() {
        let store = Arc::new(InMemoryProfileStore::new());
        let model = Arc::new(ScriptedModel::new(vec![
            text_response("primera"),
            text_response("segunda"),
        ]));
        let sender = Arc::new(RecordingSender::default());
        let orchestrator =
            orchestrator(store, model.clone(), sender.clone(), ToolRegistry::new(vec![]));

        orchestrator.handle_inbound(event("busco casa", "wamid.6")).await.unwrap();
        orchestrator.handle_inbound(event("busco casa", "wamid.6")).await.unwrap();

        assert_eq!(model.calls(), 1);
        assert_eq!(sender.sent.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn tool_call_round_trip_reaches_a_final_text_reply() {
        let store = Arc::new(InMemoryProfileStore::new());
        let registry =
            ToolRegistry::new(vec![Arc::new(UpdateProfileTool::new(store.clone()))]);
        let model = Arc::new(ScriptedModel::new(vec![
            ModelResponse {
                stop_reason: StopReason::ToolUse,
                content: vec![
                    ContentBlock::Text { text: "Déjame registrar eso.".to_string() },
                    ContentBlock::ToolUse {
                        id: "toolu_1".to_string(),
                        name: "update_profile".to_string(),
                        input: json!({"stage": "interested", "summary": "Listo para visitar"}),
                    },
                ],
            },
            text_response("¡Excelente! ¿Le agendo una visita esta semana?"),
        ]));
        let sender = Arc::new(RecordingSender::default());
        let orchestrator = orchestrator(store.clone(), model.clone(), sender.clone(), registry);

        orchestrator.handle_inbound(event("me interesa la segunda opcion", "wamid.7")).await.unwrap();

        assert_eq!(model.calls(), 2);
        assert_eq!(sender.sent.lock().unwrap().len(), 1);

        let profile = store
            .get_profile(&SenderId("5213312345678".to_string()))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(profile.stage, Stage::Interested);
        assert_eq!(profile.summary.as_deref(), Some("Listo para visitar"));
    }

    /// Store that fails every call, exercising stateless degraded operation.
    struct FailingStore;

    #[async_trait]
    impl ProfileStore for FailingStore {
        async fn get_profile(
            &self,
            _sender_id: &SenderId,
        ) -> Result<Option<inmobot_core::domain::profile::Profile>, RepositoryError> {
            Err(RepositoryError::Decode("store offline".to_string()))
        }

        async fn put_profile(
            &self,
            _profile: inmobot_core::domain::profile::Profile,
        ) -> Result<(), RepositoryError> {
            Err(RepositoryError::Decode("store offline".to_string()))
        }

        async fn append_message(
            &self,
            _message: inmobot_core::domain::message::Message,
        ) -> Result<(), RepositoryError> {
            Err(RepositoryError::Decode("store offline".to_string()))
        }

        async fn recent_messages(
            &self,
            _sender_id: &SenderId,
            _limit: usize,
        ) -> Result<Vec<inmobot_core::domain::message::Message>, RepositoryError> {
            Err(RepositoryError::Decode("store offline".to_string()))
        }

        async fn message_exists(
            &self,
            _sender_id: &SenderId,
            _external_id: &str,
        ) -> Result<bool, RepositoryError> {
            Err(RepositoryError::Decode("store offline".to_string()))
        }
    }

    #[tokio::test]
    async fn store_outage_still_produces_exactly_one_reply() {
        let model = Arc::new(ScriptedModel::new(vec![text_response("Con gusto le ayudo.")]));
        let sender = Arc::new(RecordingSender::default());
        let orchestrator =
            orchestrator(Arc::new(FailingStore), model.clone(), sender.clone(), ToolRegistry::new(vec![]));

        orchestrator.handle_inbound(event("busco terreno", "wamid.8")).await.unwrap();

        assert_eq!(model.calls(), 1);
        assert_eq!(sender.sent.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn reply_is_the_first_text_block_of_the_final_response() {
        let store = Arc::new(InMemoryProfileStore::new());
        let model = Arc::new(ScriptedModel::new(vec![ModelResponse {
            stop_reason: StopReason::EndTurn,
            content: vec![
                ContentBlock::Text { text: "Tengo dos opciones para usted.".to_string() },
                ContentBlock::Text { text: "(borrador interno)".to_string() },
            ],
        }]));
        let sender = Arc::new(RecordingSender::default());
        let orchestrator =
            orchestrator(store, model, sender.clone(), ToolRegistry::new(vec![]));

        orchestrator.handle_inbound(event("busco casa", "wamid.9")).await.unwrap();

        let sent = sender.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0], "Tengo dos opciones para usted.");
    }

    #[tokio::test]
    async fn profile_is_stamped_even_when_no_attribute_was_detected() {
        let store = Arc::new(InMemoryProfileStore::new());
        let model = Arc::new(ScriptedModel::new(vec![text_response("¿Qué anda buscando?")]));
        let sender = Arc::new(RecordingSender::default());
        let orchestrator =
            orchestrator(store.clone(), model, sender, ToolRegistry::new(vec![]));

        orchestrator.handle_inbound(event("gracias por responder", "wamid.10")).await.unwrap();

        let profile = store
            .get_profile(&SenderId("5213312345678".to_string()))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(profile.stage, Stage::Initial);
        assert!(profile.property_type.is_none());
    }

    #[tokio::test]
    async fn sender_lock_entries_are_released_after_the_run() {
        let store = Arc::new(InMemoryProfileStore::new());
        let model = Arc::new(ScriptedModel::new(vec![text_response("Claro que sí.")]));
        let sender = Arc::new(RecordingSender::default());
        let orchestrator =
            orchestrator(store, model, sender, ToolRegistry::new(vec![]));

        orchestrator.handle_inbound(event("busco casa", "wamid.11")).await.unwrap();

        let locks = orchestrator.sender_locks.lock().unwrap();
        assert!(locks.is_empty());
    }
}
