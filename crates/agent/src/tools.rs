use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use inmobot_core::domain::profile::SenderId;
use inmobot_db::ProfileStore;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::warn;

use crate::llm::ToolSpec;

const DEFAULT_VISIT_MINUTES: i64 = 60;
const MAX_VISIT_MINUTES: i64 = 240;
const DEFAULT_LISTING_RESULTS: usize = 3;

/// Per-run context handed to every tool invocation.
#[derive(Clone, Debug)]
pub struct ToolContext {
    pub sender_id: SenderId,
}

/// Result of one tool invocation, already shaped for the transcript. Tools
/// never abort the run: failures become `error` payloads the model can read
/// and route around.
#[derive(Clone, Debug, PartialEq)]
pub struct ToolOutcome(pub Value);

impl ToolOutcome {
    pub fn ok(payload: Value) -> Self {
        Self(json!({"ok": true, "result": payload}))
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self(json!({"ok": false, "error": message.into()}))
    }

    pub fn into_transcript(self) -> String {
        self.0.to_string()
    }
}

#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &'static str;
    fn description(&self) -> &'static str;
    fn input_schema(&self) -> Value;
    async fn invoke(&self, context: &ToolContext, input: Value) -> ToolOutcome;
}

/// Fixed set of tools advertised to the model.
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new(tools: Vec<Arc<dyn Tool>>) -> Self {
        Self { tools }
    }

    pub fn specs(&self) -> Vec<ToolSpec> {
        self.tools
            .iter()
            .map(|tool| ToolSpec {
                name: tool.name().to_string(),
                description: tool.description().to_string(),
                input_schema: tool.input_schema(),
            })
            .collect()
    }

    pub async fn dispatch(&self, name: &str, context: &ToolContext, input: Value) -> ToolOutcome {
        match self.tools.iter().find(|tool| tool.name() == name) {
            Some(tool) => tool.invoke(context, input).await,
            None => {
                warn!(event_name = "agent.tools.unknown", tool = %name);
                ToolOutcome::error(format!("unknown tool: {name}"))
            }
        }
    }
}

// ---------------------------------------------------------------------------
// update_profile

#[derive(Debug, Deserialize)]
struct UpdateProfileInput {
    stage: Option<String>,
    summary: Option<String>,
    property_type: Option<String>,
    zone: Option<String>,
    budget: Option<String>,
    buyer_profile: Option<String>,
    payment_method: Option<String>,
    credit_status: Option<String>,
    intent: Option<String>,
}

/// Lets the model write back conversation state it inferred beyond what the
/// deterministic scan caught. Stage and summary are always overwritable;
/// qualification attributes set here replace existing values because the
/// model only calls this when it is confident.
pub struct UpdateProfileTool {
    store: Arc<dyn ProfileStore>,
}

impl UpdateProfileTool {
    pub fn new(store: Arc<dyn ProfileStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for UpdateProfileTool {
    fn name(&self) -> &'static str {
        "update_profile"
    }

    fn description(&self) -> &'static str {
        "Actualiza el perfil del prospecto: etapa, resumen y atributos de calificación."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "stage": {
                    "type": "string",
                    "enum": ["initial", "searching", "interested", "appointment_scheduled"]
                },
                "summary": {"type": "string"},
                "property_type": {"type": "string"},
                "zone": {"type": "string"},
                "budget": {"type": "string"},
                "buyer_profile": {"type": "string", "enum": ["investor", "homebuyer"]},
                "payment_method": {"type": "string", "enum": ["cash", "credit"]},
                "credit_status": {"type": "string", "enum": ["approved", "pending"]},
                "intent": {"type": "string", "enum": ["business", "resale", "live_in"]}
            },
            "additionalProperties": false
        })
    }

    async fn invoke(&self, context: &ToolContext, input: Value) -> ToolOutcome {
        let parsed: UpdateProfileInput = match serde_json::from_value(input) {
            Ok(parsed) => parsed,
            Err(error) => return ToolOutcome::error(format!("invalid input: {error}")),
        };

        let mut profile = match self.store.get_profile(&context.sender_id).await {
            Ok(Some(profile)) => profile,
            Ok(None) => inmobot_core::domain::profile::Profile::new(context.sender_id.clone()),
            Err(error) => return ToolOutcome::error(format!("profile load failed: {error}")),
        };

        let mut updated_fields: Vec<&str> = Vec::new();

        if let Some(stage) = parsed.stage {
            match stage.parse() {
                Ok(stage) => {
                    profile.stage = stage;
                    updated_fields.push("stage");
                }
                Err(error) => return ToolOutcome::error(error.to_string()),
            }
        }
        if let Some(summary) = parsed.summary {
            profile.summary = Some(summary);
            updated_fields.push("summary");
        }
        if let Some(property_type) = parsed.property_type {
            profile.property_type = Some(property_type);
            updated_fields.push("property_type");
        }
        if let Some(zone) = parsed.zone {
            profile.zone = Some(zone);
            updated_fields.push("zone");
        }
        if let Some(budget) = parsed.budget {
            profile.budget = Some(budget);
            updated_fields.push("budget");
        }
        if let Some(buyer_profile) = parsed.buyer_profile {
            match buyer_profile.parse() {
                Ok(value) => {
                    profile.buyer_profile = Some(value);
                    updated_fields.push("buyer_profile");
                }
                Err(error) => return ToolOutcome::error(error.to_string()),
            }
        }
        if let Some(payment_method) = parsed.payment_method {
            match payment_method.parse() {
                Ok(value) => {
                    profile.payment_method = Some(value);
                    updated_fields.push("payment_method");
                }
                Err(error) => return ToolOutcome::error(error.to_string()),
            }
        }
        if let Some(credit_status) = parsed.credit_status {
            match credit_status.parse() {
                Ok(value) => {
                    profile.credit_status = Some(value);
                    updated_fields.push("credit_status");
                }
                Err(error) => return ToolOutcome::error(error.to_string()),
            }
        }
        if let Some(intent) = parsed.intent {
            match intent.parse() {
                Ok(value) => {
                    profile.intent = Some(value);
                    updated_fields.push("intent");
                }
                Err(error) => return ToolOutcome::error(error.to_string()),
            }
        }

        if updated_fields.is_empty() {
            return ToolOutcome::error("no fields provided");
        }

        profile.updated_at = Utc::now();
        if let Err(error) = self.store.put_profile(profile).await {
            return ToolOutcome::error(format!("profile save failed: {error}"));
        }

        ToolOutcome::ok(json!({"updated": updated_fields}))
    }
}

// ---------------------------------------------------------------------------
// query_listings

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ListingQuery {
    pub text: String,
    pub max_results: usize,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Listing {
    pub id: String,
    pub title: String,
    pub property_type: String,
    pub zone: String,
    pub price: String,
    #[serde(default)]
    pub url: Option<String>,
}

/// Inventory lookup seam. The file-backed implementation lives with the other
/// interface adapters; tests script their own.
#[async_trait]
pub trait ListingsSource: Send + Sync {
    async fn search(&self, query: &ListingQuery) -> anyhow::Result<Vec<Listing>>;
}

pub struct QueryListingsTool {
    source: Arc<dyn ListingsSource>,
}

impl QueryListingsTool {
    pub fn new(source: Arc<dyn ListingsSource>) -> Self {
        Self { source }
    }
}

#[derive(Debug, Deserialize)]
struct QueryListingsInput {
    query: String,
}

#[async_trait]
impl Tool for QueryListingsTool {
    fn name(&self) -> &'static str {
        "query_listings"
    }

    fn description(&self) -> &'static str {
        "Busca propiedades disponibles; recibe una consulta de texto libre."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "Texto libre con tipo de propiedad, zona o presupuesto"
                }
            },
            "required": ["query"],
            "additionalProperties": false
        })
    }

    async fn invoke(&self, _context: &ToolContext, input: Value) -> ToolOutcome {
        let parsed: QueryListingsInput = match serde_json::from_value(input) {
            Ok(parsed) => parsed,
            Err(error) => return ToolOutcome::error(format!("invalid input: {error}")),
        };

        let query =
            ListingQuery { text: parsed.query, max_results: DEFAULT_LISTING_RESULTS };

        match self.source.search(&query).await {
            Ok(listings) => {
                ToolOutcome::ok(json!({"count": listings.len(), "listings": listings}))
            }
            Err(error) => ToolOutcome::error(format!("listings lookup failed: {error}")),
        }
    }
}

// ---------------------------------------------------------------------------
// schedule_visit

#[derive(Clone, Debug, PartialEq)]
pub struct VisitRequest {
    pub sender_id: SenderId,
    pub summary: String,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct VisitConfirmation {
    pub event_link: String,
}

/// Calendar seam, same shape as the listings one.
#[async_trait]
pub trait CalendarClient: Send + Sync {
    async fn schedule(&self, request: &VisitRequest) -> anyhow::Result<VisitConfirmation>;
}

pub struct ScheduleVisitTool {
    calendar: Arc<dyn CalendarClient>,
}

impl ScheduleVisitTool {
    pub fn new(calendar: Arc<dyn CalendarClient>) -> Self {
        Self { calendar }
    }
}

#[derive(Debug, Deserialize)]
struct ScheduleVisitInput {
    summary: String,
    date: String,
    start_time: String,
    duration_minutes: Option<i64>,
}

#[async_trait]
impl Tool for ScheduleVisitTool {
    fn name(&self) -> &'static str {
        "schedule_visit"
    }

    fn description(&self) -> &'static str {
        "Agenda una visita a propiedad en la fecha (YYYY-MM-DD) y hora (HH:MM) indicadas."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "summary": {"type": "string"},
                "date": {"type": "string", "description": "YYYY-MM-DD"},
                "start_time": {"type": "string", "description": "HH:MM, hora local"},
                "duration_minutes": {"type": "integer", "minimum": 15, "maximum": 240}
            },
            "required": ["summary", "date", "start_time"],
            "additionalProperties": false
        })
    }

    async fn invoke(&self, context: &ToolContext, input: Value) -> ToolOutcome {
        let parsed: ScheduleVisitInput = match serde_json::from_value(input) {
            Ok(parsed) => parsed,
            Err(error) => return ToolOutcome::error(format!("invalid input: {error}")),
        };

        let date = match NaiveDate::parse_from_str(&parsed.date, "%Y-%m-%d") {
            Ok(date) => date,
            Err(error) => return ToolOutcome::error(format!("invalid date: {error}")),
        };
        let start_time = match NaiveTime::parse_from_str(&parsed.start_time, "%H:%M") {
            Ok(time) => time,
            Err(error) => return ToolOutcome::error(format!("invalid start_time: {error}")),
        };
        let starts_at = date.and_time(start_time).and_utc();

        // The input comes from the model, so the bounds the schema advertises
        // are enforced here as well; out-of-range values would overflow the
        // duration arithmetic otherwise.
        let duration = parsed.duration_minutes.unwrap_or(DEFAULT_VISIT_MINUTES);
        if !(1..=MAX_VISIT_MINUTES).contains(&duration) {
            return ToolOutcome::error(format!(
                "duration_minutes must be between 1 and {MAX_VISIT_MINUTES}"
            ));
        }
        let ends_at = starts_at + Duration::minutes(duration);

        let request = VisitRequest {
            sender_id: context.sender_id.clone(),
            summary: parsed.summary,
            starts_at,
            ends_at,
        };

        match self.calendar.schedule(&request).await {
            Ok(confirmation) => ToolOutcome::ok(json!({
                "event_link": confirmation.event_link,
                "starts_at": starts_at.to_rfc3339(),
                "ends_at": ends_at.to_rfc3339(),
            })),
            Err(error) => ToolOutcome::error(format!("calendar scheduling failed: {error}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use inmobot_core::domain::profile::{SenderId, Stage};
    use inmobot_db::{InMemoryProfileStore, ProfileStore};
    use serde_json::json;

    use super::{
        CalendarClient, Listing, ListingQuery, ListingsSource, QueryListingsTool,
        ScheduleVisitTool, Tool, ToolContext, ToolOutcome, ToolRegistry, UpdateProfileTool,
        VisitConfirmation, VisitRequest,
    };

    fn context() -> ToolContext {
        ToolContext { sender_id: SenderId("5213312345678".to_string()) }
    }

    struct FixedListings;

    #[async_trait]
    impl ListingsSource for FixedListings {
        async fn search(&self, query: &ListingQuery) -> anyhow::Result<Vec<Listing>> {
            assert_eq!(query.text, "terreno en Zapopan");
            assert_eq!(query.max_results, 3);
            Ok(vec![Listing {
                id: "L-001".to_string(),
                title: "Terreno en Zapopan".to_string(),
                property_type: "terreno".to_string(),
                zone: "Zapopan".to_string(),
                price: "2,100,000".to_string(),
                url: None,
            }])
        }
    }

    struct RecordingCalendar;

    #[async_trait]
    impl CalendarClient for RecordingCalendar {
        async fn schedule(&self, request: &VisitRequest) -> anyhow::Result<VisitConfirmation> {
            let scheduled = request.ends_at - request.starts_at;
            assert_eq!(scheduled.num_minutes(), 60);
            assert_eq!(request.summary, "Visita terreno Zapopan");
            Ok(VisitConfirmation { event_link: "https://cal.example/evt-42".to_string() })
        }
    }

    #[tokio::test]
    async fn unknown_tool_yields_error_payload_not_panic() {
        let registry = ToolRegistry::new(vec![]);
        let outcome = registry.dispatch("no_such_tool", &context(), json!({})).await;
        assert_eq!(outcome.0["ok"], false);
    }

    #[tokio::test]
    async fn update_profile_persists_stage_and_summary() {
        let store = Arc::new(InMemoryProfileStore::new());
        let tool = UpdateProfileTool::new(store.clone());

        let outcome = tool
            .invoke(
                &context(),
                json!({"stage": "interested", "summary": "Quiere terreno en Zapopan"}),
            )
            .await;
        assert_eq!(outcome.0["ok"], true);

        let profile = store.get_profile(&context().sender_id).await.unwrap().unwrap();
        assert_eq!(profile.stage, Stage::Interested);
        assert_eq!(profile.summary.as_deref(), Some("Quiere terreno en Zapopan"));
    }

    #[tokio::test]
    async fn update_profile_rejects_unknown_stage_value() {
        let store = Arc::new(InMemoryProfileStore::new());
        let tool = UpdateProfileTool::new(store.clone());

        let outcome = tool.invoke(&context(), json!({"stage": "daydreaming"})).await;
        assert_eq!(outcome.0["ok"], false);
        assert!(store.get_profile(&context().sender_id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn query_listings_passes_the_free_text_query_through() {
        let tool = QueryListingsTool::new(Arc::new(FixedListings));
        let outcome = tool.invoke(&context(), json!({"query": "terreno en Zapopan"})).await;
        assert_eq!(outcome.0["ok"], true);
        assert_eq!(outcome.0["result"]["count"], 1);
    }

    #[tokio::test]
    async fn query_listings_requires_the_query_field() {
        let tool = QueryListingsTool::new(Arc::new(FixedListings));
        let outcome = tool.invoke(&context(), json!({})).await;
        assert_eq!(outcome.0["ok"], false);
    }

    #[tokio::test]
    async fn schedule_visit_defaults_to_one_hour() {
        let tool = ScheduleVisitTool::new(Arc::new(RecordingCalendar));
        let outcome = tool
            .invoke(
                &context(),
                json!({
                    "summary": "Visita terreno Zapopan",
                    "date": "2026-09-03",
                    "start_time": "17:00"
                }),
            )
            .await;
        assert_eq!(outcome.0["ok"], true);
        assert_eq!(outcome.0["result"]["event_link"], "https://cal.example/evt-42");
    }

    #[tokio::test]
    async fn schedule_visit_rejects_malformed_dates() {
        let tool = ScheduleVisitTool::new(Arc::new(RecordingCalendar));
        let outcome = tool
            .invoke(
                &context(),
                json!({"summary": "Visita", "date": "mañana", "start_time": "17:00"}),
            )
            .await;
        assert_eq!(outcome.0["ok"], false);
    }

    #[tokio::test]
    async fn schedule_visit_rejects_out_of_range_durations() {
        let tool = ScheduleVisitTool::new(Arc::new(RecordingCalendar));

        for duration in [i64::MAX, i64::MIN, 0, 241] {
            let outcome = tool
                .invoke(
                    &context(),
                    json!({
                        "summary": "Visita terreno Zapopan",
                        "date": "2026-09-03",
                        "start_time": "17:00",
                        "duration_minutes": duration
                    }),
                )
                .await;
            assert_eq!(outcome.0["ok"], false, "duration {duration} should be rejected");
            assert!(outcome.0["error"].as_str().unwrap().contains("duration_minutes"));
        }
    }

    #[test]
    fn outcome_transcript_form_is_compact_json() {
        let outcome = ToolOutcome::ok(json!({"count": 0}));
        assert_eq!(outcome.into_transcript(), r#"{"ok":true,"result":{"count":0}}"#);
    }
}
