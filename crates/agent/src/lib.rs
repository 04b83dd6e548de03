//! Dialogue orchestration - conversation state machine and tool loop
//!
//! This crate is the "brain" of the inmobot system. For each inbound
//! WhatsApp message it:
//! - Detects customer attributes in the text and merges them into the
//!   persisted profile (`extract`, `merge`)
//! - Rebuilds a strictly alternating turn sequence from the message log
//!   (`history`)
//! - Drives a bounded tool-call loop against the language model until a
//!   final reply is produced (`orchestrator`, `tools`, `llm`)
//!
//! # Key Types
//!
//! - `DialogueOrchestrator` - the state machine (see `orchestrator`)
//! - `ModelClient` - pluggable model transport; `AnthropicClient` is the
//!   production implementation
//! - `Tool` / `ToolRegistry` - named, schema-validated operations the model
//!   may request
//!
//! # State Discipline
//!
//! The model never writes state directly. Every mutation flows through the
//! `ProfileStore` seam, either from deterministic extraction or from an
//! explicit `update_profile` tool call, and each inbound message produces
//! exactly one outbound reply.

pub mod anthropic;
pub mod extract;
pub mod history;
pub mod llm;
pub mod merge;
pub mod orchestrator;
pub mod prompt;
pub mod tools;

pub use anthropic::AnthropicClient;
pub use extract::{EntityExtractor, ExtractedAttributes};
pub use history::build_history;
pub use llm::{
    ContentBlock, ModelClient, ModelError, ModelRequest, ModelResponse, Role, StopReason, Turn,
};
pub use merge::merge;
pub use orchestrator::{DialogueOrchestrator, OrchestratorConfig, OrchestratorError};
pub use tools::{
    CalendarClient, Listing, ListingQuery, ListingsSource, QueryListingsTool, ScheduleVisitTool,
    Tool, ToolContext, ToolOutcome, ToolRegistry, UpdateProfileTool,
};
