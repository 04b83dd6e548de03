use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use inmobot_agent::{CalendarClient, Listing, ListingQuery, ListingsSource};
use inmobot_agent::tools::{VisitConfirmation, VisitRequest};
use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;

const CALENDAR_TIMEOUT: Duration = Duration::from_secs(10);

/// Inventory backed by a JSON file on disk, re-read on every lookup so the
/// file can be swapped without a restart.
pub struct FileListingsSource {
    path: PathBuf,
}

impl FileListingsSource {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

#[async_trait]
impl ListingsSource for FileListingsSource {
    async fn search(&self, query: &ListingQuery) -> anyhow::Result<Vec<Listing>> {
        let raw = tokio::fs::read_to_string(&self.path).await?;
        let all: Vec<Listing> = serde_json::from_str(&raw)?;

        // Every word of the free-text query has to appear somewhere in the
        // listing; an empty query matches everything.
        let tokens: Vec<String> =
            query.text.split_whitespace().map(|token| token.to_lowercase()).collect();
        let matches: Vec<Listing> = all
            .into_iter()
            .filter(|listing| {
                let haystack = format!(
                    "{} {} {} {}",
                    listing.title, listing.property_type, listing.zone, listing.price
                )
                .to_lowercase();
                tokens.iter().all(|token| haystack.contains(token))
            })
            .take(query.max_results)
            .collect();

        info!(
            event_name = "integrations.listings.searched",
            matches = matches.len(),
            query = %query.text,
        );
        Ok(matches)
    }
}

/// Empty inventory for deployments with no listings feed configured. Lookups
/// succeed with zero results so the model steers toward collecting details
/// instead of erroring.
pub struct EmptyListingsSource;

#[async_trait]
impl ListingsSource for EmptyListingsSource {
    async fn search(&self, _query: &ListingQuery) -> anyhow::Result<Vec<Listing>> {
        Ok(Vec::new())
    }
}

/// Pushes visit requests to an external scheduling webhook.
pub struct WebhookCalendarClient {
    http: reqwest::Client,
    url: String,
}

impl WebhookCalendarClient {
    pub fn new(url: impl Into<String>) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder().timeout(CALENDAR_TIMEOUT).build()?;
        Ok(Self { http, url: url.into() })
    }
}

#[derive(serde::Deserialize)]
struct CalendarAck {
    event_link: String,
}

#[async_trait]
impl CalendarClient for WebhookCalendarClient {
    async fn schedule(&self, request: &VisitRequest) -> anyhow::Result<VisitConfirmation> {
        // The event id doubles as an idempotency key for the remote side.
        let event_id = Uuid::new_v4().to_string();
        let response = self
            .http
            .post(&self.url)
            .json(&json!({
                "event_id": event_id,
                "sender_id": request.sender_id.0,
                "summary": request.summary,
                "starts_at": request.starts_at.to_rfc3339(),
                "ends_at": request.ends_at.to_rfc3339(),
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            anyhow::bail!("calendar webhook returned status {}", response.status());
        }
        let ack: CalendarAck = response.json().await?;

        info!(
            event_name = "integrations.calendar.scheduled",
            event_id = %event_id,
            event_link = %ack.event_link,
        );
        Ok(VisitConfirmation { event_link: ack.event_link })
    }
}

/// Local confirmation-only calendar for deployments with no webhook. The
/// visit is acknowledged to the prospect and left for staff follow-up.
pub struct LocalCalendarClient;

#[async_trait]
impl CalendarClient for LocalCalendarClient {
    async fn schedule(&self, request: &VisitRequest) -> anyhow::Result<VisitConfirmation> {
        let event_link = format!("local://visits/{}", Uuid::new_v4());
        warn!(
            event_name = "integrations.calendar.local_only",
            event_link = %event_link,
            sender_id = %request.sender_id.0,
            summary = %request.summary,
            starts_at = %request.starts_at.to_rfc3339(),
            "no calendar webhook configured; visit recorded locally only"
        );
        Ok(VisitConfirmation { event_link })
    }
}
