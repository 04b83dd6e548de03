use std::sync::Arc;
use std::time::Duration;

use inmobot_agent::{
    AnthropicClient, DialogueOrchestrator, ModelError, OrchestratorConfig, QueryListingsTool,
    ScheduleVisitTool, Tool, ToolRegistry, UpdateProfileTool,
};
use inmobot_agent::tools::{CalendarClient, ListingsSource};
use inmobot_core::config::{AppConfig, ConfigError, LoadOptions};
use inmobot_db::{connect_with_settings, migrations, DbPool, ProfileStore, SqlProfileStore};
use inmobot_whatsapp::outbound::{CloudApiSender, SendError};
use secrecy::SecretString;
use thiserror::Error;
use tracing::info;

use crate::integrations::{
    EmptyListingsSource, FileListingsSource, LocalCalendarClient, WebhookCalendarClient,
};

const SEND_TIMEOUT: Duration = Duration::from_secs(10);

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub orchestrator: Arc<DialogueOrchestrator>,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
    #[error("outbound channel setup failed: {0}")]
    Channel(#[source] SendError),
    #[error("model client setup failed: {0}")]
    Model(#[source] ModelError),
    #[error("calendar client setup failed: {0}")]
    Calendar(#[source] reqwest::Error),
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(event_name = "system.bootstrap.start", "starting application bootstrap");

    let db_pool = connect_with_settings(
        &config.database.url,
        config.database.max_connections,
        config.database.timeout_secs,
    )
    .await
    .map_err(BootstrapError::DatabaseConnect)?;
    info!(event_name = "system.bootstrap.database_connected", "database connection established");

    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(event_name = "system.bootstrap.migrations_applied", "database migrations applied");

    let store: Arc<dyn ProfileStore> = Arc::new(SqlProfileStore::new(db_pool.clone()));

    let sender = CloudApiSender::new(
        config.whatsapp.api_base_url.clone(),
        config.whatsapp.phone_number_id.clone(),
        clone_secret(&config.whatsapp.access_token),
        SEND_TIMEOUT,
    )
    .map_err(BootstrapError::Channel)?;

    let model = AnthropicClient::new(&config.llm).map_err(BootstrapError::Model)?;

    let listings: Arc<dyn ListingsSource> = match &config.integrations.listings_path {
        Some(path) => Arc::new(FileListingsSource::new(path.clone())),
        None => Arc::new(EmptyListingsSource),
    };
    let calendar: Arc<dyn CalendarClient> = match &config.integrations.calendar_webhook_url {
        Some(url) => {
            Arc::new(WebhookCalendarClient::new(url.clone()).map_err(BootstrapError::Calendar)?)
        }
        None => Arc::new(LocalCalendarClient),
    };

    let tools: Vec<Arc<dyn Tool>> = vec![
        Arc::new(UpdateProfileTool::new(store.clone())),
        Arc::new(QueryListingsTool::new(listings)),
        Arc::new(ScheduleVisitTool::new(calendar)),
    ];

    let orchestrator = DialogueOrchestrator::new(
        store,
        Arc::new(model),
        Arc::new(sender),
        ToolRegistry::new(tools),
        OrchestratorConfig {
            history_limit: config.agent.history_limit,
            max_tool_iterations: config.agent.max_tool_iterations as usize,
            tool_timeout_secs: config.agent.tool_timeout_secs,
        },
    );

    info!(event_name = "system.bootstrap.ready", "application wiring complete");
    Ok(Application { config, db_pool, orchestrator: Arc::new(orchestrator) })
}

fn clone_secret(secret: &SecretString) -> SecretString {
    use secrecy::ExposeSecret;
    SecretString::from(secret.expose_secret().to_string())
}

#[cfg(test)]
mod tests {
    use inmobot_core::config::{ConfigOverrides, LoadOptions};

    use super::bootstrap;

    fn valid_overrides(database_url: &str) -> LoadOptions {
        LoadOptions {
            overrides: ConfigOverrides {
                database_url: Some(database_url.to_string()),
                whatsapp_access_token: Some("EAAG-test-token".to_string()),
                whatsapp_phone_number_id: Some("1555000111".to_string()),
                whatsapp_verify_token: Some("verify-secret".to_string()),
                llm_api_key: Some("sk-ant-test".to_string()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        }
    }

    #[tokio::test]
    async fn bootstrap_fails_fast_without_required_credentials() {
        let result = bootstrap(LoadOptions {
            overrides: ConfigOverrides {
                database_url: Some("sqlite::memory:".to_string()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        })
        .await;

        assert!(result.is_err());
    }

    #[tokio::test]
    async fn bootstrap_applies_schema_on_a_fresh_database() {
        let app = bootstrap(valid_overrides("sqlite::memory:?cache=shared"))
            .await
            .expect("bootstrap should succeed with valid overrides");

        let (table_count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM sqlite_master \
             WHERE type = 'table' AND name IN ('profile', 'message')",
        )
        .fetch_one(&app.db_pool)
        .await
        .expect("schema tables should exist after bootstrap");
        assert_eq!(table_count, 2);

        app.db_pool.close().await;
    }
}
