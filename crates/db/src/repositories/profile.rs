use chrono::{DateTime, Utc};
use sqlx::{sqlite::SqliteRow, Row};

use inmobot_core::domain::message::{Direction, Message};
use inmobot_core::domain::profile::{Profile, SenderId, Stage};

use super::{ProfileStore, RepositoryError};
use crate::DbPool;

pub struct SqlProfileStore {
    pool: DbPool,
}

impl SqlProfileStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl ProfileStore for SqlProfileStore {
    async fn get_profile(&self, sender_id: &SenderId) -> Result<Option<Profile>, RepositoryError> {
        let row = sqlx::query(
            "SELECT
                sender_id,
                property_type,
                zone,
                budget,
                stage,
                summary,
                buyer_profile,
                payment_method,
                credit_status,
                intent,
                updated_at
             FROM profile
             WHERE sender_id = ?",
        )
        .bind(&sender_id.0)
        .fetch_optional(&self.pool)
        .await?;

        row.map(profile_from_row).transpose()
    }

    async fn put_profile(&self, profile: Profile) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO profile (
                sender_id,
                property_type,
                zone,
                budget,
                stage,
                summary,
                buyer_profile,
                payment_method,
                credit_status,
                intent,
                updated_at
             ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT (sender_id) DO UPDATE SET
                property_type = excluded.property_type,
                zone = excluded.zone,
                budget = excluded.budget,
                stage = excluded.stage,
                summary = excluded.summary,
                buyer_profile = excluded.buyer_profile,
                payment_method = excluded.payment_method,
                credit_status = excluded.credit_status,
                intent = excluded.intent,
                updated_at = excluded.updated_at",
        )
        .bind(&profile.sender_id.0)
        .bind(&profile.property_type)
        .bind(&profile.zone)
        .bind(&profile.budget)
        .bind(profile.stage.as_str())
        .bind(&profile.summary)
        .bind(profile.buyer_profile.map(|value| value.as_str()))
        .bind(profile.payment_method.map(|value| value.as_str()))
        .bind(profile.credit_status.map(|value| value.as_str()))
        .bind(profile.intent.map(|value| value.as_str()))
        .bind(profile.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn append_message(&self, message: Message) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO message (sender_id, direction, body, external_id, created_at)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&message.sender_id.0)
        .bind(message.direction.as_str())
        .bind(&message.body)
        .bind(&message.external_id)
        .bind(message.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn recent_messages(
        &self,
        sender_id: &SenderId,
        limit: usize,
    ) -> Result<Vec<Message>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT sender_id, direction, body, external_id, created_at
             FROM message
             WHERE sender_id = ?
             ORDER BY id DESC
             LIMIT ?",
        )
        .bind(&sender_id.0)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        let mut messages =
            rows.into_iter().map(message_from_row).collect::<Result<Vec<_>, _>>()?;
        messages.reverse();
        Ok(messages)
    }

    async fn message_exists(
        &self,
        sender_id: &SenderId,
        external_id: &str,
    ) -> Result<bool, RepositoryError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM message WHERE sender_id = ? AND external_id = ? AND external_id != ''",
        )
        .bind(&sender_id.0)
        .bind(external_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count > 0)
    }
}

fn profile_from_row(row: SqliteRow) -> Result<Profile, RepositoryError> {
    // Enumerated columns self-heal: an unrecognized stored value reads back
    // as unset rather than failing the whole orchestration run.
    let stage = row
        .get::<String, _>("stage")
        .parse::<Stage>()
        .unwrap_or(Stage::Initial);

    Ok(Profile {
        sender_id: SenderId(row.get("sender_id")),
        property_type: row.get("property_type"),
        zone: row.get("zone"),
        budget: row.get("budget"),
        stage,
        summary: row.get("summary"),
        buyer_profile: row
            .get::<Option<String>, _>("buyer_profile")
            .and_then(|value| value.parse().ok()),
        payment_method: row
            .get::<Option<String>, _>("payment_method")
            .and_then(|value| value.parse().ok()),
        credit_status: row
            .get::<Option<String>, _>("credit_status")
            .and_then(|value| value.parse().ok()),
        intent: row.get::<Option<String>, _>("intent").and_then(|value| value.parse().ok()),
        updated_at: parse_timestamp(&row.get::<String, _>("updated_at"), "profile.updated_at")?,
    })
}

fn message_from_row(row: SqliteRow) -> Result<Message, RepositoryError> {
    let direction = row
        .get::<String, _>("direction")
        .parse::<Direction>()
        .map_err(|error| RepositoryError::Decode(error.to_string()))?;

    Ok(Message {
        sender_id: SenderId(row.get("sender_id")),
        direction,
        body: row.get("body"),
        external_id: row.get("external_id"),
        created_at: parse_timestamp(&row.get::<String, _>("created_at"), "message.created_at")?,
    })
}

fn parse_timestamp(raw: &str, column: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|value| value.with_timezone(&Utc))
        .map_err(|error| RepositoryError::Decode(format!("{column}: {error}")))
}
