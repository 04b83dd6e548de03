use async_trait::async_trait;
use thiserror::Error;

use inmobot_core::domain::message::Message;
use inmobot_core::domain::profile::{Profile, SenderId};

pub mod memory;
pub mod profile;

pub use memory::InMemoryProfileStore;
pub use profile::SqlProfileStore;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
}

/// Durable mapping from sender id to profile record and ordered message log.
/// Reads use last-write-wins semantics; callers serialize per sender id.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn get_profile(&self, sender_id: &SenderId) -> Result<Option<Profile>, RepositoryError>;

    async fn put_profile(&self, profile: Profile) -> Result<(), RepositoryError>;

    /// Appends one message to the sender's log. Messages are never mutated or
    /// deleted after append.
    async fn append_message(&self, message: Message) -> Result<(), RepositoryError>;

    /// The last `limit` messages for a sender, oldest first.
    async fn recent_messages(
        &self,
        sender_id: &SenderId,
        limit: usize,
    ) -> Result<Vec<Message>, RepositoryError>;

    /// Whether a provider message id was already recorded for this sender.
    /// Used to absorb webhook redeliveries without replying twice.
    async fn message_exists(
        &self,
        sender_id: &SenderId,
        external_id: &str,
    ) -> Result<bool, RepositoryError>;
}
