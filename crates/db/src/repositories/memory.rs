use std::collections::HashMap;

use tokio::sync::RwLock;

use inmobot_core::domain::message::Message;
use inmobot_core::domain::profile::{Profile, SenderId};

use super::{ProfileStore, RepositoryError};

/// In-memory store used by orchestrator and channel tests. Same semantics as
/// the SQL store: last write wins, append-only log.
#[derive(Default)]
pub struct InMemoryProfileStore {
    profiles: RwLock<HashMap<String, Profile>>,
    messages: RwLock<HashMap<String, Vec<Message>>>,
}

impl InMemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of a sender's full log, for test assertions.
    pub async fn all_messages(&self, sender_id: &SenderId) -> Vec<Message> {
        let messages = self.messages.read().await;
        messages.get(&sender_id.0).cloned().unwrap_or_default()
    }
}

#[async_trait::async_trait]
impl ProfileStore for InMemoryProfileStore {
    async fn get_profile(&self, sender_id: &SenderId) -> Result<Option<Profile>, RepositoryError> {
        let profiles = self.profiles.read().await;
        Ok(profiles.get(&sender_id.0).cloned())
    }

    async fn put_profile(&self, profile: Profile) -> Result<(), RepositoryError> {
        let mut profiles = self.profiles.write().await;
        profiles.insert(profile.sender_id.0.clone(), profile);
        Ok(())
    }

    async fn append_message(&self, message: Message) -> Result<(), RepositoryError> {
        let mut messages = self.messages.write().await;
        messages.entry(message.sender_id.0.clone()).or_default().push(message);
        Ok(())
    }

    async fn recent_messages(
        &self,
        sender_id: &SenderId,
        limit: usize,
    ) -> Result<Vec<Message>, RepositoryError> {
        let messages = self.messages.read().await;
        let log = messages.get(&sender_id.0).map(Vec::as_slice).unwrap_or_default();
        let start = log.len().saturating_sub(limit);
        Ok(log[start..].to_vec())
    }

    async fn message_exists(
        &self,
        sender_id: &SenderId,
        external_id: &str,
    ) -> Result<bool, RepositoryError> {
        if external_id.is_empty() {
            return Ok(false);
        }
        let messages = self.messages.read().await;
        Ok(messages
            .get(&sender_id.0)
            .map(|log| log.iter().any(|message| message.external_id == external_id))
            .unwrap_or(false))
    }
}
