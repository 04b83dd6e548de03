use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::profile::SenderId;
use crate::errors::DomainError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Inbound,
    Outbound,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Inbound => "inbound",
            Self::Outbound => "outbound",
        }
    }
}

impl std::str::FromStr for Direction {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "inbound" => Ok(Self::Inbound),
            "outbound" => Ok(Self::Outbound),
            other => Err(DomainError::UnknownEnumValue {
                field: "direction",
                value: other.to_string(),
            }),
        }
    }
}

/// One append-only entry in a sender's message log. Never mutated after
/// append; `external_id` carries the provider message or delivery id and may
/// be empty when the provider did not return one.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub sender_id: SenderId,
    pub direction: Direction,
    pub body: String,
    pub external_id: String,
    pub created_at: DateTime<Utc>,
}

impl Message {
    pub fn inbound(sender_id: SenderId, body: impl Into<String>, external_id: impl Into<String>) -> Self {
        Self {
            sender_id,
            direction: Direction::Inbound,
            body: body.into(),
            external_id: external_id.into(),
            created_at: Utc::now(),
        }
    }

    pub fn outbound(sender_id: SenderId, body: impl Into<String>, external_id: impl Into<String>) -> Self {
        Self {
            sender_id,
            direction: Direction::Outbound,
            body: body.into(),
            external_id: external_id.into(),
            created_at: Utc::now(),
        }
    }
}
