use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::DomainError;

/// Stable identity key for a conversation party (a phone number in the
/// WhatsApp channel).
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SenderId(pub String);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Initial,
    Searching,
    Interested,
    AppointmentScheduled,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuyerProfile {
    Investor,
    Homebuyer,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    Credit,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CreditStatus {
    Approved,
    Pending,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PurchaseIntent {
    Business,
    Resale,
    LiveIn,
}

/// Durable conversational memory for one sender. Attributes are set once and
/// kept unless a later message carries an explicit change-of-mind cue;
/// `stage` and `summary` are always overwritable.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub sender_id: SenderId,
    pub property_type: Option<String>,
    pub zone: Option<String>,
    pub budget: Option<String>,
    pub stage: Stage,
    pub summary: Option<String>,
    pub buyer_profile: Option<BuyerProfile>,
    pub payment_method: Option<PaymentMethod>,
    pub credit_status: Option<CreditStatus>,
    pub intent: Option<PurchaseIntent>,
    pub updated_at: DateTime<Utc>,
}

impl Profile {
    pub fn new(sender_id: SenderId) -> Self {
        Self {
            sender_id,
            property_type: None,
            zone: None,
            budget: None,
            stage: Stage::Initial,
            summary: None,
            buyer_profile: None,
            payment_method: None,
            credit_status: None,
            intent: None,
            updated_at: Utc::now(),
        }
    }
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Initial => "initial",
            Self::Searching => "searching",
            Self::Interested => "interested",
            Self::AppointmentScheduled => "appointment_scheduled",
        }
    }
}

impl std::str::FromStr for Stage {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "initial" => Ok(Self::Initial),
            "searching" => Ok(Self::Searching),
            "interested" => Ok(Self::Interested),
            "appointment_scheduled" => Ok(Self::AppointmentScheduled),
            other => Err(DomainError::UnknownEnumValue {
                field: "stage",
                value: other.to_string(),
            }),
        }
    }
}

impl BuyerProfile {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Investor => "investor",
            Self::Homebuyer => "homebuyer",
        }
    }
}

impl std::str::FromStr for BuyerProfile {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "investor" => Ok(Self::Investor),
            "homebuyer" => Ok(Self::Homebuyer),
            other => Err(DomainError::UnknownEnumValue {
                field: "buyer_profile",
                value: other.to_string(),
            }),
        }
    }
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cash => "cash",
            Self::Credit => "credit",
        }
    }
}

impl std::str::FromStr for PaymentMethod {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "cash" => Ok(Self::Cash),
            "credit" => Ok(Self::Credit),
            other => Err(DomainError::UnknownEnumValue {
                field: "payment_method",
                value: other.to_string(),
            }),
        }
    }
}

impl CreditStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Approved => "approved",
            Self::Pending => "pending",
        }
    }
}

impl std::str::FromStr for CreditStatus {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "approved" => Ok(Self::Approved),
            "pending" => Ok(Self::Pending),
            other => Err(DomainError::UnknownEnumValue {
                field: "credit_status",
                value: other.to_string(),
            }),
        }
    }
}

impl PurchaseIntent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Business => "business",
            Self::Resale => "resale",
            Self::LiveIn => "live_in",
        }
    }
}

impl std::str::FromStr for PurchaseIntent {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "business" => Ok(Self::Business),
            "resale" => Ok(Self::Resale),
            "live_in" => Ok(Self::LiveIn),
            other => Err(DomainError::UnknownEnumValue {
                field: "intent",
                value: other.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Profile, SenderId, Stage};

    #[test]
    fn new_profile_starts_at_initial_stage_with_no_attributes() {
        let profile = Profile::new(SenderId("5213311111111".to_string()));
        assert_eq!(profile.stage, Stage::Initial);
        assert!(profile.property_type.is_none());
        assert!(profile.zone.is_none());
        assert!(profile.budget.is_none());
        assert!(profile.buyer_profile.is_none());
    }

    #[test]
    fn stage_round_trips_through_str() {
        for stage in
            [Stage::Initial, Stage::Searching, Stage::Interested, Stage::AppointmentScheduled]
        {
            assert_eq!(stage.as_str().parse::<Stage>().ok(), Some(stage));
        }
    }

    #[test]
    fn unknown_stage_value_is_rejected() {
        assert!("closed".parse::<Stage>().is_err());
    }
}
