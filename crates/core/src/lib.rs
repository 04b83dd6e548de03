pub mod config;
pub mod domain;
pub mod errors;
pub mod qualification;

pub use chrono;

pub use config::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat};
pub use domain::message::{Direction, Message};
pub use domain::profile::{
    BuyerProfile, CreditStatus, PaymentMethod, Profile, PurchaseIntent, SenderId, Stage,
};
pub use errors::DomainError;
