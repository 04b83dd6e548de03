use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("unknown value `{value}` for {field}")]
    UnknownEnumValue { field: &'static str, value: String },
}
