use chrono::NaiveDate;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("configuration validation failed: {0}")]
    Validation(String),
}

/// Malformed input handed to a scoring stage.
///
/// Fatal to the stage that owns the input; sibling branches are unaffected.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InputError {
    #[error("record {id} is dated {observed_on}, after the reference date {reference_date}")]
    FutureDated {
        id: String,
        observed_on: NaiveDate,
        reference_date: NaiveDate,
    },

    #[error("observation is {days} day(s) in the future")]
    NegativeAge { days: i64 },

    #[error("record {id} is missing {field}")]
    MissingField { id: String, field: &'static str },

    #[error("invalid {name}: {reason}")]
    InvalidParameter { name: &'static str, reason: String },
}
