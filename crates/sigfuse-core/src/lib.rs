//! Shared domain types, configuration, and input errors for the signal
//! fusion pipeline.

pub mod app_config;
pub mod config;
pub mod error;
pub mod types;

pub use app_config::{AppConfig, Environment, LlmConfig, SamplingConfig, ScoringConfig};
pub use config::{load_app_config, load_app_config_from_env};
pub use error::{ConfigError, InputError};
pub use types::{
    round_to, ConceptCandidate, ConceptType, ContextTags, ContextWindow, PrioritizationRow,
    SignalRecord, ThreatEntry, TimingAction,
};
