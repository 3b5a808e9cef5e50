use chrono::NaiveDate;

use crate::ConfigError;

pub const DEFAULT_DECAY_RATE: f64 = 0.05;
pub const DEFAULT_THREAT_NORMALIZER: f64 = 5.0;
pub const DEFAULT_ACT_NOW_THRESHOLD: f64 = 7.0;
pub const DEFAULT_BRAND_ORDER: &[&str] = &["McDonald's", "Burger King", "Taco Bell"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

/// Business parameters for recency scoring.
///
/// Threaded explicitly through every scoring call so runs are reproducible
/// against a pinned `reference_date`.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoringConfig {
    /// "Today" for age computation. Records dated after it are rejected.
    pub reference_date: NaiveDate,
    /// Per-day exponential decay. Smaller values let older signals keep influence.
    pub decay_rate: f64,
    /// Summed weight that maps to one threat point.
    pub threat_normalizer: f64,
    /// Relevance at or above which a window is labelled "Act Now".
    pub act_now_threshold: f64,
    /// Tie-break order when brands lead a mechanic with equal weight.
    pub brand_order: Vec<String>,
}

impl ScoringConfig {
    #[must_use]
    pub fn with_reference_date(reference_date: NaiveDate) -> Self {
        Self {
            reference_date,
            decay_rate: DEFAULT_DECAY_RATE,
            threat_normalizer: DEFAULT_THREAT_NORMALIZER,
            act_now_threshold: DEFAULT_ACT_NOW_THRESHOLD,
            brand_order: DEFAULT_BRAND_ORDER.iter().map(|b| (*b).to_string()).collect(),
        }
    }

    /// Check the numeric parameters are usable.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] if the decay rate or normalizer is
    /// not a positive finite number, or the threshold is outside `[0, 10]`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.decay_rate.is_finite() && self.decay_rate > 0.0) {
            return Err(ConfigError::Validation(format!(
                "decay rate must be a positive number, got {}",
                self.decay_rate
            )));
        }
        if !(self.threat_normalizer.is_finite() && self.threat_normalizer > 0.0) {
            return Err(ConfigError::Validation(format!(
                "threat normalizer must be a positive number, got {}",
                self.threat_normalizer
            )));
        }
        if !(0.0..=10.0).contains(&self.act_now_threshold) {
            return Err(ConfigError::Validation(format!(
                "act-now threshold must be within 0..=10, got {}",
                self.act_now_threshold
            )));
        }
        Ok(())
    }
}

/// Parameters for the randomized signal source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SamplingConfig {
    /// Fixed seed for reproducible sampling; `None` draws from OS entropy.
    pub seed: Option<u64>,
    pub competitor_sample_size: usize,
    pub competitor_lookback_days: u32,
    pub context_sample_size: usize,
    pub context_lookback_days: u32,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            seed: None,
            competitor_sample_size: 500,
            competitor_lookback_days: 60,
            context_sample_size: 900,
            context_lookback_days: 120,
        }
    }
}

/// Connection settings for the narrative/concept generation service.
#[derive(Clone, PartialEq, Eq)]
pub struct LlmConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub timeout_secs: u64,
    pub max_retries: u32,
    pub retry_backoff_base_ms: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            api_key: None,
            model: "gpt-4o-mini".to_string(),
            timeout_secs: 60,
            max_retries: 2,
            retry_backoff_base_ms: 500,
        }
    }
}

impl std::fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "[redacted]"))
            .field("model", &self.model)
            .field("timeout_secs", &self.timeout_secs)
            .field("max_retries", &self.max_retries)
            .field("retry_backoff_base_ms", &self.retry_backoff_base_ms)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub env: Environment,
    pub log_level: String,
    pub max_parallel_stages: usize,
    pub scoring: ScoringConfig,
    pub sampling: SamplingConfig,
    pub llm: LlmConfig,
}
