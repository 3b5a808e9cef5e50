use chrono::{NaiveDate, Utc};

use crate::app_config::{
    AppConfig, Environment, LlmConfig, SamplingConfig, ScoringConfig, DEFAULT_BRAND_ORDER,
};
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if a value is malformed or fails validation.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if a value is malformed or fails validation.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the process environment so tests can drive it with a plain
/// `HashMap` lookup.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let invalid = |var: &str, reason: String| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason,
    };

    let parse_f64 = |var: &str, default: &str| -> Result<f64, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<f64>().map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u32>().map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u64>().map_err(|e| invalid(var, e.to_string()))
    };

    let parse_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<usize>().map_err(|e| invalid(var, e.to_string()))
    };

    let env = parse_environment(&or_default("SIGFUSE_ENV", "development"))?;
    let log_level = or_default("SIGFUSE_LOG_LEVEL", "info");
    let max_parallel_stages = parse_usize("SIGFUSE_MAX_PARALLEL_STAGES", "4")?;
    if max_parallel_stages == 0 {
        return Err(invalid(
            "SIGFUSE_MAX_PARALLEL_STAGES",
            "must be at least 1".to_string(),
        ));
    }

    let reference_date = match lookup("SIGFUSE_REFERENCE_DATE") {
        Ok(raw) => NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
            .map_err(|e| invalid("SIGFUSE_REFERENCE_DATE", e.to_string()))?,
        Err(_) => Utc::now().date_naive(),
    };

    let brand_order = match lookup("SIGFUSE_BRAND_ORDER") {
        Ok(raw) => parse_list(&raw),
        Err(_) => DEFAULT_BRAND_ORDER.iter().map(|b| (*b).to_string()).collect(),
    };

    let scoring = ScoringConfig {
        reference_date,
        decay_rate: parse_f64("SIGFUSE_DECAY_RATE", "0.05")?,
        threat_normalizer: parse_f64("SIGFUSE_THREAT_NORMALIZER", "5")?,
        act_now_threshold: parse_f64("SIGFUSE_ACT_NOW_THRESHOLD", "7")?,
        brand_order,
    };
    scoring.validate()?;

    let seed = match lookup("SIGFUSE_SEED") {
        Ok(raw) => Some(
            raw.parse::<u64>()
                .map_err(|e| invalid("SIGFUSE_SEED", e.to_string()))?,
        ),
        Err(_) => None,
    };

    let sampling = SamplingConfig {
        seed,
        competitor_sample_size: parse_usize("SIGFUSE_COMPETITOR_SAMPLE_SIZE", "500")?,
        competitor_lookback_days: parse_u32("SIGFUSE_COMPETITOR_LOOKBACK_DAYS", "60")?,
        context_sample_size: parse_usize("SIGFUSE_CONTEXT_SAMPLE_SIZE", "900")?,
        context_lookback_days: parse_u32("SIGFUSE_CONTEXT_LOOKBACK_DAYS", "120")?,
    };

    let llm_defaults = LlmConfig::default();
    let llm = LlmConfig {
        base_url: or_default("SIGFUSE_LLM_BASE_URL", &llm_defaults.base_url),
        api_key: lookup("SIGFUSE_LLM_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty()),
        model: or_default("SIGFUSE_LLM_MODEL", &llm_defaults.model),
        timeout_secs: parse_u64("SIGFUSE_LLM_TIMEOUT_SECS", "60")?,
        max_retries: parse_u32("SIGFUSE_LLM_MAX_RETRIES", "2")?,
        retry_backoff_base_ms: parse_u64("SIGFUSE_LLM_RETRY_BACKOFF_BASE_MS", "500")?,
    };
    if llm.timeout_secs == 0 {
        return Err(invalid(
            "SIGFUSE_LLM_TIMEOUT_SECS",
            "must be at least 1".to_string(),
        ));
    }

    Ok(AppConfig {
        env,
        log_level,
        max_parallel_stages,
        scoring,
        sampling,
        llm,
    })
}

/// Parse a string into an `Environment` variant.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "SIGFUSE_ENV".to_string(),
            reason: format!("unknown environment '{other}'"),
        }),
    }
}

/// Split a comma-separated list, dropping blank entries.
fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
