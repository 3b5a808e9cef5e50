//! Defensive decoding of structured concept payloads.
//!
//! Every field read goes through an explicit default; the only hard failures
//! are text that is not JSON and JSON that is not an object.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use sigfuse_core::{ConceptCandidate, ConceptType};

use crate::error::FusionError;

pub const DEFAULT_INTRO: &str = "Strategy generated successfully.";
pub const FALLBACK_INTRO: &str = "Error refining strategy. Please try again.";
pub const DEFAULT_CONCEPT_NAME: &str = "Unnamed Concept";
pub const DEFAULT_RATIONALE: &str = "No rationale provided.";
/// Mid-scale value used when feasibility or impact is absent.
pub const DEFAULT_SCORE: f64 = 5.0;

static CODE_FENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)^\s*```[A-Za-z]*\s*(.*?)\s*```\s*$").expect("valid code fence regex")
});

/// Decoded concept stage output.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConceptBundle {
    pub intro: String,
    pub concepts: Vec<ConceptCandidate>,
    /// Response text exactly as received.
    pub raw: String,
}

impl ConceptBundle {
    /// Placeholder output used when the structured call cannot be trusted.
    #[must_use]
    pub fn fallback(raw: String) -> Self {
        Self {
            intro: FALLBACK_INTRO.to_string(),
            concepts: Vec::new(),
            raw,
        }
    }
}

/// Decode a structured response into concepts.
///
/// Accepts the intro under `intro` or `report_intro`. A missing or non-list
/// `offers` is an empty concept list. Non-object offer entries are skipped.
/// Every concept is tagged with `evidence`.
///
/// # Errors
///
/// - [`FusionError::Deserialize`] if the text is not JSON.
/// - [`FusionError::InvalidPayload`] if the JSON is not an object.
pub fn parse_concepts(raw: &str, evidence: &[String]) -> Result<ConceptBundle, FusionError> {
    let body = strip_code_fence(raw);
    let value: Value = serde_json::from_str(body).map_err(|e| FusionError::Deserialize {
        context: "structured concept payload".to_string(),
        source: e,
    })?;

    let Value::Object(map) = value else {
        return Err(FusionError::InvalidPayload(format!(
            "expected a JSON object, got {}",
            kind_of(&value)
        )));
    };

    let intro = ["intro", "report_intro"]
        .iter()
        .find_map(|key| non_empty_str(map.get(*key)))
        .unwrap_or(DEFAULT_INTRO)
        .to_string();

    let concepts = match map.get("offers") {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| {
                let concept = read_concept(item, evidence);
                if concept.is_none() {
                    tracing::warn!(entry = %item, "skipping non-object offer entry");
                }
                concept
            })
            .collect(),
        Some(other) => {
            tracing::warn!(kind = kind_of(other), "offers is not a list; using none");
            Vec::new()
        }
        None => Vec::new(),
    };

    Ok(ConceptBundle {
        intro,
        concepts,
        raw: raw.to_string(),
    })
}

fn read_concept(item: &Value, evidence: &[String]) -> Option<ConceptCandidate> {
    let obj = item.as_object()?;
    Some(ConceptCandidate {
        name: non_empty_str(obj.get("name"))
            .unwrap_or(DEFAULT_CONCEPT_NAME)
            .to_string(),
        rationale: non_empty_str(obj.get("rationale"))
            .unwrap_or(DEFAULT_RATIONALE)
            .to_string(),
        concept_type: non_empty_str(obj.get("type"))
            .map_or_else(|| ConceptType::Unspecified(String::new()), ConceptType::from_label),
        feasibility: read_score(obj.get("feasibility")),
        impact: read_score(obj.get("impact")),
        evidence: evidence.to_vec(),
    })
}

/// A 1-10 score from a number or numeric string; anything else is mid-scale.
fn read_score(value: Option<&Value>) -> f64 {
    let parsed = match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed
        .filter(|v| v.is_finite())
        .map_or(DEFAULT_SCORE, |v| v.clamp(1.0, 10.0))
}

fn non_empty_str(value: Option<&Value>) -> Option<&str> {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

fn strip_code_fence(raw: &str) -> &str {
    CODE_FENCE
        .captures(raw)
        .and_then(|c| c.get(1))
        .map_or(raw, |m| m.as_str())
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
