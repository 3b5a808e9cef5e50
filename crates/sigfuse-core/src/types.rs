//! Domain entities shared by every stage of the fusion pipeline.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Timing tags carried by trend-context records.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContextTags {
    pub season: String,
    pub daypart: String,
    pub situation: String,
}

/// One observed market event.
///
/// For competitor activity `category` is the promotion mechanic and `channel`
/// the brand running it. For trend context `category` is the trend and
/// `channel` the source it was observed on, with `context` carrying the
/// season / daypart / situation tags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalRecord {
    pub id: String,
    pub category: String,
    pub channel: String,
    pub observed_on: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<ContextTags>,
}

impl SignalRecord {
    #[must_use]
    pub fn competitor(id: &str, mechanic: &str, brand: &str, observed_on: NaiveDate) -> Self {
        Self {
            id: id.to_string(),
            category: mechanic.to_string(),
            channel: brand.to_string(),
            observed_on,
            context: None,
        }
    }

    #[must_use]
    pub fn trend(
        id: &str,
        trend: &str,
        source: &str,
        observed_on: NaiveDate,
        context: ContextTags,
    ) -> Self {
        Self {
            id: id.to_string(),
            category: trend.to_string(),
            channel: source.to_string(),
            observed_on,
            context: Some(context),
        }
    }
}

/// A competitor mechanic not covered by the subject's active offers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreatEntry {
    pub mechanic: String,
    pub leading_brand: String,
    /// Normalized urgency in `[0, 10]`, one decimal.
    pub threat_score: f64,
    /// Id of the least-decayed record in the group.
    pub reference_id: String,
}

impl std::fmt::Display for ThreatEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} driven by {} (Threat: {:.1}/10) [Ref ID: {}]",
            self.mechanic, self.leading_brand, self.threat_score, self.reference_id
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimingAction {
    #[serde(rename = "Act Now")]
    ActNow,
    #[serde(rename = "Monitor")]
    Monitor,
}

impl std::fmt::Display for TimingAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TimingAction::ActNow => write!(f, "Act Now"),
            TimingAction::Monitor => write!(f, "Monitor"),
        }
    }
}

/// A ranked timing opportunity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextWindow {
    pub signal_id: String,
    pub trend: String,
    pub season: String,
    pub daypart: String,
    pub situation: String,
    /// Summed decay weight of the group, rounded to 2 decimals.
    pub timing_strength: f64,
    /// Strength relative to the strongest group in the batch, in `[0, 10]`.
    pub relevance_score: f64,
    pub action: TimingAction,
}

/// Serialized as its display label (`"Defensive"`, `"First-to-Market"`, `"N/A"`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum ConceptType {
    Defensive,
    FirstToMarket,
    Unspecified(String),
}

impl ConceptType {
    /// Loose classification of a free-form label returned by the generation service.
    #[must_use]
    pub fn from_label(label: &str) -> Self {
        let lower = label.to_lowercase();
        if lower.contains("defens") {
            ConceptType::Defensive
        } else if lower.contains("first") {
            ConceptType::FirstToMarket
        } else {
            ConceptType::Unspecified(label.to_string())
        }
    }
}

impl std::fmt::Display for ConceptType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConceptType::Defensive => write!(f, "Defensive"),
            ConceptType::FirstToMarket => write!(f, "First-to-Market"),
            ConceptType::Unspecified(label) if label.is_empty() => write!(f, "N/A"),
            ConceptType::Unspecified(label) => write!(f, "{label}"),
        }
    }
}

impl From<ConceptType> for String {
    fn from(value: ConceptType) -> Self {
        value.to_string()
    }
}

impl From<String> for ConceptType {
    fn from(label: String) -> Self {
        if label == "N/A" {
            ConceptType::Unspecified(String::new())
        } else {
            ConceptType::from_label(&label)
        }
    }
}

/// A generated strategic offer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConceptCandidate {
    pub name: String,
    pub rationale: String,
    pub concept_type: ConceptType,
    /// In `[1, 10]`.
    pub feasibility: f64,
    /// In `[1, 10]`.
    pub impact: f64,
    pub evidence: Vec<String>,
}

/// One row of the final scorecard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrioritizationRow {
    pub concept: String,
    pub feasibility: f64,
    pub impact: f64,
    /// `(impact + feasibility) / 20`, two decimals.
    pub confidence: f64,
    pub concept_type: ConceptType,
}

/// Round half away from zero to `places` decimals.
#[must_use]
pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10_f64.powi(places);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn threat_entry_renders_summary_line() {
        let entry = ThreatEntry {
            mechanic: "BOGO".to_string(),
            leading_brand: "Burger King".to_string(),
            threat_score: 4.0,
            reference_id: "a1b2c3d4".to_string(),
        };
        assert_eq!(
            entry.to_string(),
            "BOGO driven by Burger King (Threat: 4.0/10) [Ref ID: a1b2c3d4]"
        );
    }

    #[test]
    fn concept_type_from_label() {
        assert_eq!(ConceptType::from_label("Defensive"), ConceptType::Defensive);
        assert_eq!(
            ConceptType::from_label("First-to-Market"),
            ConceptType::FirstToMarket
        );
        assert_eq!(
            ConceptType::from_label("Hybrid"),
            ConceptType::Unspecified("Hybrid".to_string())
        );
    }

    #[test]
    fn unspecified_empty_label_displays_na() {
        assert_eq!(ConceptType::Unspecified(String::new()).to_string(), "N/A");
    }

    #[test]
    fn prioritization_row_type_is_a_plain_label() {
        let row = |concept_type| PrioritizationRow {
            concept: "Midnight Unlock".to_string(),
            feasibility: 6.0,
            impact: 9.0,
            confidence: 0.75,
            concept_type,
        };
        let labels: Vec<serde_json::Value> = [
            ConceptType::Defensive,
            ConceptType::FirstToMarket,
            ConceptType::Unspecified(String::new()),
            ConceptType::Unspecified("Hybrid".to_string()),
        ]
        .into_iter()
        .map(|t| serde_json::to_value(row(t)).unwrap()["concept_type"].clone())
        .collect();

        assert_eq!(
            labels,
            vec![
                serde_json::json!("Defensive"),
                serde_json::json!("First-to-Market"),
                serde_json::json!("N/A"),
                serde_json::json!("Hybrid"),
            ]
        );
    }

    #[test]
    fn concept_type_reads_back_from_label() {
        let na: ConceptType = serde_json::from_str("\"N/A\"").unwrap();
        assert_eq!(na, ConceptType::Unspecified(String::new()));
        let first: ConceptType = serde_json::from_str("\"First-to-Market\"").unwrap();
        assert_eq!(first, ConceptType::FirstToMarket);
    }

    #[test]
    fn timing_action_serializes_as_label() {
        let json = serde_json::to_string(&TimingAction::ActNow).unwrap();
        assert_eq!(json, "\"Act Now\"");
    }

    #[test]
    fn round_to_one_and_two_places() {
        assert_eq!(round_to(3.456, 1), 3.5);
        assert_eq!(round_to(0.7, 2), 0.7);
        assert_eq!(round_to(2.345_678, 2), 2.35);
    }

    #[test]
    fn signal_record_roundtrips_without_context() {
        let date = NaiveDate::from_ymd_opt(2026, 1, 20).unwrap();
        let record = SignalRecord::competitor("r1", "BOGO", "Taco Bell", date);
        let json = serde_json::to_value(&record).unwrap();
        assert!(json.get("context").is_none());
    }
}
