//! Prompt assembly for the two generation calls.

use sigfuse_core::{ContextWindow, ThreatEntry};

/// Offer mechanics that express each trend; passed to the concept prompt as
/// design constraints.
pub const TREND_MECHANIC_MAP: &[(&str, &str)] = &[
    ("Gamified Rewards", "challenge, streak, or unlock mechanic"),
    ("Late-Night Value", "time-boxed or after-hours unlock"),
    ("Surprise & Delight", "randomized reward trigger"),
    ("Subscription Meal Bundles", "recurring opt-in benefit"),
    ("App-Exclusive Perks", "mobile-only gated access"),
];

/// Aggregated evidence fused into one concept request.
#[derive(Debug, Clone, Copy)]
pub struct FusionEvidence<'a> {
    pub threats: &'a [ThreatEntry],
    pub insights: &'a [String],
    pub trend_summary: &'a str,
    pub windows: &'a [ContextWindow],
}

impl FusionEvidence<'_> {
    /// Trace ids of every threat and window in the evidence, in that order.
    #[must_use]
    pub fn references(&self) -> Vec<String> {
        self.threats
            .iter()
            .map(|t| t.reference_id.clone())
            .chain(self.windows.iter().map(|w| w.signal_id.clone()))
            .collect()
    }
}

#[must_use]
pub fn narrative_prompt(windows: &[ContextWindow]) -> String {
    format!(
        "Summarize the top emerging trends based on these timing and context signals:\n{}",
        windows_json(windows)
    )
}

#[must_use]
pub fn concept_prompt(evidence: &FusionEvidence<'_>) -> String {
    let gaps = if evidence.threats.is_empty() {
        "none detected".to_string()
    } else {
        evidence
            .threats
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("\n")
    };
    let constraints = TREND_MECHANIC_MAP
        .iter()
        .map(|(trend, mechanic)| format!("- {trend}: {mechanic}"))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "Design 2 offers: 1 Defensive response and 1 First-to-Market pivot.\n\
         \n\
         COMPETITOR GAPS:\n{gaps}\n\
         \n\
         CUSTOMER INSIGHTS:\n{insights}\n\
         \n\
         TRENDS:\n{trends}\n\
         \n\
         TOP SIGNALS:\n{signals}\n\
         \n\
         CONSTRAINTS (trend -> mechanic):\n{constraints}\n\
         \n\
         Return a JSON object with exactly two top-level keys:\n\
         1. \"intro\": a 2-sentence overall summary.\n\
         2. \"offers\": a list of objects, each with \"name\", \"rationale\", \
         \"type\" (\"Defensive\" or \"First-to-Market\"), \"feasibility\" (1-10), \
         \"impact\" (1-10).",
        insights = evidence.insights.join("\n"),
        trends = evidence.trend_summary,
        signals = windows_json(evidence.windows),
    )
}

fn windows_json(windows: &[ContextWindow]) -> String {
    serde_json::to_string_pretty(windows).unwrap_or_else(|_| "[]".to_string())
}
