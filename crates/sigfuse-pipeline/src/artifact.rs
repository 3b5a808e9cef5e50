//! Values flowing between strategy stages.

use sigfuse_core::{ContextWindow, PrioritizationRow, SignalRecord, ThreatEntry};
use sigfuse_fusion::{FusionOutcome, NarrativeOutcome};

#[derive(Debug, Clone, PartialEq)]
pub struct CompetitorIntel {
    pub threats: Vec<ThreatEntry>,
    pub summary: String,
}

/// Narrative together with the windows it was written from, so the concept
/// stage gets both through a single dependency.
#[derive(Debug, Clone, PartialEq)]
pub struct TrendBrief {
    pub narrative: NarrativeOutcome,
    pub windows: Vec<ContextWindow>,
}

/// Output of one strategy stage. Each stage writes exactly one variant.
#[derive(Debug, Clone, PartialEq)]
pub enum Artifact {
    Competitor(CompetitorIntel),
    Insights(Vec<String>),
    Signals(Vec<SignalRecord>),
    Windows(Vec<ContextWindow>),
    Trends(TrendBrief),
    Concepts(FusionOutcome),
    Scorecard(Vec<PrioritizationRow>),
}

impl Artifact {
    pub fn as_competitor(&self) -> Option<&CompetitorIntel> {
        match self {
            Self::Competitor(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_insights(&self) -> Option<&Vec<String>> {
        match self {
            Self::Insights(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_signals(&self) -> Option<&Vec<SignalRecord>> {
        match self {
            Self::Signals(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_windows(&self) -> Option<&Vec<ContextWindow>> {
        match self {
            Self::Windows(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_trends(&self) -> Option<&TrendBrief> {
        match self {
            Self::Trends(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_concepts(&self) -> Option<&FusionOutcome> {
        match self {
            Self::Concepts(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_scorecard(&self) -> Option<&Vec<PrioritizationRow>> {
        match self {
            Self::Scorecard(v) => Some(v),
            _ => None,
        }
    }
}
