//! Final, always fully-populated view of a strategy run.

use serde::Serialize;
use sigfuse_core::{ConceptCandidate, ContextWindow, PrioritizationRow, ThreatEntry};
use sigfuse_fusion::parse::FALLBACK_INTRO;

use crate::artifact::Artifact;
use crate::dag::{GraphRun, StageStatus};
use crate::error::{FaultKind, StageFault};
use crate::stages::{
    COMPETITOR_THREATS, CONCEPT_FUSION, CONTEXT_RANKING, CUSTOMER_INSIGHTS, SCORECARD,
    SIGNAL_GENERATION, TREND_NARRATIVE,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageReport {
    pub stage: String,
    pub status: StageStatus,
}

/// Every output key is present; a stage that did not complete leaves its
/// keys at their empty defaults and explains why in `faults`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineReport {
    pub competitor_summary: String,
    pub threats: Vec<ThreatEntry>,
    pub customer_insights: String,
    pub market_signal_count: usize,
    pub trend_narrative: String,
    pub context_windows: Vec<ContextWindow>,
    pub raw_concepts: String,
    pub concepts: Vec<ConceptCandidate>,
    pub final_report: String,
    pub prioritization: Vec<PrioritizationRow>,
    pub stages: Vec<StageReport>,
    pub faults: Vec<StageFault>,
    pub cancelled: bool,
}

impl PipelineReport {
    pub(crate) fn from_run(run: GraphRun<Artifact>) -> Self {
        let competitor = run
            .output(COMPETITOR_THREATS)
            .and_then(Artifact::as_competitor);
        let trends = run.output(TREND_NARRATIVE).and_then(Artifact::as_trends);
        let concepts = run.output(CONCEPT_FUSION).and_then(Artifact::as_concepts);

        let mut faults = run.faults.clone();
        if let Some(reason) = trends.and_then(|t| t.narrative.fallback_reason()) {
            faults.push(external_fault(TREND_NARRATIVE, reason));
        }
        if let Some(reason) = concepts.and_then(|c| c.fallback_reason()) {
            faults.push(external_fault(CONCEPT_FUSION, reason));
        }

        Self {
            competitor_summary: competitor.map(|c| c.summary.clone()).unwrap_or_default(),
            threats: competitor.map(|c| c.threats.clone()).unwrap_or_default(),
            customer_insights: run
                .output(CUSTOMER_INSIGHTS)
                .and_then(Artifact::as_insights)
                .map(|lines| lines.join("\n"))
                .unwrap_or_default(),
            market_signal_count: run
                .output(SIGNAL_GENERATION)
                .and_then(Artifact::as_signals)
                .map_or(0, Vec::len),
            trend_narrative: trends
                .map(|t| t.narrative.text().to_string())
                .unwrap_or_default(),
            context_windows: run
                .output(CONTEXT_RANKING)
                .and_then(Artifact::as_windows)
                .cloned()
                .unwrap_or_default(),
            raw_concepts: concepts
                .map(|c| c.bundle().raw.clone())
                .unwrap_or_default(),
            concepts: concepts
                .map(|c| c.bundle().concepts.clone())
                .unwrap_or_default(),
            final_report: concepts.map_or_else(
                || FALLBACK_INTRO.to_string(),
                |c| c.bundle().intro.clone(),
            ),
            prioritization: run
                .output(SCORECARD)
                .and_then(Artifact::as_scorecard)
                .cloned()
                .unwrap_or_default(),
            stages: run
                .statuses
                .iter()
                .map(|(stage, status)| StageReport {
                    stage: stage.clone(),
                    status: *status,
                })
                .collect(),
            faults,
            cancelled: run.cancelled,
        }
    }

    pub fn status(&self, stage: &str) -> Option<StageStatus> {
        self.stages
            .iter()
            .find(|s| s.stage == stage)
            .map(|s| s.status)
    }

    /// True when every stage finished and nothing fell back.
    pub fn is_clean(&self) -> bool {
        self.faults.is_empty() && !self.cancelled
    }
}

fn external_fault(stage: &str, reason: &str) -> StageFault {
    StageFault {
        stage: stage.to_string(),
        kind: FaultKind::ExternalService,
        message: reason.to_string(),
    }
}
