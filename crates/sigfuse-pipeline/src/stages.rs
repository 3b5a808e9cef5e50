//! The strategy graph: which stages exist and what each one reads.

use std::collections::BTreeSet;
use std::sync::Arc;

use sigfuse_core::ScoringConfig;
use sigfuse_fusion::{EvidenceFusionAdapter, FusionEvidence};
use sigfuse_scoring::{assemble_scorecard, rank_context_windows, score_threats, summarize_threats};
use sigfuse_sources::SignalSource;

use crate::artifact::{Artifact, CompetitorIntel, TrendBrief};
use crate::dag::{Dependency, StageGraph, StageInputs};
use crate::error::StageError;

pub const COMPETITOR_THREATS: &str = "competitor_threats";
pub const CUSTOMER_INSIGHTS: &str = "customer_insights";
pub const SIGNAL_GENERATION: &str = "signal_generation";
pub const CONTEXT_RANKING: &str = "context_ranking";
pub const TREND_NARRATIVE: &str = "trend_narrative";
pub const CONCEPT_FUSION: &str = "concept_fusion";
pub const SCORECARD: &str = "scorecard";

/// Everything a stage body may touch. Shared read-only across stages.
pub(crate) struct StageContext {
    pub source: Arc<dyn SignalSource>,
    pub fusion: Arc<EvidenceFusionAdapter>,
    pub scoring: ScoringConfig,
    pub active_categories: BTreeSet<String>,
}

pub(crate) fn build_strategy_graph(ctx: &Arc<StageContext>) -> StageGraph<Artifact> {
    let mut graph = StageGraph::new();

    let c = Arc::clone(ctx);
    graph.add_stage(COMPETITOR_THREATS, vec![], move |_| {
        let ctx = Arc::clone(&c);
        async move { ctx.competitor_threats() }
    });

    let c = Arc::clone(ctx);
    graph.add_stage(CUSTOMER_INSIGHTS, vec![], move |_| {
        let ctx = Arc::clone(&c);
        async move { ctx.customer_insights() }
    });

    let c = Arc::clone(ctx);
    graph.add_stage(SIGNAL_GENERATION, vec![], move |_| {
        let ctx = Arc::clone(&c);
        async move { ctx.signal_generation() }
    });

    let c = Arc::clone(ctx);
    graph.add_stage(
        CONTEXT_RANKING,
        vec![Dependency::required(SIGNAL_GENERATION)],
        move |inputs| {
            let ctx = Arc::clone(&c);
            async move { ctx.context_ranking(&inputs) }
        },
    );

    let c = Arc::clone(ctx);
    graph.add_stage(
        TREND_NARRATIVE,
        vec![Dependency::required(CONTEXT_RANKING)],
        move |inputs| {
            let ctx = Arc::clone(&c);
            async move { ctx.trend_narrative(&inputs).await }
        },
    );

    let c = Arc::clone(ctx);
    graph.add_stage(
        CONCEPT_FUSION,
        vec![
            Dependency::required(TREND_NARRATIVE),
            Dependency::required(COMPETITOR_THREATS),
            Dependency::required(CUSTOMER_INSIGHTS),
        ],
        move |inputs| {
            let ctx = Arc::clone(&c);
            async move { ctx.concept_fusion(&inputs).await }
        },
    );

    graph.add_stage(
        SCORECARD,
        vec![Dependency::defaulted(CONCEPT_FUSION)],
        |inputs| async move { Ok::<_, StageError>(scorecard(&inputs)) },
    );

    graph
}

impl StageContext {
    fn competitor_threats(&self) -> Result<Artifact, StageError> {
        let records = self.source.competitor_records(self.scoring.reference_date)?;
        let threats = score_threats(&records, &self.active_categories, &self.scoring)?;
        let summary = summarize_threats(&threats);
        Ok(Artifact::Competitor(CompetitorIntel { threats, summary }))
    }

    fn customer_insights(&self) -> Result<Artifact, StageError> {
        Ok(Artifact::Insights(self.source.customer_insights()?))
    }

    fn signal_generation(&self) -> Result<Artifact, StageError> {
        let records = self.source.context_records(self.scoring.reference_date)?;
        Ok(Artifact::Signals(records))
    }

    fn context_ranking(&self, inputs: &StageInputs<Artifact>) -> Result<Artifact, StageError> {
        let signals = dependency(inputs, SIGNAL_GENERATION, Artifact::as_signals)?;
        let windows = rank_context_windows(signals, &self.scoring)?;
        Ok(Artifact::Windows(windows))
    }

    async fn trend_narrative(
        &self,
        inputs: &StageInputs<Artifact>,
    ) -> Result<Artifact, StageError> {
        let windows = dependency(inputs, CONTEXT_RANKING, Artifact::as_windows)?;
        let narrative = self.fusion.narrate(windows).await;
        Ok(Artifact::Trends(TrendBrief {
            narrative,
            windows: windows.clone(),
        }))
    }

    async fn concept_fusion(&self, inputs: &StageInputs<Artifact>) -> Result<Artifact, StageError> {
        let trends = dependency(inputs, TREND_NARRATIVE, Artifact::as_trends)?;
        let competitor = dependency(inputs, COMPETITOR_THREATS, Artifact::as_competitor)?;
        let insights = dependency(inputs, CUSTOMER_INSIGHTS, Artifact::as_insights)?;
        let evidence = FusionEvidence {
            threats: &competitor.threats,
            insights,
            trend_summary: trends.narrative.text(),
            windows: &trends.windows,
        };
        Ok(Artifact::Concepts(self.fusion.fuse(&evidence).await))
    }
}

/// Prioritization over whatever concepts exist; none when concept fusion
/// did not complete.
fn scorecard(inputs: &StageInputs<Artifact>) -> Artifact {
    let rows = inputs
        .get(CONCEPT_FUSION)
        .and_then(Artifact::as_concepts)
        .map(|outcome| assemble_scorecard(&outcome.bundle().concepts))
        .unwrap_or_default();
    Artifact::Scorecard(rows)
}

/// Typed view of a dependency's output. A missing or mis-shaped value is an
/// internal fault; the executor only launches a stage once its required
/// dependencies are done.
fn dependency<'a, T: ?Sized>(
    inputs: &'a StageInputs<Artifact>,
    stage: &str,
    pick: fn(&Artifact) -> Option<&T>,
) -> Result<&'a T, StageError> {
    inputs
        .get(stage)
        .and_then(pick)
        .ok_or_else(|| StageError::internal(format!("missing output of stage '{stage}'")))
}
