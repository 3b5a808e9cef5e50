//! Strategy pipeline orchestration.
//!
//! [`StrategyPipeline::run`] wires the signal source, scoring functions and
//! fusion adapter into a [`StageGraph`] and executes it once. Independent
//! branches run concurrently; each invocation owns its own state.

pub mod artifact;
pub mod cancel;
pub mod dag;
pub mod error;
pub mod report;
pub mod stages;

use std::collections::BTreeSet;
use std::sync::Arc;

use sigfuse_core::ScoringConfig;
use sigfuse_fusion::EvidenceFusionAdapter;
use sigfuse_sources::SignalSource;

pub use cancel::CancellationToken;
pub use dag::{Dependency, EdgeKind, GraphRun, StageGraph, StageInputs, StageStatus};
pub use error::{FaultKind, GraphError, StageError, StageFault};
pub use report::{PipelineReport, StageReport};

use crate::stages::{build_strategy_graph, StageContext};

pub const DEFAULT_MAX_PARALLEL: usize = 4;

/// One pipeline invocation: mechanics already covered by our own offers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineRequest {
    pub active_categories: BTreeSet<String>,
}

impl PipelineRequest {
    pub fn new<I, S>(active_categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            active_categories: active_categories.into_iter().map(Into::into).collect(),
        }
    }
}

pub struct StrategyPipeline {
    source: Arc<dyn SignalSource>,
    fusion: Arc<EvidenceFusionAdapter>,
    scoring: ScoringConfig,
    max_parallel: usize,
}

impl StrategyPipeline {
    pub fn new(
        source: Arc<dyn SignalSource>,
        fusion: EvidenceFusionAdapter,
        scoring: ScoringConfig,
    ) -> Self {
        Self {
            source,
            fusion: Arc::new(fusion),
            scoring,
            max_parallel: DEFAULT_MAX_PARALLEL,
        }
    }

    #[must_use]
    pub fn with_max_parallel(mut self, max_parallel: usize) -> Self {
        self.max_parallel = max_parallel.max(1);
        self
    }

    /// Run every stage to completion.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError`] only if the stage graph itself is malformed.
    /// Stage failures are recorded in the report, never returned.
    pub async fn run(&self, request: PipelineRequest) -> Result<PipelineReport, GraphError> {
        self.run_with_cancel(request, &CancellationToken::new()).await
    }

    /// Like [`run`](Self::run), abandoning in-flight stages once `cancel` fires.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError`] only if the stage graph itself is malformed.
    pub async fn run_with_cancel(
        &self,
        request: PipelineRequest,
        cancel: &CancellationToken,
    ) -> Result<PipelineReport, GraphError> {
        let ctx = Arc::new(StageContext {
            source: Arc::clone(&self.source),
            fusion: Arc::clone(&self.fusion),
            scoring: self.scoring.clone(),
            active_categories: request.active_categories,
        });
        let graph = build_strategy_graph(&ctx);

        tracing::info!(
            reference_date = %self.scoring.reference_date,
            active = ctx.active_categories.len(),
            max_parallel = self.max_parallel,
            "strategy run starting"
        );
        let run = graph.execute(self.max_parallel, cancel).await?;
        let report = PipelineReport::from_run(run);
        tracing::info!(
            faults = report.faults.len(),
            concepts = report.concepts.len(),
            cancelled = report.cancelled,
            "strategy run finished"
        );
        Ok(report)
    }
}
