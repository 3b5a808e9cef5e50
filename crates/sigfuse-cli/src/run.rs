//! `sigfuse run`: build the pipeline from configuration and print its report.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use sigfuse_core::{AppConfig, LlmConfig, SamplingConfig};
use sigfuse_fusion::{
    ChatCompletionsClient, EvidenceFusionAdapter, GenerationService, UnavailableService,
};
use sigfuse_pipeline::{CancellationToken, PipelineReport, PipelineRequest, StrategyPipeline};
use sigfuse_sources::{FixtureSource, SeededSource, SignalSource};

#[derive(Debug)]
pub(crate) struct RunArgs {
    pub active: Vec<String>,
    pub seed: Option<u64>,
    pub fixtures: Option<PathBuf>,
    pub json: bool,
}

/// Execute one pipeline run. Ctrl-C cancels in-flight stages.
///
/// # Errors
///
/// Returns an error if the fixture file cannot be loaded, the generation
/// client cannot be built, or the report cannot be serialized.
pub(crate) async fn run_strategy(config: &AppConfig, args: RunArgs) -> anyhow::Result<()> {
    let source = build_source(&config.sampling, args.seed, args.fixtures.as_deref())?;
    let service = build_service(&config.llm)?;
    let adapter = EvidenceFusionAdapter::from_config(service, &config.llm);
    let pipeline = StrategyPipeline::new(source, adapter, config.scoring.clone())
        .with_max_parallel(config.max_parallel_stages);

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received, cancelling run");
            trigger.cancel();
        }
    });

    let report = pipeline
        .run_with_cancel(PipelineRequest::new(args.active), &cancel)
        .await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", render_text(&report));
    }
    Ok(())
}

fn build_source(
    sampling: &SamplingConfig,
    seed: Option<u64>,
    fixtures: Option<&Path>,
) -> anyhow::Result<Arc<dyn SignalSource>> {
    if let Some(path) = fixtures {
        tracing::info!(path = %path.display(), "reading fixture records");
        return Ok(Arc::new(FixtureSource::from_yaml_path(path)?));
    }
    let mut sampling = sampling.clone();
    if seed.is_some() {
        sampling.seed = seed;
    }
    Ok(Arc::new(SeededSource::new(sampling)))
}

fn build_service(llm: &LlmConfig) -> anyhow::Result<Arc<dyn GenerationService>> {
    if llm.api_key.is_none() {
        tracing::warn!("SIGFUSE_LLM_API_KEY is not set; narrative and concepts will use fallback output");
        return Ok(Arc::new(UnavailableService));
    }
    Ok(Arc::new(ChatCompletionsClient::from_config(llm)?))
}

/// Plain-text rendering of a report, one section per output key.
pub(crate) fn render_text(report: &PipelineReport) -> String {
    let mut out = Vec::new();

    out.push("== Competitor gaps ==".to_string());
    out.push(or_none(&report.competitor_summary));

    out.push(String::new());
    out.push("== Customer insights ==".to_string());
    out.push(or_none(&report.customer_insights));

    out.push(String::new());
    out.push(format!(
        "== Market trends ({} signals) ==",
        report.market_signal_count
    ));
    out.push(or_none(&report.trend_narrative));
    for w in &report.context_windows {
        out.push(format!(
            "{}  {} / {} / {} / {}  relevance {:.1}  {}",
            w.signal_id, w.trend, w.season, w.daypart, w.situation, w.relevance_score, w.action
        ));
    }

    out.push(String::new());
    out.push("== Strategy ==".to_string());
    out.push(report.final_report.clone());
    for row in &report.prioritization {
        out.push(format!(
            "{} [{}] feasibility {:.1}, impact {:.1}, confidence {:.2}",
            row.concept, row.concept_type, row.feasibility, row.impact, row.confidence
        ));
    }

    if !report.faults.is_empty() || report.cancelled {
        out.push(String::new());
        out.push("== Faults ==".to_string());
        if report.cancelled {
            out.push("run was cancelled".to_string());
        }
        for f in &report.faults {
            out.push(format!("[{}] {}: {}", f.stage, f.kind, f.message));
        }
    }

    out.push(String::new());
    out.join("\n")
}

fn or_none(text: &str) -> String {
    if text.trim().is_empty() {
        "(none)".to_string()
    } else {
        text.to_string()
    }
}
