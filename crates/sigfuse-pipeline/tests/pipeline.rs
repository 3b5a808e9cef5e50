//! End-to-end strategy runs over fixture records and a scripted generation service.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{Duration as Days, NaiveDate};
use futures::future::BoxFuture;
use futures::FutureExt;
use sigfuse_core::{ContextTags, ScoringConfig, SignalRecord, TimingAction};
use sigfuse_fusion::{
    EvidenceFusionAdapter, FusionError, GenerationRequest, GenerationService, FALLBACK_NARRATIVE,
};
use sigfuse_pipeline::stages::{
    COMPETITOR_THREATS, CONCEPT_FUSION, CONTEXT_RANKING, SCORECARD, TREND_NARRATIVE,
};
use sigfuse_pipeline::{
    CancellationToken, FaultKind, PipelineReport, PipelineRequest, StageStatus, StrategyPipeline,
};
use sigfuse_sources::FixtureSource;

const CONCEPTS: &str = r#"{
    "intro": "Answer BOGO, then own late night.",
    "offers": [
        {"name": "Double Down Deal", "rationale": "Blunts BOGO", "type": "Defensive", "feasibility": 8, "impact": 6},
        {"name": "Midnight Unlock", "rationale": "First mover", "type": "First-to-Market", "feasibility": 6, "impact": 9}
    ]
}"#;

/// Scripted generation service: fixed narrative text, fixed structured body.
struct Scripted {
    narrative: Result<String, u16>,
    structured: Result<String, u16>,
    hang: bool,
    calls: AtomicUsize,
}

impl Scripted {
    fn new(narrative: &str, structured: &str) -> Self {
        Self {
            narrative: Ok(narrative.to_string()),
            structured: Ok(structured.to_string()),
            hang: false,
            calls: AtomicUsize::new(0),
        }
    }

    fn failing(status: u16) -> Self {
        Self {
            narrative: Err(status),
            structured: Err(status),
            hang: false,
            calls: AtomicUsize::new(0),
        }
    }

    fn hanging() -> Self {
        Self {
            hang: true,
            ..Self::new("", "")
        }
    }
}

impl GenerationService for Scripted {
    fn generate<'a>(
        &'a self,
        request: &'a GenerationRequest,
    ) -> BoxFuture<'a, Result<String, FusionError>> {
        async move {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.hang {
                futures::future::pending::<()>().await;
            }
            let reply = if request.want_structured {
                &self.structured
            } else {
                &self.narrative
            };
            reply.clone().map_err(|status| FusionError::Status {
                status,
                body: "scripted".to_string(),
            })
        }
        .boxed()
    }
}

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 1, 24).unwrap()
}

fn competitor(id: &str, mechanic: &str, brand: &str, age: i64) -> SignalRecord {
    SignalRecord::competitor(id, mechanic, brand, today() - Days::days(age))
}

fn context(id: &str, age: i64) -> SignalRecord {
    SignalRecord::trend(
        id,
        "Late-Night Value",
        "TikTok",
        today() - Days::days(age),
        ContextTags {
            season: "Winter".to_string(),
            daypart: "Late Night".to_string(),
            situation: "Payday".to_string(),
        },
    )
}

fn bogo_and_loyalty() -> Vec<SignalRecord> {
    vec![
        competitor("b1", "BOGO", "Taco Bell", 1),
        competitor("b2", "BOGO", "Taco Bell", 10),
        competitor("b3", "BOGO", "Burger King", 50),
        competitor("l1", "Loyalty Multiplier", "McDonald's", 2),
        competitor("l2", "Loyalty Multiplier", "McDonald's", 2),
    ]
}

fn four_fresh_contexts() -> Vec<SignalRecord> {
    (0..4).map(|i| context(&format!("c{i}"), 0)).collect()
}

fn pipeline(source: FixtureSource, service: Arc<Scripted>) -> StrategyPipeline {
    let adapter = EvidenceFusionAdapter::new(service, Duration::from_secs(5));
    StrategyPipeline::new(
        Arc::new(source),
        adapter,
        ScoringConfig::with_reference_date(today()),
    )
}

async fn run(source: FixtureSource, service: Arc<Scripted>) -> PipelineReport {
    pipeline(source, service)
        .run(PipelineRequest::new(["Loyalty Multiplier"]))
        .await
        .expect("strategy graph is valid")
}

#[tokio::test]
async fn full_run_produces_every_output() {
    let service = Arc::new(Scripted::new("Late-night value is surging.", CONCEPTS));
    let source = FixtureSource::new(bogo_and_loyalty(), four_fresh_contexts());

    let report = run(source, Arc::clone(&service)).await;

    assert!(report.is_clean(), "unexpected faults: {:?}", report.faults);
    assert_eq!(report.threats.len(), 1);
    assert_eq!(report.threats[0].mechanic, "BOGO");
    assert_eq!(report.threats[0].leading_brand, "Taco Bell");
    assert_eq!(report.threats[0].reference_id, "b1");
    assert!(report.competitor_summary.starts_with("BOGO driven by Taco Bell (Threat: "));
    assert!(!report.competitor_summary.contains("Loyalty"));

    assert_eq!(report.market_signal_count, 4);
    assert_eq!(report.context_windows.len(), 1);
    assert_eq!(report.context_windows[0].relevance_score, 10.0);
    assert_eq!(report.context_windows[0].action, TimingAction::ActNow);

    assert_eq!(report.trend_narrative, "Late-night value is surging.");
    assert_eq!(report.final_report, "Answer BOGO, then own late night.");
    assert_eq!(report.raw_concepts, CONCEPTS);
    assert_eq!(report.concepts.len(), 2);
    assert_eq!(report.concepts[0].evidence, vec!["b1", "CTX-0"]);
    assert!(!report.customer_insights.is_empty());

    assert_eq!(report.prioritization.len(), 2);
    assert_eq!(report.prioritization[0].concept, "Double Down Deal");
    assert_eq!(report.prioritization[0].confidence, 0.7);
    assert_eq!(service.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn fixture_insights_replace_the_defaults() {
    let service = Arc::new(Scripted::new("quiet", CONCEPTS));
    let source = FixtureSource::new(bogo_and_loyalty(), four_fresh_contexts()).with_insights(vec![
        "Breakfast redemptions doubled after the app relaunch.".to_string(),
        "Late-night orders skew to delivery.".to_string(),
    ]);

    let report = run(source, service).await;

    assert_eq!(
        report.customer_insights,
        "Breakfast redemptions doubled after the app relaunch.\nLate-night orders skew to delivery."
    );
}

#[tokio::test]
async fn missing_offers_completes_with_empty_concepts() {
    let service = Arc::new(Scripted::new("quiet", r#"{"intro": "Hold steady."}"#));
    let source = FixtureSource::new(bogo_and_loyalty(), four_fresh_contexts());

    let report = run(source, service).await;

    assert!(report.concepts.is_empty());
    assert!(report.prioritization.is_empty());
    assert!(!report.final_report.is_empty());
    assert_eq!(report.status(SCORECARD), Some(StageStatus::Done));
}

#[tokio::test]
async fn service_failure_degrades_to_fallback() {
    let service = Arc::new(Scripted::failing(503));
    let source = FixtureSource::new(bogo_and_loyalty(), four_fresh_contexts());

    let report = run(source, service).await;

    assert_eq!(report.status(TREND_NARRATIVE), Some(StageStatus::Done));
    assert_eq!(report.status(CONCEPT_FUSION), Some(StageStatus::Done));
    assert_eq!(report.trend_narrative, FALLBACK_NARRATIVE);
    assert!(report.concepts.is_empty());
    assert!(!report.final_report.is_empty());

    let external: Vec<&str> = report
        .faults
        .iter()
        .filter(|f| f.kind == FaultKind::ExternalService)
        .map(|f| f.stage.as_str())
        .collect();
    assert_eq!(external, vec![TREND_NARRATIVE, CONCEPT_FUSION]);
}

#[tokio::test]
async fn future_dated_competitor_record_skips_fusion_but_not_scorecard() {
    let mut records = bogo_and_loyalty();
    records.push(competitor("late", "BOGO", "Taco Bell", -3));
    let service = Arc::new(Scripted::new("narrative", CONCEPTS));
    let source = FixtureSource::new(records, four_fresh_contexts());

    let report = run(source, Arc::clone(&service)).await;

    assert_eq!(
        report.status(COMPETITOR_THREATS),
        Some(StageStatus::Failed(FaultKind::Input))
    );
    assert_eq!(report.status(CONTEXT_RANKING), Some(StageStatus::Done));
    assert_eq!(report.status(CONCEPT_FUSION), Some(StageStatus::Skipped));
    assert_eq!(report.status(SCORECARD), Some(StageStatus::Done));
    assert!(report.prioritization.is_empty());
    assert!(report.threats.is_empty());
    assert_eq!(report.context_windows.len(), 1);
    assert!(report
        .faults
        .iter()
        .any(|f| f.stage == COMPETITOR_THREATS && f.message.contains("late")));
    assert_eq!(service.calls.load(Ordering::SeqCst), 1, "only the narrative call runs");
}

#[tokio::test]
async fn empty_sources_still_fill_every_key() {
    let service = Arc::new(Scripted::new("nothing yet", r#"{"offers": []}"#));
    let report = run(FixtureSource::new(Vec::new(), Vec::new()), service).await;

    assert!(report.threats.is_empty());
    assert_eq!(report.competitor_summary, "");
    assert!(report.context_windows.is_empty());
    assert!(report.concepts.is_empty());
    assert!(report.is_clean());

    let json = serde_json::to_value(&report).unwrap();
    for key in [
        "competitor_summary",
        "customer_insights",
        "trend_narrative",
        "context_windows",
        "raw_concepts",
        "concepts",
        "final_report",
        "prioritization",
        "faults",
    ] {
        assert!(json.get(key).is_some(), "missing key {key}");
    }
}

#[tokio::test]
async fn cancellation_abandons_generation_calls() {
    let service = Arc::new(Scripted::hanging());
    let source = FixtureSource::new(bogo_and_loyalty(), four_fresh_contexts());
    let pipeline = pipeline(source, service);

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        trigger.cancel();
    });

    let report = tokio::time::timeout(
        Duration::from_secs(3),
        pipeline.run_with_cancel(PipelineRequest::default(), &cancel),
    )
    .await
    .expect("cancel should end the run")
    .expect("strategy graph is valid");

    assert!(report.cancelled);
    assert_eq!(
        report.status(TREND_NARRATIVE),
        Some(StageStatus::Failed(FaultKind::Cancelled))
    );
    assert_eq!(report.status(CONCEPT_FUSION), Some(StageStatus::Skipped));
    assert_eq!(report.status(SCORECARD), Some(StageStatus::Skipped));
    assert_eq!(report.trend_narrative, "");
    assert!(report.concepts.is_empty());
    assert_eq!(report.status(COMPETITOR_THREATS), Some(StageStatus::Done));
}
