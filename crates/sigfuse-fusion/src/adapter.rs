//! Evidence fusion: the two generation calls with timeouts and fallbacks.
//!
//! Neither call returns an error to the caller. Transport failures, timeouts
//! and unusable payloads all become a `Fallback` outcome carrying the reason,
//! so the pipeline keeps going with placeholder output.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use sigfuse_core::{ContextWindow, LlmConfig};

use crate::client::{GenerationRequest, GenerationService};
use crate::error::FusionError;
use crate::parse::{parse_concepts, ConceptBundle};
use crate::prompt::{concept_prompt, narrative_prompt, FusionEvidence};
use crate::retry::RetryPolicy;

pub const FALLBACK_NARRATIVE: &str = "Market trend narrative unavailable.";

#[derive(Debug, Clone, PartialEq)]
pub enum NarrativeOutcome {
    Valid(String),
    Fallback { text: String, reason: String },
}

impl NarrativeOutcome {
    #[must_use]
    pub fn text(&self) -> &str {
        match self {
            Self::Valid(text) | Self::Fallback { text, .. } => text,
        }
    }

    #[must_use]
    pub fn fallback_reason(&self) -> Option<&str> {
        match self {
            Self::Valid(_) => None,
            Self::Fallback { reason, .. } => Some(reason),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FusionOutcome {
    Valid(ConceptBundle),
    Fallback { bundle: ConceptBundle, reason: String },
}

impl FusionOutcome {
    #[must_use]
    pub fn bundle(&self) -> &ConceptBundle {
        match self {
            Self::Valid(bundle) | Self::Fallback { bundle, .. } => bundle,
        }
    }

    #[must_use]
    pub fn into_bundle(self) -> ConceptBundle {
        match self {
            Self::Valid(bundle) | Self::Fallback { bundle, .. } => bundle,
        }
    }

    #[must_use]
    pub fn fallback_reason(&self) -> Option<&str> {
        match self {
            Self::Valid(_) => None,
            Self::Fallback { reason, .. } => Some(reason),
        }
    }
}

/// Boundary between aggregated evidence and the generation service.
#[derive(Clone)]
pub struct EvidenceFusionAdapter {
    service: Arc<dyn GenerationService>,
    timeout: Duration,
}

impl EvidenceFusionAdapter {
    #[must_use]
    pub fn new(service: Arc<dyn GenerationService>, timeout: Duration) -> Self {
        Self { service, timeout }
    }

    /// Deadline covers every attempt the client may make at its full
    /// request timeout, plus the worst-case back-off between them.
    #[must_use]
    pub fn from_config(service: Arc<dyn GenerationService>, config: &LlmConfig) -> Self {
        let retry = RetryPolicy::from_config(config);
        let requests = Duration::from_secs(config.timeout_secs.saturating_mul(retry.attempts()));
        Self::new(service, requests.saturating_add(retry.max_total_backoff()))
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Free-text trend narrative over the ranked windows.
    pub async fn narrate(&self, windows: &[ContextWindow]) -> NarrativeOutcome {
        let request = GenerationRequest::narrative(narrative_prompt(windows));
        match self.call(&request).await {
            Ok(text) => NarrativeOutcome::Valid(text),
            Err(e) => {
                tracing::warn!(error = %e, "trend narrative call failed, using fallback");
                NarrativeOutcome::Fallback {
                    text: FALLBACK_NARRATIVE.to_string(),
                    reason: e.to_string(),
                }
            }
        }
    }

    /// Structured concept generation over the fused evidence.
    pub async fn fuse(&self, evidence: &FusionEvidence<'_>) -> FusionOutcome {
        let request = GenerationRequest::structured(concept_prompt(evidence));
        let raw = match self.call(&request).await {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(error = %e, "concept generation call failed, using fallback");
                return FusionOutcome::Fallback {
                    bundle: ConceptBundle::fallback(String::new()),
                    reason: e.to_string(),
                };
            }
        };

        match parse_concepts(&raw, &evidence.references()) {
            Ok(bundle) => {
                tracing::debug!(concepts = bundle.concepts.len(), "parsed concept payload");
                FusionOutcome::Valid(bundle)
            }
            Err(e) => {
                tracing::warn!(error = %e, "concept payload rejected, using fallback");
                FusionOutcome::Fallback {
                    bundle: ConceptBundle::fallback(raw),
                    reason: e.to_string(),
                }
            }
        }
    }

    async fn call(&self, request: &GenerationRequest) -> Result<String, FusionError> {
        with_deadline(self.timeout, self.service.generate(request)).await
    }
}

async fn with_deadline<F>(deadline: Duration, fut: F) -> Result<String, FusionError>
where
    F: Future<Output = Result<String, FusionError>>,
{
    tokio::time::timeout(deadline, fut)
        .await
        .map_err(|_| FusionError::Timeout(deadline))?
}

#[cfg(test)]
mod tests {
    use futures::future::BoxFuture;
    use futures::FutureExt;
    use sigfuse_core::{ConceptType, ThreatEntry, TimingAction};

    use super::*;
    use crate::client::UnavailableService;

    /// Replies with a fixed body, or never replies when `hang` is set.
    struct StubService {
        reply: Result<String, u16>,
        hang: bool,
    }

    impl StubService {
        fn ok(body: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: Ok(body.to_string()),
                hang: false,
            })
        }

        fn status(code: u16) -> Arc<Self> {
            Arc::new(Self {
                reply: Err(code),
                hang: false,
            })
        }

        fn hanging() -> Arc<Self> {
            Arc::new(Self {
                reply: Ok(String::new()),
                hang: true,
            })
        }
    }

    impl GenerationService for StubService {
        fn generate<'a>(
            &'a self,
            _request: &'a GenerationRequest,
        ) -> BoxFuture<'a, Result<String, FusionError>> {
            async move {
                if self.hang {
                    futures::future::pending::<()>().await;
                }
                self.reply.clone().map_err(|status| FusionError::Status {
                    status,
                    body: "stub".to_string(),
                })
            }
            .boxed()
        }
    }

    fn adapter(service: Arc<dyn GenerationService>) -> EvidenceFusionAdapter {
        EvidenceFusionAdapter::new(service, Duration::from_secs(5))
    }

    fn threats() -> Vec<ThreatEntry> {
        vec![ThreatEntry {
            mechanic: "BOGO".to_string(),
            leading_brand: "Burger King".to_string(),
            threat_score: 4.2,
            reference_id: "0f0f0f0f".to_string(),
        }]
    }

    fn windows() -> Vec<ContextWindow> {
        vec![ContextWindow {
            signal_id: "CTX-0".to_string(),
            trend: "Gamified Rewards".to_string(),
            season: "Fall".to_string(),
            daypart: "Lunch".to_string(),
            situation: "Commute".to_string(),
            timing_strength: 1.0,
            relevance_score: 10.0,
            action: TimingAction::ActNow,
        }]
    }

    #[tokio::test]
    async fn narrative_passes_text_through() {
        let outcome = adapter(StubService::ok("Gamification is rising."))
            .narrate(&windows())
            .await;
        assert_eq!(outcome, NarrativeOutcome::Valid("Gamification is rising.".to_string()));
    }

    #[tokio::test]
    async fn narrative_failure_falls_back() {
        let outcome = adapter(StubService::status(503)).narrate(&windows()).await;
        assert_eq!(outcome.text(), FALLBACK_NARRATIVE);
        assert!(outcome.fallback_reason().unwrap().contains("503"));
    }

    #[tokio::test]
    async fn fuse_tags_concepts_with_evidence() {
        let body = r#"{"intro": "Hit back.", "offers": [{"name": "Streak", "type": "Defensive"}]}"#;
        let threats = threats();
        let windows = windows();
        let evidence = FusionEvidence {
            threats: &threats,
            insights: &[],
            trend_summary: "rising",
            windows: &windows,
        };
        let outcome = adapter(StubService::ok(body)).fuse(&evidence).await;

        let FusionOutcome::Valid(bundle) = outcome else {
            panic!("expected a valid outcome");
        };
        assert_eq!(bundle.concepts[0].concept_type, ConceptType::Defensive);
        assert_eq!(bundle.concepts[0].evidence, vec!["0f0f0f0f", "CTX-0"]);
    }

    #[tokio::test]
    async fn fuse_missing_offers_is_valid_and_empty() {
        let evidence = FusionEvidence {
            threats: &[],
            insights: &[],
            trend_summary: "",
            windows: &[],
        };
        let outcome = adapter(StubService::ok(r#"{"intro": "Quiet market."}"#))
            .fuse(&evidence)
            .await;
        assert!(outcome.fallback_reason().is_none());
        assert!(outcome.bundle().concepts.is_empty());
        assert_eq!(outcome.bundle().intro, "Quiet market.");
    }

    #[tokio::test]
    async fn fuse_non_object_payload_falls_back_keeping_raw() {
        let evidence = FusionEvidence {
            threats: &[],
            insights: &[],
            trend_summary: "",
            windows: &[],
        };
        let outcome = adapter(StubService::ok(r#"["not", "an", "object"]"#))
            .fuse(&evidence)
            .await;
        let reason = outcome.fallback_reason().unwrap().to_string();
        let bundle = outcome.into_bundle();
        assert!(reason.contains("invalid structured payload"));
        assert!(bundle.concepts.is_empty());
        assert_eq!(bundle.intro, crate::parse::FALLBACK_INTRO);
        assert_eq!(bundle.raw, r#"["not", "an", "object"]"#);
    }

    #[tokio::test]
    async fn unconfigured_service_falls_back() {
        let evidence = FusionEvidence {
            threats: &[],
            insights: &[],
            trend_summary: "",
            windows: &[],
        };
        let outcome = adapter(Arc::new(UnavailableService)).fuse(&evidence).await;
        assert!(outcome.fallback_reason().unwrap().contains("not configured"));
    }

    #[tokio::test]
    async fn hung_service_times_out_into_fallback() {
        let adapter = EvidenceFusionAdapter::new(StubService::hanging(), Duration::from_millis(50));
        let outcome = adapter.narrate(&windows()).await;
        assert_eq!(outcome.text(), FALLBACK_NARRATIVE);
        assert!(outcome.fallback_reason().unwrap().contains("timed out"));
    }

    #[test]
    fn config_deadline_covers_retries_and_backoff() {
        let config = LlmConfig {
            timeout_secs: 10,
            max_retries: 2,
            retry_backoff_base_ms: 500,
            ..LlmConfig::default()
        };
        let adapter = EvidenceFusionAdapter::from_config(Arc::new(UnavailableService), &config);
        // 3 requests at 10 s, then (500 + 1000) ms back-off at +25 % jitter.
        assert_eq!(adapter.timeout(), Duration::from_millis(31_875));
    }

    #[test]
    fn config_deadline_counts_capped_backoff() {
        let config = LlmConfig {
            timeout_secs: 5,
            max_retries: 2,
            retry_backoff_base_ms: 20_000,
            ..LlmConfig::default()
        };
        let adapter = EvidenceFusionAdapter::from_config(Arc::new(UnavailableService), &config);
        // 15 s of requests, 25 s + 37.5 s (second sleep capped at 30 s) of back-off.
        assert_eq!(adapter.timeout(), Duration::from_millis(77_500));
    }
}
