//! Boundary to the external narrative/concept generation service.

pub mod adapter;
pub mod client;
pub mod error;
pub mod parse;
pub mod prompt;
mod retry;

pub use adapter::{EvidenceFusionAdapter, FusionOutcome, NarrativeOutcome, FALLBACK_NARRATIVE};
pub use client::{ChatCompletionsClient, GenerationRequest, GenerationService, UnavailableService};
pub use error::FusionError;
pub use parse::{parse_concepts, ConceptBundle};
pub use prompt::{FusionEvidence, TREND_MECHANIC_MAP};
pub use retry::RetryPolicy;
