//! Recency-weighted scoring for market signals.
//!
//! Every function here is pure and CPU-bound: records in, ranked entities
//! out. Business parameters arrive through [`sigfuse_core::ScoringConfig`].

pub mod context;
pub mod recency;
pub mod scorecard;
pub mod threat;

pub use context::{rank_context_windows, CONTEXT_WINDOW_LIMIT};
pub use recency::{aggregate, weight, WeightedGroup, WeightedMember};
pub use scorecard::{assemble_scorecard, confidence};
pub use threat::{score_threats, summarize_threats};
