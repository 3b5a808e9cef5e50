use serde::Serialize;
use sigfuse_core::InputError;
use sigfuse_sources::SourceError;
use thiserror::Error;

/// Structural problems that stop a graph from running at all.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    #[error("stage '{0}' is declared more than once")]
    DuplicateStage(String),

    #[error("stage '{stage}' depends on unknown stage '{dependency}'")]
    UnknownDependency { stage: String, dependency: String },

    #[error("dependency cycle through stages: {}", .0.join(", "))]
    Cycle(Vec<String>),
}

/// Classification of a recorded stage fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FaultKind {
    /// Malformed input or unusable configuration; fatal to the owning stage.
    Input,
    /// Generation-service failure recovered with fallback output.
    ExternalService,
    /// A required dependency failed or was skipped.
    Orchestration,
    Cancelled,
    /// Stage panicked or produced an output of the wrong shape.
    Internal,
}

impl std::fmt::Display for FaultKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Input => "input",
            Self::ExternalService => "external_service",
            Self::Orchestration => "orchestration",
            Self::Cancelled => "cancelled",
            Self::Internal => "internal",
        };
        f.write_str(label)
    }
}

/// Failure returned by a stage body.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind} fault: {message}")]
pub struct StageError {
    pub kind: FaultKind,
    pub message: String,
}

impl StageError {
    pub fn new(kind: FaultKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(FaultKind::Internal, message)
    }
}

impl From<InputError> for StageError {
    fn from(e: InputError) -> Self {
        Self::new(FaultKind::Input, e.to_string())
    }
}

impl From<SourceError> for StageError {
    fn from(e: SourceError) -> Self {
        Self::new(FaultKind::Input, e.to_string())
    }
}

/// One entry of a run's fault log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageFault {
    pub stage: String,
    pub kind: FaultKind,
    pub message: String,
}
