use thiserror::Error;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("failed to read fixture file {path}: {source}")]
    FixtureIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse fixture file: {0}")]
    FixtureParse(#[from] serde_yaml::Error),

    #[error("fixture validation failed: {0}")]
    Validation(String),
}
