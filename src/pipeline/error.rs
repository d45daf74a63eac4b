use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("malformed log line {line}: expected 4 fields, found {found}")]
    MalformedRow { line: u64, found: usize },

    #[error("malformed log line {line}: invalid timestamp '{timestamp}'")]
    InvalidTimestamp {
        line: u64,
        timestamp: String,
        #[source]
        source: chrono::ParseError,
    },

    /// Rendered as the single diagnostic line written before aborting
    #[error("{message}: {url} ({timestamp})")]
    Resolution {
        message: String,
        url: String,
        timestamp: String,
    },

    #[error("failed to read log input")]
    Input(#[source] csv::Error),

    #[error("failed to write report")]
    Report(#[source] csv::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
