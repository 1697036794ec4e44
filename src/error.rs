use thiserror::Error;

#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("{0} is not installed")]
    ToolMissing(String),

    #[error("{program} timed out after {secs}s")]
    CommandTimeout { program: String, secs: u64 },

    #[error("{program} failed ({status}): {stderr}")]
    CommandFailed {
        program: String,
        status: String,
        stderr: String,
    },

    #[error("Error: {0}")]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, ResolveError>;
