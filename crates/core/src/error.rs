use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("request carries no query text")]
    EmptyQuery,
    #[error("unexpected pipeline failure: {0}")]
    Unexpected(String),
}

impl From<anyhow::Error> for PipelineError {
    fn from(error: anyhow::Error) -> Self {
        Self::Unexpected(format!("{error:#}"))
    }
}
