use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("controller error: {0}")]
    Controller(#[from] sitewalker_core::ControllerError),

    #[error("task join error: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("crawl ended without a final frontier")]
    NoFinalFrontier,
}

pub type Result<T> = std::result::Result<T, EngineError>;
