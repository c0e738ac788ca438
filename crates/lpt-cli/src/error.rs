use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] lpt_core::Error),
    #[error(transparent)]
    Config(#[from] lpt_core::config::ConfigError),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("CLI state error: {0}")]
    State(String),
    #[error("Rate limited: next request allowed in {0}")]
    RateLimited(String),
    #[error("Refusing to {0} without --yes")]
    ConfirmationRequired(String),
}
