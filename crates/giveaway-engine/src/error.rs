use thiserror::Error;

use giveaway_types::models::{GiveawayId, ParticipantId};

#[derive(Debug, Error)]
pub enum EngineError {
    /// The store could not complete a read or commit a transaction.
    #[error("store error: {0:#}")]
    Store(anyhow::Error),

    #[error("store task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("giveaway {0} not found")]
    GiveawayNotFound(GiveawayId),

    #[error("participant {0} not found")]
    ParticipantNotFound(ParticipantId),

    #[error("invalid giveaway: {0}")]
    Validation(String),

    #[error("token error: {0:#}")]
    Token(anyhow::Error),
}

pub type EngineResult<T> = Result<T, EngineError>;
