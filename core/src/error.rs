use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Paged fetch failed after {attempts} attempts at offset {offset}")]
    FetchRetriesExhausted { offset: usize, attempts: u32 },

    #[error(
        "Paid reward for investment {investment_id} tier {tier_level} would change \
         amount {existing} -> {recomputed}; refusing to overwrite"
    )]
    PaidRewardConflict {
        investment_id: String,
        tier_level: u32,
        existing: f64,
        recomputed: f64,
    },

    #[error("Malformed input: {0}")]
    MalformedInput(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type CoreResult<T> = Result<T, CoreError>;
