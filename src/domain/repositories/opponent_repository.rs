use async_trait::async_trait;

use crate::domain::entities::{HandSummary, OpponentProfile};
use crate::domain::value_objects::game_state::Variant;

/// Error type for opponent store operations
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Database error: {0}")]
    Database(String),
    #[error("Transaction rolled back: {0}")]
    Transaction(String),
}

/// Opponent store trait. One row per `(player_id, variant)`; the two
/// variants of the same player never share counters.
#[async_trait]
pub trait OpponentRepository: Send + Sync {
    /// Find a single profile row.
    async fn find(
        &self,
        player_id: &str,
        variant: Variant,
    ) -> Result<Option<OpponentProfile>, RepositoryError>;

    /// Batch lookup for every villain at the table (avoids N+1 reads
    /// during CALCULATING).
    async fn find_many(
        &self,
        player_ids: &[String],
        variant: Variant,
    ) -> Result<Vec<OpponentProfile>, RepositoryError>;

    /// Apply one hand summary atomically: identity touch, row creation,
    /// every implied counter increment and the action log entries commit
    /// together or not at all.
    async fn apply_hand(&self, summary: &HandSummary) -> Result<(), RepositoryError>;

    /// Recently seen profiles for a variant, newest first.
    async fn recent(
        &self,
        variant: Variant,
        limit: u32,
    ) -> Result<Vec<OpponentProfile>, RepositoryError>;
}
