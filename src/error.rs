use chrono::{DateTime, Utc};
use thiserror::Error;

/// Main error type for the sentiment tracker
#[derive(Error, Debug)]
pub enum FanfareError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    // Database errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    // Serialization errors
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    // Domain errors
    #[error("Game not found: {game_id}")]
    GameNotFound { game_id: String },

    #[error("Ambiguous attribution for team {team_id} at {posted_at}: candidates {candidates:?}")]
    AmbiguousAttribution {
        team_id: String,
        posted_at: DateTime<Utc>,
        candidates: Vec<String>,
    },

    #[error("Empty game window: {0}")]
    EmptyGameWindow(String),

    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    // Validation errors
    #[error("Validation failed: {0}")]
    Validation(String),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl FanfareError {
    pub fn game_not_found(game_id: impl Into<String>) -> Self {
        FanfareError::GameNotFound {
            game_id: game_id.into(),
        }
    }

    /// True for domain lookups that failed, as opposed to infrastructure failures
    pub fn is_not_found(&self) -> bool {
        matches!(self, FanfareError::GameNotFound { .. })
    }
}

/// Result type alias for FanfareError
pub type Result<T> = std::result::Result<T, FanfareError>;
