//! Storage seams for games and posts
//!
//! The services only ever see these traits; the Postgres adapter and the
//! in-memory store are interchangeable behind them.

pub mod memory;

use async_trait::async_trait;

use crate::domain::{Event, Game, SeasonType};
use crate::error::Result;

pub use memory::InMemoryStore;

/// Optional narrowing for game listings
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GameFilter {
    pub week: Option<i32>,
    pub season_type: Option<SeasonType>,
    /// Games where this team plays home or away
    pub team_id: Option<String>,
}

impl GameFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn for_team(team_id: impl Into<String>) -> Self {
        Self {
            team_id: Some(team_id.into()),
            ..Self::default()
        }
    }

    pub fn for_week(week: i32) -> Self {
        Self {
            week: Some(week),
            ..Self::default()
        }
    }

    pub fn matches(&self, game: &Game) -> bool {
        self.week.map_or(true, |w| game.week == w)
            && self.season_type.map_or(true, |s| game.season_type == s)
            && self
                .team_id
                .as_deref()
                .map_or(true, |team| game.involves(team))
    }
}

/// Schedule store
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GameRepository: Send + Sync {
    /// `Ok(None)` when the id is unknown; `Err` only for storage failures
    async fn get(&self, game_id: &str) -> Result<Option<Game>>;

    /// Matching games ordered by `game_id`
    async fn list(&self, filter: &GameFilter) -> Result<Vec<Game>>;

    /// Insert a new game or refresh its teams, week and season type.
    /// The kickoff of an existing game is never overwritten.
    async fn upsert(&self, game: &Game) -> Result<()>;
}

/// Post store
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EventRepository: Send + Sync {
    /// Posts attributed to a game, optionally without the unscored ones
    async fn list_for_game(&self, game_id: &str, exclude_zero_sentiment: bool) -> Result<Vec<Event>>;

    /// Store posts, skipping `(team_id, event_id)` pairs already present.
    /// Returns how many were new.
    async fn insert_events(&self, events: &[Event]) -> Result<u64>;

    /// Stored posts that no game claimed when they were ingested
    async fn list_unattributed(&self) -> Result<Vec<Event>>;

    /// Overwrite the game of stored posts, matched by `(team_id, event_id)`.
    /// Returns how many stored posts changed.
    async fn assign_games(&self, events: &[Event]) -> Result<u64>;
}
