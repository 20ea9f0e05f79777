use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::clock::Clock;
use crate::config::{AmbiguityPolicy, AppConfig};
use crate::domain::{Game, GamePhase, PhasePolicy, WindowPolicy};
use crate::error::{FanfareError, Result};
use crate::persistence::{GameFilter, GameRepository};

/// A game together with its phase at one instant
#[derive(Debug, Clone, Serialize)]
pub struct GameStatus {
    pub game: Game,
    pub phase: Option<GamePhase>,
}

/// Answers phase and attribution questions against the schedule.
///
/// Phases are computed fresh on every call from the injected clock and are
/// never stored.
pub struct GameStatusService {
    games: Arc<dyn GameRepository>,
    clock: Arc<dyn Clock>,
    policy: PhasePolicy,
    on_ambiguous: AmbiguityPolicy,
}

impl GameStatusService {
    pub fn new(
        games: Arc<dyn GameRepository>,
        clock: Arc<dyn Clock>,
        policy: PhasePolicy,
        on_ambiguous: AmbiguityPolicy,
    ) -> Self {
        Self {
            games,
            clock,
            policy,
            on_ambiguous,
        }
    }

    pub fn from_config(
        games: Arc<dyn GameRepository>,
        clock: Arc<dyn Clock>,
        config: &AppConfig,
    ) -> Self {
        Self::new(
            games,
            clock,
            config.timing.phase_policy(),
            config.attribution.on_ambiguous,
        )
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn policy(&self) -> &PhasePolicy {
        &self.policy
    }

    pub fn window_policy(&self) -> &WindowPolicy {
        &self.policy.window
    }

    /// Phase of an already loaded game at the current instant
    pub fn phase_of(&self, game: &Game) -> Option<GamePhase> {
        self.policy.classify(game.scheduled_start, self.clock.now())
    }

    /// Load a game, failing with `GameNotFound` for unknown ids
    pub async fn game(&self, game_id: &str) -> Result<Game> {
        self.games
            .get(game_id)
            .await?
            .ok_or_else(|| FanfareError::game_not_found(game_id))
    }

    /// Current phase of a game; `None` only at the unclassified boundary instants
    pub async fn current_phase(&self, game_id: &str) -> Result<Option<GamePhase>> {
        let game = self.game(game_id).await?;
        let phase = self.phase_of(&game);
        debug!("Game {} is {:?}", game_id, phase);
        Ok(phase)
    }

    /// Matching games without classifying them
    pub async fn games(&self, filter: &GameFilter) -> Result<Vec<Game>> {
        self.games.list(filter).await
    }

    /// Every matching game with its phase, classified against one `now`
    pub async fn statuses(&self, filter: &GameFilter) -> Result<Vec<GameStatus>> {
        self.statuses_at(self.clock.now(), filter).await
    }

    /// Like `statuses`, at an instant the caller already read
    pub async fn statuses_at(
        &self,
        now: DateTime<Utc>,
        filter: &GameFilter,
    ) -> Result<Vec<GameStatus>> {
        let games = self.games.list(filter).await?;

        Ok(games
            .into_iter()
            .map(|game| {
                let phase = self.policy.classify(game.scheduled_start, now);
                GameStatus { game, phase }
            })
            .collect())
    }

    /// Ids of games currently in any of `phases`, ordered by id
    pub async fn select_games(&self, phases: &HashSet<GamePhase>) -> Result<Vec<String>> {
        let statuses = self.statuses(&GameFilter::all()).await?;

        Ok(statuses
            .into_iter()
            .filter(|s| s.phase.is_some_and(|p| phases.contains(&p)))
            .map(|s| s.game.game_id)
            .collect())
    }

    /// Resolve the game a post belongs to from its team and time alone.
    ///
    /// A game matches when the team plays in it and `posted_at` falls in its
    /// `[pregame_start, postgame_end)` window. Several matches mean the
    /// schedule has overlapping games for one team; that is logged and then
    /// either resolved to the earliest kickoff (ties by game id) or rejected,
    /// depending on the configured policy.
    pub async fn attribute_event_to_game(
        &self,
        team_id: &str,
        posted_at: DateTime<Utc>,
    ) -> Result<Option<String>> {
        let games = self.games(&GameFilter::for_team(team_id)).await?;
        self.attribute_among(&games, team_id, posted_at)
    }

    /// Attribution against an already loaded schedule
    pub fn attribute_among(
        &self,
        games: &[Game],
        team_id: &str,
        posted_at: DateTime<Utc>,
    ) -> Result<Option<String>> {
        let mut candidates: Vec<&Game> = games
            .iter()
            .filter(|g| g.involves(team_id))
            .filter(|g| g.window(&self.policy.window).contains(posted_at))
            .collect();

        candidates.sort_by(|a, b| {
            a.scheduled_start
                .cmp(&b.scheduled_start)
                .then_with(|| a.game_id.cmp(&b.game_id))
        });

        match candidates.as_slice() {
            [] => Ok(None),
            [only] => Ok(Some(only.game_id.clone())),
            [first, ..] => {
                let ids: Vec<String> = candidates.iter().map(|g| g.game_id.clone()).collect();
                warn!(
                    "Team {} has {} overlapping games at {}: {:?}",
                    team_id,
                    ids.len(),
                    posted_at,
                    ids
                );

                match self.on_ambiguous {
                    AmbiguityPolicy::Earliest => Ok(Some(first.game_id.clone())),
                    AmbiguityPolicy::Reject => Err(FanfareError::AmbiguousAttribution {
                        team_id: team_id.to_string(),
                        posted_at,
                        candidates: ids,
                    }),
                }
            }
        }
    }
}
