//! Decides which games still need posts collected and how

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info};

use super::GameStatusService;
use crate::config::CollectionConfig;
use crate::domain::{Game, GamePhase};
use crate::error::Result;
use crate::persistence::{EventRepository, GameFilter};
use crate::stats::PostCounts;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum CollectionKind {
    /// Search the archive over a finished game's window
    Backfill {
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        collected: u64,
        target: u64,
    },
    /// Stream posts until the window closes
    Monitor { until: DateTime<Utc> },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CollectionTask {
    pub game_id: String,
    pub phase: GamePhase,
    #[serde(flatten)]
    pub kind: CollectionKind,
}

/// Plans collection work; the collection itself happens elsewhere
pub struct CollectionPlanner {
    status: Arc<GameStatusService>,
    events: Arc<dyn EventRepository>,
    config: CollectionConfig,
}

impl CollectionPlanner {
    pub fn new(
        status: Arc<GameStatusService>,
        events: Arc<dyn EventRepository>,
        config: CollectionConfig,
    ) -> Self {
        Self {
            status,
            events,
            config,
        }
    }

    /// One task per game that needs work, ordered by game id
    pub async fn plan(&self) -> Result<Vec<CollectionTask>> {
        let statuses = self.status.statuses(&GameFilter::all()).await?;
        let mut tasks = Vec::new();

        for status in statuses {
            let Some(phase) = status.phase else {
                continue;
            };
            if let Some(task) = self.task_for(&status.game, phase).await? {
                tasks.push(task);
            }
        }

        info!("Planned {} collection tasks", tasks.len());
        Ok(tasks)
    }

    async fn task_for(&self, game: &Game, phase: GamePhase) -> Result<Option<CollectionTask>> {
        let window = game.window(self.status.window_policy());

        let kind = match phase {
            GamePhase::Historic | GamePhase::Recent => {
                let target = if phase == GamePhase::Historic {
                    self.config.historic_target_posts
                } else {
                    self.config.recent_target_posts
                };
                let events = self.events.list_for_game(&game.game_id, true).await?;
                let collected = PostCounts::tally(game, &events).total;
                if collected >= target {
                    debug!("Game {} has {}/{} posts", game.game_id, collected, target);
                    return Ok(None);
                }
                CollectionKind::Backfill {
                    from: window.pregame_start,
                    to: window.postgame_end,
                    collected,
                    target,
                }
            }
            GamePhase::Live | GamePhase::Starting => CollectionKind::Monitor {
                until: window.postgame_end,
            },
            GamePhase::Upcoming | GamePhase::Pending => return Ok(None),
        };

        Ok(Some(CollectionTask {
            game_id: game.game_id.clone(),
            phase,
            kind,
        }))
    }
}
