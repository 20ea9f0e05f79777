//! Chart and summary views over stored posts

use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info};

use super::{GameStatus, GameStatusService};
use crate::domain::{Game, GamePhase, GameWindow};
use crate::error::Result;
use crate::persistence::{EventRepository, GameFilter};
use crate::stats::{aggregate, Bucket, BucketGrid, PostCounts};

/// Everything a sentiment chart for one game needs
#[derive(Debug, Clone, Serialize)]
pub struct GameChart {
    pub game: Game,
    pub phase: Option<GamePhase>,
    pub window: GameWindow,
    pub bucket_width_minutes: i64,
    pub buckets: Vec<Bucket>,
}

/// One row of the schedule overview
#[derive(Debug, Clone, Serialize)]
pub struct GameSummary {
    #[serde(flatten)]
    pub game: Game,
    pub phase: Option<GamePhase>,
    pub posts: PostCounts,
}

pub struct StatisticsService {
    status: Arc<GameStatusService>,
    events: Arc<dyn EventRepository>,
    bucket_width_minutes: i64,
}

impl StatisticsService {
    pub fn new(
        status: Arc<GameStatusService>,
        events: Arc<dyn EventRepository>,
        bucket_width_minutes: i64,
    ) -> Self {
        Self {
            status,
            events,
            bucket_width_minutes,
        }
    }

    /// Chart with the configured bucket width
    pub async fn game_chart(&self, game_id: &str) -> Result<GameChart> {
        self.game_chart_with_width(game_id, self.bucket_width_minutes)
            .await
    }

    /// Recompute the bucketed chart for a game from the posts visible now
    pub async fn game_chart_with_width(
        &self,
        game_id: &str,
        bucket_width_minutes: i64,
    ) -> Result<GameChart> {
        let game = self.status.game(game_id).await?;
        let window = game.window(self.status.window_policy());
        let grid = BucketGrid::build(&window, bucket_width_minutes)?;

        let events = self.events.list_for_game(game_id, true).await?;
        let buckets = aggregate(&game, &events, &grid);
        debug!(
            "Charted {} posts for game {} into {} buckets",
            events.len(),
            game_id,
            buckets.len()
        );

        Ok(GameChart {
            phase: self.status.phase_of(&game),
            game,
            window,
            bucket_width_minutes,
            buckets,
        })
    }

    /// Scored posts per side for a game
    pub async fn post_counts(&self, game_id: &str) -> Result<PostCounts> {
        let game = self.status.game(game_id).await?;
        self.counts_for(&game).await
    }

    /// Every game (optionally one week) with phase and post counts, ordered by id
    pub async fn schedule_summary(&self, week: Option<i32>) -> Result<Vec<GameSummary>> {
        let filter = GameFilter {
            week,
            ..GameFilter::default()
        };
        let statuses = self.status.statuses(&filter).await?;

        let mut summaries = Vec::with_capacity(statuses.len());
        for GameStatus { game, phase } in statuses {
            let posts = self.counts_for(&game).await?;
            summaries.push(GameSummary { game, phase, posts });
        }

        info!("Summarized {} games", summaries.len());
        Ok(summaries)
    }

    async fn counts_for(&self, game: &Game) -> Result<PostCounts> {
        let events = self.events.list_for_game(&game.game_id, true).await?;
        Ok(PostCounts::tally(game, &events))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::config::AmbiguityPolicy;
    use crate::domain::{Event, PhasePolicy, SeasonType};
    use crate::error::FanfareError;
    use crate::persistence::{GameRepository, InMemoryStore, MockEventRepository};
    use chrono::{DateTime, Duration, TimeZone, Utc};

    fn kickoff() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2016, 9, 11, 13, 0, 0).unwrap()
    }

    fn games() -> Vec<Game> {
        vec![
            Game {
                game_id: "g1".to_string(),
                home_team_id: "A".to_string(),
                away_team_id: "B".to_string(),
                scheduled_start: kickoff(),
                week: 1,
                season_type: SeasonType::Reg,
            },
            Game {
                game_id: "g2".to_string(),
                home_team_id: "C".to_string(),
                away_team_id: "D".to_string(),
                scheduled_start: kickoff() + Duration::days(7),
                week: 2,
                season_type: SeasonType::Reg,
            },
        ]
    }

    fn post(id: &str, team: &str, minutes_after_noon: i64, score: f64) -> Event {
        Event {
            event_id: id.to_string(),
            team_id: team.to_string(),
            posted_at: kickoff() - Duration::hours(1) + Duration::minutes(minutes_after_noon),
            sentiment_score: score,
            game_id: Some("g1".to_string()),
        }
    }

    fn stats_with(store: Arc<InMemoryStore>, width: i64) -> StatisticsService {
        let status = Arc::new(GameStatusService::new(
            store.clone(),
            Arc::new(FixedClock::new(kickoff() + Duration::hours(1))),
            PhasePolicy::default(),
            AmbiguityPolicy::Earliest,
        ));
        StatisticsService::new(status, store, width)
    }

    #[tokio::test]
    async fn test_game_chart() {
        let store = Arc::new(InMemoryStore::with_games(games()));
        store
            .insert_events(&[post("1", "A", 3, 0.5), post("2", "A", 4, 0.0), post("3", "B", 7, -0.2)])
            .await
            .unwrap();
        let stats = stats_with(store, 5);

        let chart = stats.game_chart("g1").await.unwrap();
        assert_eq!(chart.phase, Some(GamePhase::Live));
        assert_eq!(chart.buckets.len(), 60);
        assert_eq!(chart.window.pregame_start, kickoff() - Duration::hours(1));
        assert_eq!(chart.buckets[0].home_count, 1);
        assert_eq!(chart.buckets[0].home_mean_sentiment, Some(0.5));
        assert_eq!(chart.buckets[1].away_count, 1);
        assert_eq!(chart.buckets[1].away_mean_sentiment, Some(-0.2));

        let wide = stats.game_chart_with_width("g1", 15).await.unwrap();
        assert_eq!(wide.buckets.len(), 20);
        assert_eq!(wide.buckets[0].home_count, 1);
        assert_eq!(wide.buckets[0].away_count, 1);
    }

    #[tokio::test]
    async fn test_chart_errors() {
        let store = Arc::new(InMemoryStore::with_games(games()));
        let stats = stats_with(store, 5);

        assert!(stats.game_chart("missing").await.unwrap_err().is_not_found());
        assert!(matches!(
            stats.game_chart_with_width("g1", 0).await,
            Err(FanfareError::EmptyGameWindow(_))
        ));
    }

    #[tokio::test]
    async fn test_schedule_summary() {
        let store = Arc::new(InMemoryStore::with_games(games()));
        store
            .insert_events(&[post("1", "A", 3, 0.5), post("2", "B", 4, 0.0), post("3", "B", 90, 0.1)])
            .await
            .unwrap();
        let stats = stats_with(store.clone(), 5);

        let all = stats.schedule_summary(None).await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].game.game_id, "g1");
        assert_eq!(all[0].posts, PostCounts { home: 1, away: 1, total: 2 });
        assert_eq!(all[1].phase, Some(GamePhase::Pending));
        assert_eq!(all[1].posts.total, 0);

        let week_two = stats.schedule_summary(Some(2)).await.unwrap();
        assert_eq!(week_two.len(), 1);
        assert_eq!(week_two[0].game.game_id, "g2");

        assert_eq!(store.list(&GameFilter::all()).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_event_store_failure_propagates() {
        let store = Arc::new(InMemoryStore::with_games(games()));
        let status = Arc::new(GameStatusService::new(
            store,
            Arc::new(FixedClock::new(kickoff())),
            PhasePolicy::default(),
            AmbiguityPolicy::Earliest,
        ));
        let mut events = MockEventRepository::new();
        events
            .expect_list_for_game()
            .returning(|_, _| Err(FanfareError::Database(sqlx::Error::PoolClosed)));
        let stats = StatisticsService::new(status, Arc::new(events), 5);

        assert!(matches!(
            stats.game_chart("g1").await,
            Err(FanfareError::Database(_))
        ));
    }
}
