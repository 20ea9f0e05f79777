use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::debug;

use super::{EventRepository, GameFilter, GameRepository};
use crate::domain::{Event, Game};
use crate::error::Result;

/// Process-local store backed by concurrent maps.
///
/// Used for tests, replays from files, and running without a database.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    games: DashMap<String, Game>,
    /// Keyed by `(team_id, event_id)`
    events: DashMap<(String, String), Event>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with a schedule
    pub fn with_games(games: impl IntoIterator<Item = Game>) -> Self {
        let store = Self::new();
        for game in games {
            store.games.insert(game.game_id.clone(), game);
        }
        store
    }

    pub fn game_count(&self) -> usize {
        self.games.len()
    }

    pub fn event_count(&self) -> usize {
        self.events.len()
    }
}

#[async_trait]
impl GameRepository for InMemoryStore {
    async fn get(&self, game_id: &str) -> Result<Option<Game>> {
        Ok(self.games.get(game_id).map(|g| g.value().clone()))
    }

    async fn list(&self, filter: &GameFilter) -> Result<Vec<Game>> {
        let mut games: Vec<Game> = self
            .games
            .iter()
            .filter(|entry| filter.matches(entry.value()))
            .map(|entry| entry.value().clone())
            .collect();
        games.sort_by(|a, b| a.game_id.cmp(&b.game_id));
        Ok(games)
    }

    async fn upsert(&self, game: &Game) -> Result<()> {
        self.games
            .entry(game.game_id.clone())
            .and_modify(|existing| {
                let scheduled_start = existing.scheduled_start;
                *existing = game.clone();
                existing.scheduled_start = scheduled_start;
            })
            .or_insert_with(|| game.clone());
        Ok(())
    }
}

#[async_trait]
impl EventRepository for InMemoryStore {
    async fn list_for_game(&self, game_id: &str, exclude_zero_sentiment: bool) -> Result<Vec<Event>> {
        let mut events: Vec<Event> = self
            .events
            .iter()
            .filter(|entry| entry.value().game_id.as_deref() == Some(game_id))
            .filter(|entry| !exclude_zero_sentiment || entry.value().is_scored())
            .map(|entry| entry.value().clone())
            .collect();
        events.sort_by(|a, b| a.posted_at.cmp(&b.posted_at));
        Ok(events)
    }

    async fn insert_events(&self, events: &[Event]) -> Result<u64> {
        let mut inserted = 0u64;
        for event in events {
            let key = (event.team_id.clone(), event.event_id.clone());
            if let Entry::Vacant(slot) = self.events.entry(key) {
                slot.insert(event.clone());
                inserted += 1;
            }
        }
        debug!("Stored {} of {} posts", inserted, events.len());
        Ok(inserted)
    }

    async fn list_unattributed(&self) -> Result<Vec<Event>> {
        let mut events: Vec<Event> = self
            .events
            .iter()
            .filter(|entry| entry.value().game_id.is_none())
            .map(|entry| entry.value().clone())
            .collect();
        events.sort_by(|a, b| a.posted_at.cmp(&b.posted_at));
        Ok(events)
    }

    async fn assign_games(&self, events: &[Event]) -> Result<u64> {
        let mut changed = 0u64;
        for event in events {
            let key = (event.team_id.clone(), event.event_id.clone());
            if let Some(mut stored) = self.events.get_mut(&key) {
                if stored.game_id != event.game_id {
                    stored.game_id = event.game_id.clone();
                    changed += 1;
                }
            }
        }
        Ok(changed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SeasonType;
    use chrono::{Duration, TimeZone, Utc};

    fn game(id: &str, home: &str, away: &str, week: i32) -> Game {
        Game {
            game_id: id.to_string(),
            home_team_id: home.to_string(),
            away_team_id: away.to_string(),
            scheduled_start: Utc.with_ymd_and_hms(2016, 9, 11, 17, 0, 0).unwrap(),
            week,
            season_type: SeasonType::Reg,
        }
    }

    #[tokio::test]
    async fn test_list_filters_and_orders() {
        let store = InMemoryStore::with_games(vec![
            game("g3", "NE", "ARI", 1),
            game("g1", "NYJ", "CIN", 1),
            game("g2", "NYJ", "BUF", 2),
        ]);

        let all = store.list(&GameFilter::all()).await.unwrap();
        let ids: Vec<_> = all.iter().map(|g| g.game_id.as_str()).collect();
        assert_eq!(ids, vec!["g1", "g2", "g3"]);

        let jets = store.list(&GameFilter::for_team("NYJ")).await.unwrap();
        assert_eq!(jets.len(), 2);

        let week_one = store.list(&GameFilter::for_week(1)).await.unwrap();
        assert_eq!(week_one.len(), 2);
    }

    #[tokio::test]
    async fn test_assign_games_updates_stored_posts() {
        let store = InMemoryStore::new();
        let posted_at = Utc.with_ymd_and_hms(2016, 9, 11, 17, 3, 0).unwrap();
        let post = Event {
            event_id: "1".to_string(),
            team_id: "NYJ".to_string(),
            posted_at,
            sentiment_score: 0.5,
            game_id: None,
        };
        store.insert_events(&[post.clone()]).await.unwrap();
        assert_eq!(store.list_unattributed().await.unwrap().len(), 1);

        let assigned = Event {
            game_id: Some("g1".to_string()),
            ..post.clone()
        };
        let unknown = Event {
            event_id: "2".to_string(),
            ..assigned.clone()
        };
        assert_eq!(store.assign_games(&[assigned.clone(), unknown]).await.unwrap(), 1);
        assert_eq!(store.assign_games(&[assigned]).await.unwrap(), 0);

        assert!(store.list_unattributed().await.unwrap().is_empty());
        assert_eq!(store.list_for_game("g1", true).await.unwrap().len(), 1);
        assert_eq!(store.event_count(), 1);
    }

    #[tokio::test]
    async fn test_upsert_keeps_original_kickoff() {
        let store = InMemoryStore::new();
        let original = game("g1", "NYJ", "CIN", 1);
        store.upsert(&original).await.unwrap();

        let mut moved = original.clone();
        moved.scheduled_start = original.scheduled_start + Duration::hours(3);
        moved.week = 2;
        store.upsert(&moved).await.unwrap();

        let stored = store.get("g1").await.unwrap().unwrap();
        assert_eq!(stored.scheduled_start, original.scheduled_start);
        assert_eq!(stored.week, 2);
        assert!(store.get("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_insert_events_skips_duplicates() {
        let store = InMemoryStore::new();
        let posted_at = Utc.with_ymd_and_hms(2016, 9, 11, 17, 5, 0).unwrap();
        let post = |id: &str, team: &str, score: f64| Event {
            event_id: id.to_string(),
            team_id: team.to_string(),
            posted_at,
            sentiment_score: score,
            game_id: Some("g1".to_string()),
        };

        let first = store
            .insert_events(&[post("1", "NYJ", 0.3), post("2", "NYJ", 0.0)])
            .await
            .unwrap();
        assert_eq!(first, 2);

        let second = store
            .insert_events(&[post("1", "NYJ", 0.3), post("1", "CIN", 0.1)])
            .await
            .unwrap();
        assert_eq!(second, 1);
        assert_eq!(store.event_count(), 3);

        assert_eq!(store.list_for_game("g1", false).await.unwrap().len(), 3);
        assert_eq!(store.list_for_game("g1", true).await.unwrap().len(), 2);
        assert!(store.list_for_game("g2", false).await.unwrap().is_empty());
    }
}
