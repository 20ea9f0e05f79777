use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;
use tracing::{debug, info, instrument, warn};

use crate::domain::{Event, Game, SeasonType};
use crate::error::{FanfareError, Result};
use crate::persistence::{EventRepository, GameFilter, GameRepository};

/// PostgreSQL storage adapter
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Create a new PostgreSQL store
    pub async fn new(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;

        info!("Connected to PostgreSQL");
        Ok(Self { pool })
    }

    /// Create a PostgreSQL store from an existing connection pool
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Run migrations
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        info!("Database migrations completed");
        Ok(())
    }

    /// Get the connection pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    fn game_from_row(row: &PgRow) -> Result<Game> {
        let season_type: String = row.get("season_type");
        let season_type = SeasonType::try_from(season_type.as_str())
            .map_err(FanfareError::InvalidPayload)?;

        Ok(Game {
            game_id: row.get("game_id"),
            home_team_id: row.get("home_team_id"),
            away_team_id: row.get("away_team_id"),
            scheduled_start: row.get("scheduled_start"),
            week: row.get("week"),
            season_type,
        })
    }

    fn event_from_row(row: &PgRow) -> Event {
        Event {
            event_id: row.get("event_id"),
            team_id: row.get("team_id"),
            posted_at: row.get("posted_at"),
            sentiment_score: row.get("sentiment_score"),
            game_id: row.get("game_id"),
        }
    }
}

#[async_trait]
impl GameRepository for PostgresStore {
    #[instrument(skip(self))]
    async fn get(&self, game_id: &str) -> Result<Option<Game>> {
        let row = sqlx::query(
            r#"
            SELECT game_id, home_team_id, away_team_id, scheduled_start, week, season_type
            FROM games WHERE game_id = $1
            "#,
        )
        .bind(game_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(Self::game_from_row).transpose()
    }

    #[instrument(skip(self))]
    async fn list(&self, filter: &GameFilter) -> Result<Vec<Game>> {
        let rows = sqlx::query(
            r#"
            SELECT game_id, home_team_id, away_team_id, scheduled_start, week, season_type
            FROM games
            WHERE ($1::INTEGER IS NULL OR week = $1)
              AND ($2::TEXT IS NULL OR season_type = $2)
              AND ($3::TEXT IS NULL OR home_team_id = $3 OR away_team_id = $3)
            ORDER BY game_id ASC
            "#,
        )
        .bind(filter.week)
        .bind(filter.season_type.map(|s| s.as_str()))
        .bind(filter.team_id.as_deref())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::game_from_row).collect()
    }

    #[instrument(skip(self, game), fields(game_id = %game.game_id))]
    async fn upsert(&self, game: &Game) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO games (game_id, home_team_id, away_team_id, scheduled_start, week, season_type)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (game_id) DO UPDATE SET
                home_team_id = EXCLUDED.home_team_id,
                away_team_id = EXCLUDED.away_team_id,
                week = EXCLUDED.week,
                season_type = EXCLUDED.season_type
            "#,
        )
        .bind(&game.game_id)
        .bind(&game.home_team_id)
        .bind(&game.away_team_id)
        .bind(game.scheduled_start)
        .bind(game.week)
        .bind(game.season_type.as_str())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl EventRepository for PostgresStore {
    #[instrument(skip(self))]
    async fn list_for_game(&self, game_id: &str, exclude_zero_sentiment: bool) -> Result<Vec<Event>> {
        let rows = sqlx::query(
            r#"
            SELECT event_id, team_id, posted_at, sentiment_score, game_id
            FROM posts
            WHERE game_id = $1
              AND (NOT $2 OR sentiment_score <> 0)
            ORDER BY posted_at ASC, event_id ASC
            "#,
        )
        .bind(game_id)
        .bind(exclude_zero_sentiment)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(Self::event_from_row).collect())
    }

    /// Batch insert posts in one transaction
    async fn insert_events(&self, events: &[Event]) -> Result<u64> {
        if events.is_empty() {
            return Ok(0);
        }

        let mut tx = self.pool.begin().await?;
        let mut inserted = 0u64;

        for event in events {
            let result = sqlx::query(
                r#"
                INSERT INTO posts (event_id, team_id, posted_at, sentiment_score, game_id)
                VALUES ($1, $2, $3, $4, $5)
                ON CONFLICT (team_id, event_id) DO NOTHING
                "#,
            )
            .bind(&event.event_id)
            .bind(&event.team_id)
            .bind(event.posted_at)
            .bind(event.sentiment_score)
            .bind(event.game_id.as_deref())
            .execute(&mut *tx)
            .await?;

            inserted += result.rows_affected();
        }

        tx.commit().await?;

        let skipped = events.len() as u64 - inserted;
        if skipped > 0 {
            warn!("Skipped {} posts already stored", skipped);
        }
        debug!("Inserted {} posts", inserted);
        Ok(inserted)
    }

    #[instrument(skip(self))]
    async fn list_unattributed(&self) -> Result<Vec<Event>> {
        let rows = sqlx::query(
            r#"
            SELECT event_id, team_id, posted_at, sentiment_score, game_id
            FROM posts
            WHERE game_id IS NULL
            ORDER BY posted_at ASC, event_id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(Self::event_from_row).collect())
    }

    /// Reassign games in one transaction
    async fn assign_games(&self, events: &[Event]) -> Result<u64> {
        if events.is_empty() {
            return Ok(0);
        }

        let mut tx = self.pool.begin().await?;
        let mut changed = 0u64;

        for event in events {
            let result = sqlx::query(
                r#"
                UPDATE posts SET game_id = $3
                WHERE team_id = $1 AND event_id = $2
                  AND game_id IS DISTINCT FROM $3
                "#,
            )
            .bind(&event.team_id)
            .bind(&event.event_id)
            .bind(event.game_id.as_deref())
            .execute(&mut *tx)
            .await?;

            changed += result.rows_affected();
        }

        tx.commit().await?;
        debug!("Reassigned {} posts", changed);
        Ok(changed)
    }
}
