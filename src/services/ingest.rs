use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

use super::GameStatusService;
use crate::domain::{Event, Game, RawPost};
use crate::error::{FanfareError, Result};
use crate::persistence::{EventRepository, GameFilter};

/// Outcome of one ingest batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    /// Newly stored posts
    pub stored: u64,
    /// Already present, skipped by the store
    pub duplicates: u64,
    /// Newly stored posts that no game window matched
    pub unattributed: u64,
    /// Payloads that could not be mapped or attributed
    pub rejected: u64,
    /// Previously stored posts that now resolve to a game
    pub reattributed: u64,
}

/// Maps collector records to posts, attributes them, and stores them
pub struct IngestService {
    status: Arc<GameStatusService>,
    events: Arc<dyn EventRepository>,
}

impl IngestService {
    pub fn new(status: Arc<GameStatusService>, events: Arc<dyn EventRepository>) -> Self {
        Self { status, events }
    }

    /// Ingest one batch.
    ///
    /// Any game id carried by the payload is discarded and recomputed from
    /// the team and post time. Malformed payloads and ambiguous posts under
    /// the reject policy are counted and skipped; storage failures abort the
    /// batch. Stored posts still without a game are re-attributed afterwards.
    pub async fn ingest(&self, raw_posts: Vec<RawPost>) -> Result<IngestReport> {
        let mut report = IngestReport::default();
        let schedule = self.status.games(&GameFilter::all()).await?;
        let mut attributed: Vec<Event> = Vec::with_capacity(raw_posts.len());
        let mut unattributed: Vec<Event> = Vec::new();

        for raw in raw_posts {
            let mut event = match Event::try_from(raw) {
                Ok(event) => event,
                Err(e) => {
                    warn!("Rejected post: {}", e);
                    report.rejected += 1;
                    continue;
                }
            };

            match self
                .status
                .attribute_among(&schedule, &event.team_id, event.posted_at)
            {
                Ok(Some(game_id)) => {
                    event.game_id = Some(game_id);
                    attributed.push(event);
                }
                Ok(None) => {
                    event.game_id = None;
                    unattributed.push(event);
                }
                Err(e @ FanfareError::AmbiguousAttribution { .. }) => {
                    warn!("Rejected post {}: {}", event.event_id, e);
                    report.rejected += 1;
                }
                Err(e) => return Err(e),
            }
        }

        let stored_attributed = self.events.insert_events(&attributed).await?;
        report.unattributed = self.events.insert_events(&unattributed).await?;
        report.stored = stored_attributed + report.unattributed;
        report.duplicates = (attributed.len() + unattributed.len()) as u64 - report.stored;
        report.reattributed = self.reattribute_against(&schedule).await?;

        info!(
            "Ingested batch: {} stored, {} duplicates, {} unattributed, {} rejected, {} reattributed",
            report.stored,
            report.duplicates,
            report.unattributed,
            report.rejected,
            report.reattributed
        );
        Ok(report)
    }

    /// Give stored posts without a game another attribution pass against the
    /// current schedule. Run after games are loaded. Returns how many posts
    /// gained a game.
    pub async fn reattribute(&self) -> Result<u64> {
        let schedule = self.status.games(&GameFilter::all()).await?;
        let changed = self.reattribute_against(&schedule).await?;
        info!("Reattributed {} stored posts", changed);
        Ok(changed)
    }

    async fn reattribute_against(&self, schedule: &[Game]) -> Result<u64> {
        let pending = self.events.list_unattributed().await?;
        let mut resolved = Vec::new();

        for mut event in pending {
            match self
                .status
                .attribute_among(schedule, &event.team_id, event.posted_at)
            {
                Ok(Some(game_id)) => {
                    event.game_id = Some(game_id);
                    resolved.push(event);
                }
                Ok(None) => {}
                Err(e @ FanfareError::AmbiguousAttribution { .. }) => {
                    warn!("Left post {} without a game: {}", event.event_id, e);
                }
                Err(e) => return Err(e),
            }
        }

        if resolved.is_empty() {
            return Ok(0);
        }
        self.events.assign_games(&resolved).await
    }
}
