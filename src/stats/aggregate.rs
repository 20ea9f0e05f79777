//! Per-bucket post counts and mean sentiment for one game.
//!
//! Every call recomputes from the snapshot it is given. Nothing is cached and
//! nothing depends on the current time, so calling twice with the same events
//! and grid yields identical output.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::debug;

use super::BucketGrid;
use crate::domain::{Event, Game, TeamSide};

/// One slot of the chart's x-axis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bucket {
    pub index: usize,
    pub bucket_start: DateTime<Utc>,
    pub home_count: u32,
    /// `None` when no scored home post fell in this bucket
    pub home_mean_sentiment: Option<f64>,
    pub away_count: u32,
    pub away_mean_sentiment: Option<f64>,
}

/// Running totals for one side of the game
#[derive(Debug, Clone)]
struct SideSeries {
    counts: Vec<u32>,
    sums: Vec<f64>,
}

impl SideSeries {
    /// Zero counts and no means in every bucket
    fn empty(len: usize) -> Self {
        Self {
            counts: vec![0; len],
            sums: vec![0.0; len],
        }
    }

    fn add(&mut self, index: usize, score: f64) {
        self.counts[index] += 1;
        self.sums[index] += score;
    }

    fn mean(&self, index: usize) -> Option<f64> {
        match self.counts[index] {
            0 => None,
            n => Some(self.sums[index] / f64::from(n)),
        }
    }
}

/// Bucket one game's posts and compute count and mean sentiment per side.
///
/// Posts scored exactly zero, posts from teams not in `game`, and posts
/// outside the grid are skipped. Repeated `(team_id, event_id)` pairs count
/// once. The full grid is always returned in index order.
pub fn aggregate(game: &Game, events: &[Event], grid: &BucketGrid) -> Vec<Bucket> {
    let mut qualifying: Vec<(TeamSide, usize, &Event)> = Vec::with_capacity(events.len());
    let mut foreign = 0usize;

    for event in events {
        if !event.is_scored() {
            continue;
        }
        let Some(side) = game.side_of(&event.team_id) else {
            foreign += 1;
            continue;
        };
        if let Some(index) = grid.bucket_index(event.posted_at) {
            qualifying.push((side, index, event));
        }
    }

    if foreign > 0 {
        debug!(
            "Skipped {} posts from teams not playing in game {}",
            foreign, game.game_id
        );
    }

    // Summation order fixed by post time, not by snapshot order
    qualifying.sort_by(|a, b| {
        a.2.posted_at
            .cmp(&b.2.posted_at)
            .then_with(|| a.2.event_id.cmp(&b.2.event_id))
            .then_with(|| a.2.team_id.cmp(&b.2.team_id))
    });

    let mut seen: HashSet<(&str, &str)> = HashSet::with_capacity(qualifying.len());
    let mut home = SideSeries::empty(grid.len());
    let mut away = SideSeries::empty(grid.len());

    for (side, index, event) in qualifying {
        if !seen.insert((event.team_id.as_str(), event.event_id.as_str())) {
            continue;
        }
        match side {
            TeamSide::Home => home.add(index, event.sentiment_score),
            TeamSide::Away => away.add(index, event.sentiment_score),
        }
    }

    grid.starts()
        .iter()
        .enumerate()
        .map(|(index, &bucket_start)| Bucket {
            index,
            bucket_start,
            home_count: home.counts[index],
            home_mean_sentiment: home.mean(index),
            away_count: away.counts[index],
            away_mean_sentiment: away.mean(index),
        })
        .collect()
}
