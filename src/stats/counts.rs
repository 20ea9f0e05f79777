use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::domain::{Event, Game, TeamSide};

/// Scored posts per side for one game
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostCounts {
    pub home: u64,
    pub away: u64,
    pub total: u64,
}

impl PostCounts {
    /// Count scored posts for the two teams in `game`, each `(team_id, event_id)` once
    pub fn tally(game: &Game, events: &[Event]) -> Self {
        let mut seen = HashSet::new();
        let mut counts = PostCounts::default();

        for event in events.iter().filter(|e| e.is_scored()) {
            let Some(side) = game.side_of(&event.team_id) else {
                continue;
            };
            if !seen.insert((event.team_id.as_str(), event.event_id.as_str())) {
                continue;
            }
            match side {
                TeamSide::Home => counts.home += 1,
                TeamSide::Away => counts.away += 1,
            }
        }

        counts.total = counts.home + counts.away;
        counts
    }
}
