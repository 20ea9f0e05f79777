use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::WindowPolicy;

/// Lifecycle phase of a game relative to the current time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GamePhase {
    /// More than the upcoming threshold away
    Pending,
    /// Kicks off within the upcoming threshold
    Upcoming,
    /// Kicks off within the starting threshold
    Starting,
    /// Between kickoff and the end of the postgame window
    Live,
    /// Finished within the historic threshold
    Recent,
    /// Kicked off at least the historic threshold ago
    Historic,
}

impl GamePhase {
    pub const ALL: [GamePhase; 6] = [
        GamePhase::Pending,
        GamePhase::Upcoming,
        GamePhase::Starting,
        GamePhase::Live,
        GamePhase::Recent,
        GamePhase::Historic,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            GamePhase::Pending => "pending",
            GamePhase::Upcoming => "upcoming",
            GamePhase::Starting => "starting",
            GamePhase::Live => "live",
            GamePhase::Recent => "recent",
            GamePhase::Historic => "historic",
        }
    }

    /// Phases during which posts should be collected as they arrive
    pub fn is_monitored(&self) -> bool {
        matches!(self, GamePhase::Starting | GamePhase::Live)
    }

    /// Phases whose window has fully elapsed
    pub fn is_finished(&self) -> bool {
        matches!(self, GamePhase::Recent | GamePhase::Historic)
    }
}

impl fmt::Display for GamePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<&str> for GamePhase {
    type Error = String;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(GamePhase::Pending),
            "upcoming" => Ok(GamePhase::Upcoming),
            "starting" => Ok(GamePhase::Starting),
            "live" => Ok(GamePhase::Live),
            "recent" => Ok(GamePhase::Recent),
            "historic" => Ok(GamePhase::Historic),
            _ => Err(format!("Unknown phase: {}", s)),
        }
    }
}

impl std::str::FromStr for GamePhase {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        GamePhase::try_from(s)
    }
}

/// Thresholds used to classify a game
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhasePolicy {
    pub historic_after: Duration,
    pub upcoming_within: Duration,
    pub starting_within: Duration,
    pub window: WindowPolicy,
}

impl Default for PhasePolicy {
    fn default() -> Self {
        Self {
            historic_after: Duration::days(7),
            upcoming_within: Duration::hours(1),
            starting_within: Duration::minutes(15),
            window: WindowPolicy::default(),
        }
    }
}

impl PhasePolicy {
    /// Classify a game from its kickoff and the current instant.
    ///
    /// Ordered decision list, first match wins. Kickoff is compared directly
    /// (not the pregame start). `historic` is inclusive at its boundary; every
    /// other comparison is strict, which leaves two instants unclassified:
    /// exactly at kickoff, and exactly at the end of the postgame window of a
    /// game younger than the historic threshold. Those return `None`.
    pub fn classify(&self, scheduled_start: DateTime<Utc>, now: DateTime<Utc>) -> Option<GamePhase> {
        let post = scheduled_start + self.window.postgame;
        let one_week_ago = now - self.historic_after;
        let soon = now + self.upcoming_within;
        let imminent = now + self.starting_within;

        if scheduled_start <= one_week_ago {
            Some(GamePhase::Historic)
        } else if scheduled_start > one_week_ago && post < now {
            Some(GamePhase::Recent)
        } else if scheduled_start < now && post > now {
            Some(GamePhase::Live)
        } else if now < scheduled_start && scheduled_start < imminent {
            Some(GamePhase::Starting)
        } else if now < scheduled_start && scheduled_start < soon {
            Some(GamePhase::Upcoming)
        } else if scheduled_start > now {
            Some(GamePhase::Pending)
        } else {
            None
        }
    }
}

/// Classify with the default thresholds
pub fn classify(scheduled_start: DateTime<Utc>, now: DateTime<Utc>) -> Option<GamePhase> {
    PhasePolicy::default().classify(scheduled_start, now)
}
