use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::TeamSide;

/// Part of the season a game belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SeasonType {
    Pre,
    Reg,
    Post,
}

impl SeasonType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SeasonType::Pre => "PRE",
            SeasonType::Reg => "REG",
            SeasonType::Post => "POST",
        }
    }
}

impl std::fmt::Display for SeasonType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<&str> for SeasonType {
    type Error = String;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        match s.to_uppercase().as_str() {
            "PRE" => Ok(SeasonType::Pre),
            "REG" => Ok(SeasonType::Reg),
            "POST" => Ok(SeasonType::Post),
            _ => Err(format!("Unknown season type: {}", s)),
        }
    }
}

/// One scheduled contest between two teams
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Game {
    pub game_id: String,
    pub home_team_id: String,
    pub away_team_id: String,
    /// Kickoff, always UTC. Set once when the game is first stored.
    pub scheduled_start: DateTime<Utc>,
    pub week: i32,
    pub season_type: SeasonType,
}

impl Game {
    /// Which side a team plays on, if it plays in this game at all
    pub fn side_of(&self, team_id: &str) -> Option<TeamSide> {
        if team_id == self.home_team_id {
            Some(TeamSide::Home)
        } else if team_id == self.away_team_id {
            Some(TeamSide::Away)
        } else {
            None
        }
    }

    pub fn involves(&self, team_id: &str) -> bool {
        self.side_of(team_id).is_some()
    }

    pub fn team_id(&self, side: TeamSide) -> &str {
        match side {
            TeamSide::Home => &self.home_team_id,
            TeamSide::Away => &self.away_team_id,
        }
    }

    /// Collection window under the given policy
    pub fn window(&self, policy: &WindowPolicy) -> GameWindow {
        policy.window(self.scheduled_start)
    }
}

/// How far the collection window reaches around kickoff
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowPolicy {
    pub pregame: Duration,
    pub postgame: Duration,
}

impl Default for WindowPolicy {
    fn default() -> Self {
        Self {
            pregame: Duration::hours(1),
            postgame: Duration::hours(4),
        }
    }
}

impl WindowPolicy {
    pub fn window(&self, scheduled_start: DateTime<Utc>) -> GameWindow {
        GameWindow {
            pregame_start: scheduled_start - self.pregame,
            postgame_end: scheduled_start + self.postgame,
        }
    }
}

/// Half-open span `[pregame_start, postgame_end)` during which posts belong to a game.
///
/// Derived from the scheduled start on demand and never stored, so a schedule
/// correction is picked up by the next call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameWindow {
    pub pregame_start: DateTime<Utc>,
    pub postgame_end: DateTime<Utc>,
}

impl GameWindow {
    pub fn new(pregame_start: DateTime<Utc>, postgame_end: DateTime<Utc>) -> Self {
        Self {
            pregame_start,
            postgame_end,
        }
    }

    /// Window under the default one-hour / four-hour policy
    pub fn for_start(scheduled_start: DateTime<Utc>) -> Self {
        WindowPolicy::default().window(scheduled_start)
    }

    pub fn contains(&self, t: DateTime<Utc>) -> bool {
        self.pregame_start <= t && t < self.postgame_end
    }

    pub fn span(&self) -> Duration {
        self.postgame_end - self.pregame_start
    }

    pub fn is_inverted(&self) -> bool {
        self.pregame_start >= self.postgame_end
    }
}

/// `(pregame_start, postgame_end)` for a kickoff under the default policy
pub fn window(scheduled_start: DateTime<Utc>) -> GameWindow {
    GameWindow::for_start(scheduled_start)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn kickoff() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2016, 9, 11, 17, 0, 0).unwrap()
    }

    fn sample_game() -> Game {
        Game {
            game_id: "2016091100".to_string(),
            home_team_id: "NYJ".to_string(),
            away_team_id: "CIN".to_string(),
            scheduled_start: kickoff(),
            week: 1,
            season_type: SeasonType::Reg,
        }
    }

    #[test]
    fn test_default_window_spans_five_hours() {
        let w = window(kickoff());
        assert_eq!(w.pregame_start, Utc.with_ymd_and_hms(2016, 9, 11, 16, 0, 0).unwrap());
        assert_eq!(w.postgame_end, Utc.with_ymd_and_hms(2016, 9, 11, 21, 0, 0).unwrap());
        assert_eq!(w.span(), Duration::hours(5));
        assert!(!w.is_inverted());
    }

    #[test]
    fn test_window_is_half_open() {
        let w = window(kickoff());
        assert!(w.contains(w.pregame_start));
        assert!(!w.contains(w.postgame_end));
        assert!(w.contains(w.postgame_end - Duration::seconds(1)));
        assert!(!w.contains(w.pregame_start - Duration::seconds(1)));
    }

    #[test]
    fn test_side_of() {
        let game = sample_game();
        assert_eq!(game.side_of("NYJ"), Some(TeamSide::Home));
        assert_eq!(game.side_of("CIN"), Some(TeamSide::Away));
        assert_eq!(game.side_of("NE"), None);
        assert_eq!(game.team_id(TeamSide::Away), "CIN");
    }

    #[test]
    fn test_season_type_parse() {
        assert_eq!(SeasonType::try_from("reg"), Ok(SeasonType::Reg));
        assert_eq!(SeasonType::try_from("POST"), Ok(SeasonType::Post));
        assert!(SeasonType::try_from("playoffs").is_err());
    }
}
