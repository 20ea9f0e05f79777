use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::FanfareError;

/// Score that marks a post as not scored; such posts never reach the aggregates.
pub const UNSCORED_SENTIMENT: f64 = 0.0;

/// Which side of a game a team plays on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TeamSide {
    Home,
    Away,
}

impl TeamSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            TeamSide::Home => "home",
            TeamSide::Away => "away",
        }
    }
}

impl std::fmt::Display for TeamSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A normalized social-media post tagged for one team
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Unique within a team
    pub event_id: String,
    pub team_id: String,
    pub posted_at: DateTime<Utc>,
    /// Compound sentiment in roughly [-1, 1]; exactly 0 means unscored
    pub sentiment_score: f64,
    /// Game the post was attributed to, if any
    #[serde(default)]
    pub game_id: Option<String>,
}

impl Event {
    pub fn is_scored(&self) -> bool {
        self.sentiment_score != UNSCORED_SENTIMENT
    }
}

/// Post id as sent by the collector, numeric for API results and text for scrapes
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawId {
    Number(u64),
    Text(String),
}

impl RawId {
    fn into_string(self) -> String {
        match self {
            RawId::Number(n) => n.to_string(),
            RawId::Text(s) => s.trim().to_string(),
        }
    }
}

/// Sentiment as sent by the collector; some stores keep it as text
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawScore {
    Number(f64),
    Text(String),
}

/// Record produced by the external collector
#[derive(Debug, Clone, Deserialize)]
pub struct RawPost {
    pub tweetid: RawId,
    pub teamid: String,
    pub postedtime: String,
    #[serde(default)]
    pub sent_compound: Option<RawScore>,
    #[serde(default)]
    pub gameid: Option<String>,
}

impl TryFrom<RawPost> for Event {
    type Error = FanfareError;

    fn try_from(raw: RawPost) -> Result<Self, Self::Error> {
        let event_id = raw.tweetid.into_string();
        if event_id.is_empty() {
            return Err(FanfareError::InvalidPayload("post has an empty id".to_string()));
        }

        let team_id = raw.teamid.trim().to_string();
        if team_id.is_empty() {
            return Err(FanfareError::InvalidPayload(format!(
                "post {} has no team",
                event_id
            )));
        }

        let posted_at = parse_posted_time(&raw.postedtime).ok_or_else(|| {
            FanfareError::InvalidPayload(format!(
                "post {} has unreadable time {:?}",
                event_id, raw.postedtime
            ))
        })?;

        let sentiment_score = match raw.sent_compound {
            None => UNSCORED_SENTIMENT,
            Some(RawScore::Number(n)) => n,
            Some(RawScore::Text(s)) if s.trim().is_empty() => UNSCORED_SENTIMENT,
            Some(RawScore::Text(s)) => s.trim().parse::<f64>().map_err(|_| {
                FanfareError::InvalidPayload(format!("post {} has score {:?}", event_id, s))
            })?,
        };
        if !sentiment_score.is_finite() {
            return Err(FanfareError::InvalidPayload(format!(
                "post {} has non-finite score",
                event_id
            )));
        }

        Ok(Event {
            event_id,
            team_id,
            posted_at,
            sentiment_score,
            game_id: raw.gameid.filter(|g| !g.trim().is_empty()),
        })
    }
}

/// Parse a post timestamp as UTC.
///
/// Accepts RFC 3339, the API form `Sun Sep 11 17:03:00 +0000 2016`, and
/// anything starting with `2016-09-11T17:03:00` or `2016-09-11 17:03:00`.
pub fn parse_posted_time(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }

    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%a %b %d %H:%M:%S +0000 %Y") {
        return Some(naive.and_utc());
    }

    let prefix = s.get(..19)?;
    NaiveDateTime::parse_from_str(prefix, "%Y-%m-%dT%H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(prefix, "%Y-%m-%d %H:%M:%S"))
        .ok()
        .map(|naive| naive.and_utc())
}
