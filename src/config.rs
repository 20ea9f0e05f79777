use chrono::Duration;
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::Path;

use crate::domain::{PhasePolicy, WindowPolicy};

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub timing: TimingConfig,
    #[serde(default)]
    pub attribution: AttributionConfig,
    #[serde(default)]
    pub collection: CollectionConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Phase thresholds and chart geometry
#[derive(Debug, Clone, Deserialize)]
pub struct TimingConfig {
    /// Width of one chart bucket
    #[serde(default = "default_bucket_width_minutes")]
    pub bucket_width_minutes: i64,
    /// Window opens this long before kickoff
    #[serde(default = "default_pregame_hours")]
    pub pregame_hours: i64,
    /// Window closes this long after kickoff
    #[serde(default = "default_postgame_hours")]
    pub postgame_hours: i64,
    /// Games that kicked off at least this long ago are historic
    #[serde(default = "default_historic_threshold_days")]
    pub historic_threshold_days: i64,
    #[serde(default = "default_upcoming_threshold_hours")]
    pub upcoming_threshold_hours: i64,
    #[serde(default = "default_starting_threshold_minutes")]
    pub starting_threshold_minutes: i64,
}

fn default_bucket_width_minutes() -> i64 {
    5
}

fn default_pregame_hours() -> i64 {
    1
}

fn default_postgame_hours() -> i64 {
    4
}

fn default_historic_threshold_days() -> i64 {
    7
}

fn default_upcoming_threshold_hours() -> i64 {
    1
}

fn default_starting_threshold_minutes() -> i64 {
    15
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            bucket_width_minutes: default_bucket_width_minutes(),
            pregame_hours: default_pregame_hours(),
            postgame_hours: default_postgame_hours(),
            historic_threshold_days: default_historic_threshold_days(),
            upcoming_threshold_hours: default_upcoming_threshold_hours(),
            starting_threshold_minutes: default_starting_threshold_minutes(),
        }
    }
}

/// Upper bounds keep every threshold well inside `chrono::Duration`'s range
const MAX_WINDOW_HOURS: i64 = 24 * 7;
const MAX_HISTORIC_DAYS: i64 = 3_650;
const MAX_UPCOMING_HOURS: i64 = 24 * 365;

impl TimingConfig {
    /// Expects a validated config; out-of-range values panic in `chrono`
    pub fn window_policy(&self) -> WindowPolicy {
        WindowPolicy {
            pregame: Duration::hours(self.pregame_hours),
            postgame: Duration::hours(self.postgame_hours),
        }
    }

    pub fn phase_policy(&self) -> PhasePolicy {
        PhasePolicy {
            historic_after: Duration::days(self.historic_threshold_days),
            upcoming_within: Duration::hours(self.upcoming_threshold_hours),
            starting_within: Duration::minutes(self.starting_threshold_minutes),
            window: self.window_policy(),
        }
    }
}

/// What to do when a post matches more than one game
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AmbiguityPolicy {
    /// Warn and take the earliest kickoff (ties by game id)
    #[default]
    Earliest,
    /// Fail the attribution
    Reject,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AttributionConfig {
    #[serde(default)]
    pub on_ambiguous: AmbiguityPolicy,
}

/// Targets the collection planner works toward
#[derive(Debug, Clone, Deserialize)]
pub struct CollectionConfig {
    /// Historic games are backfilled until they hold this many scored posts
    #[serde(default = "default_historic_target")]
    pub historic_target_posts: u64,
    /// Recent games are backfilled until they hold this many scored posts
    #[serde(default = "default_recent_target")]
    pub recent_target_posts: u64,
    /// Phase monitor polling interval
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
}

fn default_historic_target() -> u64 {
    10_000
}

fn default_recent_target() -> u64 {
    5_000
}

fn default_poll_interval_secs() -> u64 {
    60
}

impl Default for CollectionConfig {
    fn default() -> Self {
        Self {
            historic_target_posts: default_historic_target(),
            recent_target_posts: default_recent_target(),
            poll_interval_secs: default_poll_interval_secs(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    #[serde(default = "default_database_url")]
    pub url: String,
    /// Maximum connections in pool
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_database_url() -> String {
    "postgres://localhost/fanfare".to_string()
}

fn default_max_connections() -> u32 {
    5
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
            max_connections: default_max_connections(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Enable JSON formatted logs
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

impl AppConfig {
    /// Load configuration from files and environment
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from("config")
    }

    /// Load configuration from a specific directory
    pub fn load_from<P: AsRef<Path>>(config_dir: P) -> Result<Self, ConfigError> {
        let config_dir = config_dir.as_ref();

        let builder = Config::builder()
            // Start with default values
            .set_default("timing.bucket_width_minutes", default_bucket_width_minutes())?
            .set_default("logging.level", "info")?
            .set_default("logging.json", false)?
            .set_default("database.max_connections", 5)?
            // Load default config file
            .add_source(File::from(config_dir.join("default.toml")).required(false))
            // Load environment-specific config (e.g., config/production.toml)
            .add_source(
                File::from(config_dir.join(
                    std::env::var("FANFARE_ENV").unwrap_or_else(|_| "development".to_string()),
                ))
                .required(false),
            )
            // Override with environment variables (FANFARE_TIMING__BUCKET_WIDTH_MINUTES, etc.)
            .add_source(
                Environment::with_prefix("FANFARE")
                    .separator("__")
                    .try_parsing(true),
            );

        builder.build()?.try_deserialize()
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();
        let timing = &self.timing;

        if timing.bucket_width_minutes <= 0 {
            errors.push("bucket_width_minutes must be positive".to_string());
        }

        let window_hours = 0..=MAX_WINDOW_HOURS;
        if !window_hours.contains(&timing.pregame_hours)
            || !window_hours.contains(&timing.postgame_hours)
        {
            errors.push(format!(
                "pregame_hours and postgame_hours must be between 0 and {}",
                MAX_WINDOW_HOURS
            ));
        } else {
            let span_minutes = timing
                .pregame_hours
                .checked_add(timing.postgame_hours)
                .and_then(|h| h.checked_mul(60))
                .unwrap_or(i64::MAX);
            if span_minutes <= 0 {
                errors.push("game window must span a positive duration".to_string());
            } else if timing.bucket_width_minutes > span_minutes {
                errors.push(format!(
                    "bucket_width_minutes ({}) exceeds the {} minute game window",
                    timing.bucket_width_minutes, span_minutes
                ));
            }
        }

        if !(1..=MAX_HISTORIC_DAYS).contains(&timing.historic_threshold_days) {
            errors.push(format!(
                "historic_threshold_days must be between 1 and {}",
                MAX_HISTORIC_DAYS
            ));
        }

        if !(1..=MAX_UPCOMING_HOURS).contains(&timing.upcoming_threshold_hours)
            || timing.starting_threshold_minutes <= 0
        {
            errors.push(format!(
                "starting and upcoming thresholds must be positive, upcoming at most {} hours",
                MAX_UPCOMING_HOURS
            ));
        } else if timing
            .upcoming_threshold_hours
            .checked_mul(60)
            .filter(|&upcoming| timing.starting_threshold_minutes < upcoming)
            .is_none()
        {
            errors.push(
                "starting_threshold_minutes should be less than upcoming_threshold_hours".to_string(),
            );
        }

        if self.collection.poll_interval_secs == 0 {
            errors.push("poll_interval_secs must be positive".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
