use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::domain::GamePhase;

#[derive(Parser, Debug)]
#[command(name = "fanfare")]
#[command(author = "Fanfare Team")]
#[command(version = "0.1.0")]
#[command(about = "Game phase tracking and fan sentiment charts", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Directory holding default.toml and environment overrides
    #[arg(short, long, default_value = "config", env = "FANFARE_CONFIG_DIR")]
    pub config: PathBuf,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Apply database migrations
    Migrate,
    /// Load or update games from a JSON array
    LoadGames {
        /// Path to the schedule file
        file: PathBuf,
    },
    /// Show the current phase of a game
    Phase {
        /// Game ID
        game_id: String,
    },
    /// List games, optionally only those in the given phases
    Games {
        /// Phases to select (e.g. live,starting)
        #[arg(short, long, value_delimiter = ',')]
        phase: Vec<GamePhase>,
    },
    /// Bucketed sentiment chart for a game
    Chart {
        /// Game ID
        game_id: String,
        /// Bucket width in minutes (defaults to the configured width)
        #[arg(short, long)]
        width: Option<i64>,
    },
    /// Every game with its phase and post counts
    Summary {
        /// Restrict to one week
        #[arg(short, long)]
        week: Option<i32>,
    },
    /// Resolve which game a post belongs to
    Attribute {
        /// Team ID of the post
        #[arg(short, long)]
        team: String,
        /// Post time, RFC 3339
        #[arg(short, long)]
        at: DateTime<Utc>,
    },
    /// List the collection work games still need
    Plan,
    /// Attribute and store posts from a JSON array of collector records
    Ingest {
        /// Path to the posts file
        file: PathBuf,
    },
    /// Report phase changes until interrupted
    Monitor,
}
