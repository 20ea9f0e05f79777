pub mod adapters;
pub mod cli;
pub mod clock;
pub mod config;
pub mod domain;
pub mod error;
pub mod persistence;
pub mod services;
pub mod stats;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::AppConfig;
pub use domain::{
    classify, window, Event, Game, GamePhase, GameWindow, PhasePolicy, RawPost, SeasonType,
    TeamSide, WindowPolicy,
};
pub use error::{FanfareError, Result};
pub use persistence::{EventRepository, GameFilter, GameRepository, InMemoryStore};
pub use services::{
    CollectionPlanner, GameStatusService, IngestService, PhaseMonitor, StatisticsService,
};
pub use stats::{aggregate, bucket_index, build_grid, Bucket, BucketGrid, PostCounts};
