pub mod collection;
pub mod game_status;
pub mod ingest;
pub mod monitor;
pub mod statistics;

pub use collection::{CollectionKind, CollectionPlanner, CollectionTask};
pub use game_status::{GameStatus, GameStatusService};
pub use ingest::{IngestReport, IngestService};
pub use monitor::{PhaseChange, PhaseMonitor};
pub use statistics::{GameChart, GameSummary, StatisticsService};
