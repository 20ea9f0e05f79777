//! Time-bucketed sentiment statistics
//!
//! - `grid`: fixed-width bucket grid over a game window
//! - `aggregate`: per-bucket counts and mean sentiment
//! - `counts`: per-game post totals

pub mod aggregate;
pub mod counts;
pub mod grid;

pub use aggregate::{aggregate, Bucket};
pub use counts::PostCounts;
pub use grid::{bucket_index, build_grid, BucketGrid, DEFAULT_BUCKET_WIDTH_MINUTES};
