use chrono::{DateTime, Duration, Utc};

use crate::domain::GameWindow;
use crate::error::{FanfareError, Result};

pub const DEFAULT_BUCKET_WIDTH_MINUTES: i64 = 5;

/// Fixed-width time slots tiling a game window.
///
/// Bucket `i` covers `[starts[i], starts[i] + width)`. A trailing slot shorter
/// than `width` is dropped, so the grid may end before the window does.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketGrid {
    starts: Vec<DateTime<Utc>>,
    width: Duration,
}

impl BucketGrid {
    /// `floor(span_minutes / width_minutes)` buckets starting at `pregame_start`
    pub fn build(window: &GameWindow, width_minutes: i64) -> Result<Self> {
        if width_minutes <= 0 {
            return Err(FanfareError::EmptyGameWindow(format!(
                "bucket width must be positive, got {} minutes",
                width_minutes
            )));
        }
        if window.is_inverted() {
            return Err(FanfareError::EmptyGameWindow(format!(
                "window starts at {} but ends at {}",
                window.pregame_start, window.postgame_end
            )));
        }

        let span_minutes = window.span().num_minutes();
        let count = span_minutes / width_minutes;
        if count == 0 {
            return Err(FanfareError::EmptyGameWindow(format!(
                "{} minute window is narrower than one {} minute bucket",
                span_minutes, width_minutes
            )));
        }

        let width = Duration::minutes(width_minutes);
        let starts = (0..count)
            .map(|i| window.pregame_start + Duration::minutes(i * width_minutes))
            .collect();

        Ok(Self { starts, width })
    }

    pub fn len(&self) -> usize {
        self.starts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.starts.is_empty()
    }

    pub fn width(&self) -> Duration {
        self.width
    }

    pub fn starts(&self) -> &[DateTime<Utc>] {
        &self.starts
    }

    pub fn start(&self, index: usize) -> Option<DateTime<Utc>> {
        self.starts.get(index).copied()
    }

    /// Exclusive end of the last bucket
    pub fn end(&self) -> DateTime<Utc> {
        match self.starts.last() {
            Some(last) => *last + self.width,
            None => DateTime::<Utc>::MIN_UTC,
        }
    }

    /// Index of the bucket containing `t`, or `None` outside the grid.
    ///
    /// Compares full instants, so posts after midnight never land in an
    /// evening bucket. A boundary instant belongs to the bucket it starts.
    pub fn bucket_index(&self, t: DateTime<Utc>) -> Option<usize> {
        let first = *self.starts.first()?;
        if t < first {
            return None;
        }

        let offset_ms = (t - first).num_milliseconds();
        let width_ms = self.width.num_milliseconds();
        let index = usize::try_from(offset_ms / width_ms).ok()?;

        if index < self.starts.len() {
            Some(index)
        } else {
            None
        }
    }
}

/// Build the grid for a window
pub fn build_grid(window: &GameWindow, bucket_width_minutes: i64) -> Result<BucketGrid> {
    BucketGrid::build(window, bucket_width_minutes)
}

/// Bucket for a post time
pub fn bucket_index(posted_at: DateTime<Utc>, grid: &BucketGrid) -> Option<usize> {
    grid.bucket_index(posted_at)
}
