//! [`FrameFreshness`] – per-source frame staleness tracking.
//!
//! Trackers latch their last result, so a camera that stopped producing frames
//! keeps reporting the same timestamp. The tracker counts consecutive cycles
//! with an unchanged timestamp and reports the source stale once the count
//! reaches the configured window. This is a diagnostic only: stale estimates
//! still go through validation like any other.

use serde::Serialize;
use tagfuse_types::PoseEstimate;

/// Health reported for a single source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceHealth {
    /// Nothing but the empty startup estimate has been seen.
    NoFrames,
    /// The timestamp changed within the window.
    Fresh,
    /// The timestamp has not changed for `stale_after` cycles.
    Stale,
}

#[derive(Debug, Clone)]
pub struct FrameFreshness {
    stale_after: u32,
    last_timestamp: Option<f64>,
    repeats: u32,
}

impl FrameFreshness {
    pub fn new(stale_after: u32) -> Self {
        Self {
            stale_after: stale_after.max(1),
            last_timestamp: None,
            repeats: 0,
        }
    }

    /// Record this cycle's estimate and return the resulting health.
    pub fn observe(&mut self, estimate: &PoseEstimate) -> SourceHealth {
        let ts = estimate.timestamp_seconds;
        match self.last_timestamp {
            None if !estimate.has_tags() && ts == 0.0 => {}
            Some(last) if last == ts => self.repeats = self.repeats.saturating_add(1),
            _ => {
                self.last_timestamp = Some(ts);
                self.repeats = 0;
            }
        }
        self.health()
    }

    pub fn health(&self) -> SourceHealth {
        match self.last_timestamp {
            None => SourceHealth::NoFrames,
            Some(_) if self.repeats >= self.stale_after => SourceHealth::Stale,
            Some(_) => SourceHealth::Fresh,
        }
    }

    /// Consecutive cycles the current timestamp has been repeated.
    pub fn repeats(&self) -> u32 {
        self.repeats
    }
}
