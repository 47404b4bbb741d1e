//! Stopwatch used to measure load and startup times.

use std::time::Instant;

/// Measures the wall clock time since it was started.
pub struct Watch {
    started_at: Instant,
}

impl Watch {
    pub fn start() -> Self {
        Watch {
            started_at: Instant::now(),
        }
    }

    /// Returns the elapsed microseconds, saturating at `u32::MAX` (roughly 71 minutes).
    pub fn elapsed_us(&self) -> u32 {
        u32::try_from(self.started_at.elapsed().as_micros()).unwrap_or(u32::MAX)
    }
}
