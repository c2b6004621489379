//! Per-request stage timing.
//!
//! A [`RequestTimer`] is created at the start of one delivery, passed down
//! by `&mut`, and reported once at the end. Concurrent requests each own
//! their own timer, so their marks never interleave.

use std::time::{Duration, Instant};

#[derive(Debug)]
pub struct RequestTimer {
    start: Instant,
    marks: Vec<(&'static str, Instant)>,
}

impl RequestTimer {
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
            marks: Vec::new(),
        }
    }

    /// Record the end of a named stage.
    pub fn mark(&mut self, stage: &'static str) {
        self.marks.push((stage, Instant::now()));
    }

    /// Duration of each stage since the previous mark (or the start).
    pub fn stages(&self) -> Vec<(&'static str, Duration)> {
        let mut prev = self.start;
        self.marks
            .iter()
            .map(|&(stage, at)| {
                let elapsed = at.duration_since(prev);
                prev = at;
                (stage, elapsed)
            })
            .collect()
    }

    pub fn total(&self) -> Duration {
        self.start.elapsed()
    }

    /// Emit one `debug!` per stage plus the total.
    pub fn report(&self) {
        for (stage, elapsed) in self.stages() {
            tracing::debug!(stage, elapsed_us = elapsed.as_micros() as u64, "stage timing");
        }
        tracing::debug!(total_us = self.total().as_micros() as u64, "request timing");
    }
}
