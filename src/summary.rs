use serde::Serialize;
use std::fmt;
use std::time::Duration;

/// Final counters of one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub elapsed: Duration,
}

impl RunSummary {
    pub fn elapsed_ms(&self) -> u128 {
        self.elapsed.as_millis()
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "succeeded={} failed={} total={} elapsed={}ms",
            self.succeeded,
            self.failed,
            self.total,
            self.elapsed_ms()
        )
    }
}
