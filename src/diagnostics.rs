//! Periodic status reporting

use core::fmt;

use embassy_time::{Duration, Instant, Timer};
use log::info;
use portable_atomic::{AtomicU32, Ordering};

use crate::dimmer::Dimmer;

/// Counters of dropped or suppressed events
pub(crate) struct DropCounters {
    pub(crate) dropped_requests: AtomicU32,
    pub(crate) dropped_fades: AtomicU32,
    pub(crate) dropped_completions: AtomicU32,
    pub(crate) rejected_edges: AtomicU32,
}

impl DropCounters {
    pub(crate) const fn new() -> Self {
        Self {
            dropped_requests: AtomicU32::new(0),
            dropped_fades: AtomicU32::new(0),
            dropped_completions: AtomicU32::new(0),
            rejected_edges: AtomicU32::new(0),
        }
    }
}

/// Snapshot of the dimmer's health
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Diagnostics {
    pub uptime: Duration,
    pub half_cycles: u32,
    pub active_fades: usize,
    /// Requests rejected because the request queue was full
    pub dropped_requests: u32,
    /// Fades dropped because the fade buffer was full
    pub dropped_fades: u32,
    /// Completion notifications lost to a full queue
    pub dropped_completions: u32,
    /// Detector edges suppressed by the debounce check
    pub rejected_edges: u32,
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "At time {}.{:03}, cycle count {} with {} active fades (dropped: {} requests, {} fades, {} completions; {} edges rejected)",
            self.uptime.as_secs(),
            self.uptime.as_millis() % 1000,
            self.half_cycles,
            self.active_fades,
            self.dropped_requests,
            self.dropped_fades,
            self.dropped_completions,
            self.rejected_edges
        )
    }
}

impl Dimmer {
    /// Take a diagnostics snapshot
    pub fn diagnostics(&self) -> Diagnostics {
        Diagnostics {
            uptime: Duration::from_millis(Instant::now().as_millis()),
            half_cycles: self.half_cycles(),
            active_fades: self.active_fades(),
            dropped_requests: self.counters.dropped_requests.load(Ordering::Relaxed),
            dropped_fades: self.counters.dropped_fades.load(Ordering::Relaxed),
            dropped_completions: self.counters.dropped_completions.load(Ordering::Relaxed),
            rejected_edges: self.counters.rejected_edges.load(Ordering::Relaxed),
        }
    }

    /// Log a diagnostics snapshot every `interval`
    pub async fn run_diagnostics(&self, interval: Duration) -> ! {
        info!(target: "startup", "Diagnostics task started, reporting every {} ms", interval.as_millis());
        loop {
            Timer::after(interval).await;
            info!(target: "cycles", "{}", self.diagnostics());
        }
    }
}
