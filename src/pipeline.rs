//! Fade request pipeline
//!
//! Moves fade records from the request queue into the fade buffer. It is the
//! only code path that advances the buffer's end cursor, which keeps buffer
//! growth race-free no matter how many tasks request fades.

use log::{debug, error, info, warn};
use portable_atomic::Ordering;

use crate::dimmer::Dimmer;
use crate::fade::FadeRecord;

/// Single consumer of the fade request queue
pub struct RequestPipeline<'a> {
    dimmer: &'a Dimmer,
}

impl<'a> RequestPipeline<'a> {
    pub(crate) const fn new(dimmer: &'a Dimmer) -> Self {
        Self { dimmer }
    }

    /// Wait for requests forever, buffering each one as it arrives
    pub async fn run(&mut self) -> ! {
        info!(target: "startup", "Fade request pipeline started");
        loop {
            let record = self.dimmer.requests.receive().await;
            self.append(&record);
        }
    }

    /// Buffer all queued requests without waiting (non-blocking)
    ///
    /// Returns the number of records appended to the fade buffer.
    pub fn process_pending(&mut self) -> usize {
        let mut appended = 0;
        while let Ok(record) = self.dimmer.requests.try_receive() {
            if self.append(&record) {
                appended += 1;
            }
        }
        appended
    }

    /// Buffer one record; returns `false` if it was dropped
    fn append(&mut self, request: &FadeRecord) -> bool {
        let now = self.dimmer.half_cycles();
        // A record that ended before it reached the buffer would never be
        // applied, so it runs late instead.
        let record = if request.end_cycle < now {
            warn!(
                target: "fade",
                "At {}, fade ending at {} arrived late, rescheduled",
                now,
                request.end_cycle
            );
            request.rescheduled_at(now)
        } else {
            *request
        };

        if let Err(err) = self.dimmer.fades.append(&record) {
            self.dimmer
                .counters
                .dropped_fades
                .fetch_add(1, Ordering::Relaxed);
            self.dimmer.drop_tail(request);
            error!(target: "fade", "Dropping fade at {}: {}", now, err);
            return false;
        }
        debug!(
            target: "fade",
            "At {}, enqueued fade from time {}, brightness {} to time {}, brightness {}. {} active fades.",
            now,
            record.start_cycle,
            record.start_brightness,
            record.end_cycle,
            record.end_brightness,
            self.dimmer.active_fades()
        );
        true
    }
}
