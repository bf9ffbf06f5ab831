//! Zero-crossing handler and fade application
//!
//! Runs in interrupt context once per mains half-cycle. All work here is
//! bounded: one pass over at most `FADE_CAPACITY` records, one hardware write
//! per channel, no allocation and no blocking.

use heapless::Vec;
use log::warn;
use portable_atomic::Ordering;

use crate::config::{DEBOUNCE_SPINS, FADE_CAPACITY, MAX_CHANNELS};
use crate::dimmer::Dimmer;
use crate::error::Error;
use crate::fade::FadeRecord;
use crate::phase::PhaseCommand;
use crate::{PhaseTimer, ZeroCrossInput};

/// Result of one zero-crossing edge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeOutcome {
    /// The level was gone after the debounce delay; nothing happened
    Rejected,
    /// The half-cycle was processed
    Processed {
        /// Half-cycle the fades were evaluated at
        cycle: u32,
        /// Records retired from the fade buffer
        retired: usize,
        /// Completion notifications that were posted
        completed: usize,
    },
}

/// Zero-crossing interrupt handler
///
/// Owns the phase timer and detector input. Call [`ZeroCrossEngine::on_edge`]
/// from the detector's edge interrupt.
pub struct ZeroCrossEngine<'a, T: PhaseTimer, I: ZeroCrossInput> {
    dimmer: &'a Dimmer,
    timer: T,
    input: I,
}

impl<'a, T: PhaseTimer, I: ZeroCrossInput> ZeroCrossEngine<'a, T, I> {
    pub(crate) const fn new(dimmer: &'a Dimmer, timer: T, input: I) -> Self {
        Self {
            dimmer,
            timer,
            input,
        }
    }

    pub(crate) fn release(self) -> (T, I) {
        (self.timer, self.input)
    }

    /// Access the phase timer driver
    pub fn timer(&self) -> &T {
        &self.timer
    }

    /// Handle one detector edge
    pub fn on_edge(&mut self) -> EdgeOutcome {
        for _ in 0..DEBOUNCE_SPINS {
            core::hint::spin_loop();
        }
        if !self.input.is_asserted() {
            self.dimmer
                .counters
                .rejected_edges
                .fetch_add(1, Ordering::Relaxed);
            return EdgeOutcome::Rejected;
        }

        self.timer.reset_counter();

        let cycle = self.dimmer.half_cycles.load(Ordering::Relaxed);
        let outcome = self.apply_fades(cycle);
        self.dimmer
            .half_cycles
            .store(cycle.wrapping_add(1), Ordering::Release);
        outcome
    }

    /// Program the hardware for `cycle`, then retire and report finished fades
    fn apply_fades(&mut self, cycle: u32) -> EdgeOutcome {
        let mut commands: [Option<(PhaseCommand, u16)>; MAX_CHANNELS as usize] =
            [None; MAX_CHANNELS as usize];
        let mut finished: Vec<FadeRecord, FADE_CAPACITY> = Vec::new();

        // Later records win for a channel; chained fades agree at their seam.
        for fade in self.dimmer.fades.iter_active() {
            let Some(brightness) = fade.brightness_at(cycle) else {
                continue;
            };
            let command = PhaseCommand::for_brightness(brightness);
            for channel in fade.channel_iter() {
                commands[channel as usize] = Some((command, brightness));
            }
            if fade.end_cycle == cycle {
                let _ = finished.push(fade);
            }
        }

        for (channel, entry) in (0..MAX_CHANNELS).zip(commands) {
            let Some((command, brightness)) = entry else {
                continue;
            };
            match command {
                PhaseCommand::Fire { hpoint, width } => self.timer.fire_at(channel, hpoint, width),
                PhaseCommand::Off => self.timer.disable_output(channel),
            }
            self.dimmer.publish(channel, command, brightness);
        }

        // Retire only after the hardware is programmed. Notify only after the
        // start cursor moved.
        let retired = self.dimmer.fades.retire_up_to(cycle).len();

        let mut completed = 0;
        for fade in finished {
            if self.notify_finished(fade).is_ok() {
                completed += 1;
            }
        }

        EdgeOutcome::Processed {
            cycle,
            retired,
            completed,
        }
    }

    fn notify_finished(&self, fade: FadeRecord) -> Result<(), Error> {
        if self.dimmer.completions.try_send(fade).is_err() {
            self.dimmer
                .counters
                .dropped_completions
                .fetch_add(1, Ordering::Relaxed);
            warn!(target: "fade", "Dropped completion of fade ending at {}", fade.end_cycle);
            return Err(Error::CompletionDropped);
        }
        Ok(())
    }
}
