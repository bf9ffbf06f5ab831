//! Process-wide dimmer state and the public fade API
//!
//! Every field has a single writer: the fade ring's end cursor belongs to the
//! request pipeline, its start cursor, the half-cycle counter and the channel
//! shadows belong to the zero-crossing handler. Callers in any task only read
//! that state and talk to the writers through the bounded queues.

use core::cell::Cell;

use critical_section::Mutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use embassy_time::Duration;
use log::{debug, info, warn};
use portable_atomic::{AtomicBool, AtomicU16, AtomicU32, AtomicU64, Ordering};

use crate::config::{
    COMPLETION_QUEUE_DEPTH, DimmerConfig, FADE_CAPACITY, MAX_BRIGHTNESS, MAX_CHANNELS,
    REQUEST_QUEUE_DEPTH,
};
use crate::diagnostics::DropCounters;
use crate::error::Error;
use crate::fade::FadeRecord;
use crate::phase::PhaseCommand;
use crate::pipeline::RequestPipeline;
use crate::ring::FadeRing;
use crate::zero_cross::ZeroCrossEngine;
use crate::{PhaseTimer, ZeroCrossInput};

/// Type alias for the fade request queue
pub type RequestChannel = Channel<CriticalSectionRawMutex, FadeRecord, REQUEST_QUEUE_DEPTH>;

/// Type alias for the fade completion queue
pub type CompletionChannel = Channel<CriticalSectionRawMutex, FadeRecord, COMPLETION_QUEUE_DEPTH>;

/// Last state programmed into a channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelState {
    /// Trigger offset in timer counts
    pub hpoint: u16,
    /// Gate pulse width in timer counts
    pub width: u16,
    /// Output enable flag
    pub enabled: bool,
    /// Logical brightness the offset was derived from
    pub brightness: u16,
}

struct ChannelShadow {
    hpoint: AtomicU16,
    width: AtomicU16,
    enabled: AtomicBool,
    brightness: AtomicU16,
}

impl ChannelShadow {
    const fn new() -> Self {
        Self {
            hpoint: AtomicU16::new(MAX_BRIGHTNESS),
            width: AtomicU16::new(0),
            enabled: AtomicBool::new(false),
            brightness: AtomicU16::new(0),
        }
    }

    fn store(&self, command: PhaseCommand, brightness: u16) {
        let (hpoint, width) = match command {
            PhaseCommand::Fire { hpoint, width } => (hpoint, width),
            PhaseCommand::Off => (MAX_BRIGHTNESS, 0),
        };
        self.hpoint.store(hpoint, Ordering::Relaxed);
        self.width.store(width, Ordering::Relaxed);
        self.enabled.store(command.is_enabled(), Ordering::Relaxed);
        self.brightness.store(brightness, Ordering::Release);
    }

    fn load(&self) -> ChannelState {
        let brightness = self.brightness.load(Ordering::Acquire);
        ChannelState {
            hpoint: self.hpoint.load(Ordering::Relaxed),
            width: self.width.load(Ordering::Relaxed),
            enabled: self.enabled.load(Ordering::Relaxed),
            brightness,
        }
    }
}

// End of the most recently queued fade per channel, packed as
// valid bit | brightness << 32 | end cycle.
const TAIL_VALID: u64 = 1 << 63;

const fn pack_tail(record: &FadeRecord) -> u64 {
    TAIL_VALID | ((record.end_brightness as u64) << 32) | record.end_cycle as u64
}

#[allow(clippy::cast_possible_truncation)]
const fn unpack_tail(tail: u64) -> Option<(u16, u32)> {
    if tail & TAIL_VALID == 0 {
        return None;
    }
    Some(((tail >> 32) as u16, tail as u32))
}

/// Multi-channel TRIAC fade engine state
///
/// Create it once, usually as a `static`, then call [`Dimmer::init`] to get
/// the zero-crossing handler and [`Dimmer::take_request_pipeline`] to get
/// the task that feeds the fade buffer.
pub struct Dimmer {
    config: Mutex<Cell<Option<DimmerConfig>>>,
    pub(crate) fades: FadeRing<FADE_CAPACITY>,
    pub(crate) half_cycles: AtomicU32,
    pub(crate) requests: RequestChannel,
    pub(crate) completions: CompletionChannel,
    pub(crate) counters: DropCounters,
    shadows: [ChannelShadow; MAX_CHANNELS as usize],
    tails: [AtomicU64; MAX_CHANNELS as usize],
    pipeline_taken: AtomicBool,
}

impl Dimmer {
    pub const fn new() -> Self {
        Self {
            config: Mutex::new(Cell::new(None)),
            fades: FadeRing::new(),
            half_cycles: AtomicU32::new(0),
            requests: Channel::new(),
            completions: Channel::new(),
            counters: DropCounters::new(),
            shadows: [const { ChannelShadow::new() }; MAX_CHANNELS as usize],
            tails: [const { AtomicU64::new(0) }; MAX_CHANNELS as usize],
            pipeline_taken: AtomicBool::new(false),
        }
    }

    /// Configure the channels and hand out the zero-crossing handler
    ///
    /// Every configured channel starts at brightness 0 with its output
    /// disabled. The caller installs the returned engine in the edge
    /// interrupt and enables that interrupt.
    pub fn init<T: PhaseTimer, I: ZeroCrossInput>(
        &self,
        config: DimmerConfig,
        mut timer: T,
        input: I,
    ) -> Result<ZeroCrossEngine<'_, T, I>, Error> {
        if !config.is_valid() {
            return Err(Error::InvalidConfig);
        }
        critical_section::with(|cs| {
            let cell = self.config.borrow(cs);
            if cell.get().is_some() {
                return Err(Error::AlreadyInitialized);
            }
            cell.set(Some(config));
            Ok(())
        })?;

        for channel in 0..config.num_channels {
            timer.disable_output(channel);
            self.publish(channel, PhaseCommand::Off, 0);
        }
        info!(
            target: "startup",
            "Configured {} channels at {} Hz mains, phase timer at {} Hz",
            config.num_channels,
            config.mains_hz,
            config.timer_frequency_hz()
        );

        Ok(ZeroCrossEngine::new(self, timer, input))
    }

    /// Disable every output and take the hardware back
    ///
    /// Fades left in the buffer resume after the next `init`.
    pub fn deinit<T: PhaseTimer, I: ZeroCrossInput>(&self, engine: ZeroCrossEngine<'_, T, I>) -> (T, I) {
        let (mut timer, input) = engine.release();
        let config = critical_section::with(|cs| self.config.borrow(cs).take());
        if let Some(config) = config {
            for channel in 0..config.num_channels {
                timer.disable_output(channel);
                self.publish(channel, PhaseCommand::Off, 0);
            }
        }
        // Finished tails would outlive the brightness reset above.
        let now = self.half_cycles();
        for tail in &self.tails {
            if unpack_tail(tail.load(Ordering::Acquire)).is_some_and(|(_, end)| end < now) {
                tail.store(0, Ordering::Release);
            }
        }
        info!(target: "startup", "Dimmer stopped at half-cycle {}", self.half_cycles());
        (timer, input)
    }

    /// Hand out the request pipeline, the only writer of the buffer's end cursor
    ///
    /// Returns `None` on every call after the first.
    pub fn take_request_pipeline(&self) -> Option<RequestPipeline<'_>> {
        if self.pipeline_taken.swap(true, Ordering::AcqRel) {
            return None;
        }
        Some(RequestPipeline::new(self))
    }

    /// Current configuration
    pub fn config(&self) -> Result<DimmerConfig, Error> {
        critical_section::with(|cs| self.config.borrow(cs).get()).ok_or(Error::NotInitialized)
    }

    /// Half-cycle counter: the next half-cycle the handler will process
    pub fn half_cycles(&self) -> u32 {
        self.half_cycles.load(Ordering::Acquire)
    }

    /// Number of records in the fade buffer
    pub fn active_fades(&self) -> usize {
        self.fades.len()
    }

    /// Read access to the fade buffer
    pub fn fades(&self) -> &FadeRing<FADE_CAPACITY> {
        &self.fades
    }

    /// Request a fade of `channel` to `target` over `duration`
    ///
    /// The fade starts where the channel's latest queued or running fade
    /// ends, or at the current brightness if nothing is in flight. A
    /// zero duration with the channel already at `target` is a no-op;
    /// otherwise it jumps to `target` on the next half-cycle.
    pub fn set_channel_fade(&self, channel: u8, duration: Duration, target: u16) -> Result<(), Error> {
        let config = self.config()?;
        if channel >= config.num_channels {
            return Err(Error::InvalidChannel);
        }
        let target = target.min(MAX_BRIGHTNESS);
        let now = self.half_cycles();
        let (start_brightness, start_cycle) = self.fade_origin(channel, now);

        let half_cycles = config.half_cycles(duration);
        if half_cycles == 0 && start_brightness == target {
            debug!(target: "fade", "Channel {} already at {}", channel, target);
            return Ok(());
        }

        let record = FadeRecord::for_channel(
            channel,
            start_brightness,
            target,
            start_cycle,
            start_cycle.saturating_add(half_cycles),
        );

        if self.requests.try_send(record).is_err() {
            self.counters.dropped_requests.fetch_add(1, Ordering::Relaxed);
            warn!(target: "fade", "At {}, dropped fade request for channel {}", now, channel);
            return Err(Error::RequestQueueFull);
        }
        self.tails[channel as usize].store(pack_tail(&record), Ordering::Release);

        debug!(
            target: "fade",
            "At {}, channel {} fades from time {}, brightness {} to time {}, brightness {}",
            now,
            channel,
            record.start_cycle,
            record.start_brightness,
            record.end_cycle,
            record.end_brightness
        );
        Ok(())
    }

    /// Switch a channel fully on or off at the next half-cycle
    pub fn set_channel_on(&self, channel: u8, on: bool) -> Result<(), Error> {
        let target = if on { MAX_BRIGHTNESS } else { 0 };
        self.set_channel_fade(channel, Duration::from_millis(0), target)
    }

    /// Fade a channel to a percentage (0-100) over the configured transition
    #[allow(clippy::cast_possible_truncation)]
    pub fn set_channel_brightness(&self, channel: u8, percent: u8) -> Result<(), Error> {
        let config = self.config()?;
        let percent = u32::from(percent.min(100));
        let target = (percent * u32::from(MAX_BRIGHTNESS) / 100) as u16;
        self.set_channel_fade(channel, config.transition, target)
    }

    /// Brightness last programmed into a channel
    pub fn current_brightness(&self, channel: u8) -> Result<u16, Error> {
        self.channel_state(channel).map(|state| state.brightness)
    }

    /// Shadow of the hardware state of a channel
    pub fn channel_state(&self, channel: u8) -> Result<ChannelState, Error> {
        let config = self.config()?;
        if channel >= config.num_channels {
            return Err(Error::InvalidChannel);
        }
        Ok(self.shadows[channel as usize].load())
    }

    /// Check if a fade for the channel is running or scheduled
    pub fn is_fading(&self, channel: u8) -> bool {
        let now = self.half_cycles();
        let queued = self
            .queued_tail(channel)
            .is_some_and(|(_, end_cycle)| end_cycle >= now);
        queued
            || self
                .fades
                .iter_active()
                .any(|fade| fade.applies_to(channel) && fade.end_cycle >= now)
    }

    fn queued_tail(&self, channel: u8) -> Option<(u16, u32)> {
        self.tails
            .get(channel as usize)
            .and_then(|tail| unpack_tail(tail.load(Ordering::Acquire)))
    }

    /// Where a new fade for `channel` has to start
    fn fade_origin(&self, channel: u8, now: u32) -> (u16, u32) {
        // A tail that already ended either finished at its brightness or is
        // still queued and will be rescheduled to `now` by the pipeline.
        let queued = self
            .queued_tail(channel)
            .map(|(brightness, end_cycle)| (brightness, end_cycle.max(now)));

        let buffered = self
            .fades
            .iter_active()
            .filter(|fade| fade.applies_to(channel) && fade.end_cycle >= now)
            .last()
            .map(|fade| (fade.end_brightness, fade.end_cycle));

        // The queued tail is always the newest request for the channel; it
        // only loses if it is older than what already sits in the buffer.
        match (queued, buffered) {
            (Some(queued), Some(buffered)) if buffered.1 > queued.1 => buffered,
            (Some(queued), _) => queued,
            (None, Some(buffered)) => buffered,
            (None, None) => (self.shadows[channel as usize].load().brightness, now),
        }
    }

    /// Forget the queued tail of a fade the pipeline could not buffer
    pub(crate) fn drop_tail(&self, record: &FadeRecord) {
        let packed = pack_tail(record);
        for channel in record.channel_iter() {
            let _ = self.tails[channel as usize].compare_exchange(
                packed,
                0,
                Ordering::AcqRel,
                Ordering::Relaxed,
            );
        }
    }

    /// Record what the handler programmed into a channel
    pub(crate) fn publish(&self, channel: u8, command: PhaseCommand, brightness: u16) {
        if let Some(shadow) = self.shadows.get(channel as usize) {
            shadow.store(command, brightness);
        }
    }
}

impl Default for Dimmer {
    fn default() -> Self {
        Self::new()
    }
}
