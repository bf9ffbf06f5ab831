//! Dimmer configuration and hardware constants

use embassy_time::Duration;

use crate::error::Error;

/// Phase timer resolution in bits
pub const DUTY_BIT_DEPTH: u32 = 10;

/// Largest brightness value; also the last phase timer count of a half-cycle
pub const MAX_BRIGHTNESS: u16 = (1 << DUTY_BIT_DEPTH) - 1;

/// Gate is held high for this many timer counts to latch the TRIAC.
pub const GATE_PULSE_WIDTH: u16 = 10;

/// Gate always fires at least this many timer counts away from the zero crossing.
pub const QUIESCE_MARGIN: u16 = 50;

/// Number of output channels the channel bitmask can address
pub const MAX_CHANNELS: u8 = 8;

/// Fade ring buffer capacity. Must be a power of two.
pub const FADE_CAPACITY: usize = 32;

/// Depth of the fade request queue
pub const REQUEST_QUEUE_DEPTH: usize = 16;

/// Depth of the fade completion queue
pub const COMPLETION_QUEUE_DEPTH: usize = 16;

/// Busy-wait iterations before the zero-crossing level is re-read
pub const DEBOUNCE_SPINS: u32 = 100;

/// Nominal mains frequency of the reference board
pub const DEFAULT_MAINS_HZ: u16 = 60;

const MIN_MAINS_HZ: u16 = 40;
const MAX_MAINS_HZ: u16 = 70;

/// Default transition for percent brightness writes
pub const DEFAULT_TRANSITION: Duration = Duration::from_millis(500);

/// Interval of the diagnostics report
pub const DEFAULT_REPORT_INTERVAL: Duration = Duration::from_secs(10);

/// Fade duration used by the oscillating test observer
pub const TEST_FADE_DURATION: Duration = Duration::from_millis(5000);

/// Runtime configuration of the dimmer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DimmerConfig {
    /// Number of wired output channels
    pub num_channels: u8,
    /// Mains frequency in Hz
    pub mains_hz: u16,
    /// Fade duration applied to percent brightness writes
    pub transition: Duration,
}

impl DimmerConfig {
    /// Create a validated configuration
    pub const fn new(num_channels: u8, mains_hz: u16) -> Result<Self, Error> {
        let config = Self {
            num_channels,
            mains_hz,
            transition: DEFAULT_TRANSITION,
        };
        if config.is_valid() {
            Ok(config)
        } else {
            Err(Error::InvalidConfig)
        }
    }

    /// Check channel count and mains frequency ranges
    pub const fn is_valid(&self) -> bool {
        self.num_channels > 0
            && self.num_channels <= MAX_CHANNELS
            && self.mains_hz >= MIN_MAINS_HZ
            && self.mains_hz <= MAX_MAINS_HZ
    }

    /// Override the transition used for percent brightness writes
    #[must_use]
    pub const fn with_transition(mut self, transition: Duration) -> Self {
        self.transition = transition;
        self
    }

    /// Convert a duration to whole mains half-cycles, rounding down
    #[allow(clippy::cast_possible_truncation)]
    pub const fn half_cycles(&self, duration: Duration) -> u32 {
        let half_cycles = duration.as_millis() * self.mains_hz as u64 * 2 / 1000;
        if half_cycles > u32::MAX as u64 {
            u32::MAX
        } else {
            half_cycles as u32
        }
    }

    /// Phase timer frequency: one counter period per mains half-cycle
    pub const fn timer_frequency_hz(&self) -> u32 {
        self.mains_hz as u32 * 2
    }
}
