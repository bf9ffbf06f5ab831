//! Fade records and their linear interpolation

use crate::config::{MAX_BRIGHTNESS, MAX_CHANNELS};

/// One scheduled brightness transition
///
/// Timestamps are half-cycle counter values. The record is in effect for
/// every half-cycle in `start_cycle..=end_cycle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FadeRecord {
    /// Bitmask of channels the record drives
    pub channels: u16,
    /// Brightness at `start_cycle` (0..=`MAX_BRIGHTNESS`)
    pub start_brightness: u16,
    /// Brightness at `end_cycle` (0..=`MAX_BRIGHTNESS`)
    pub end_brightness: u16,
    /// Half-cycle at which the fade starts
    pub start_cycle: u32,
    /// Half-cycle at which the fade completes
    pub end_cycle: u32,
}

impl FadeRecord {
    /// Create a fade for a single channel
    ///
    /// `end_cycle` is clamped so it is never before `start_cycle`.
    pub const fn for_channel(
        channel: u8,
        start_brightness: u16,
        end_brightness: u16,
        start_cycle: u32,
        end_cycle: u32,
    ) -> Self {
        Self {
            channels: 1 << channel,
            start_brightness,
            end_brightness,
            start_cycle,
            end_cycle: if end_cycle < start_cycle {
                start_cycle
            } else {
                end_cycle
            },
        }
    }

    /// Check if the record drives a channel
    pub const fn applies_to(&self, channel: u8) -> bool {
        channel < 16 && self.channels & (1 << channel) != 0
    }

    /// Fade length in half-cycles
    pub const fn duration(&self) -> u32 {
        self.end_cycle.saturating_sub(self.start_cycle)
    }

    /// Same fade, moved to start at `cycle` with its length kept
    #[must_use]
    pub const fn rescheduled_at(&self, cycle: u32) -> Self {
        Self {
            start_cycle: cycle,
            end_cycle: cycle.saturating_add(self.duration()),
            ..*self
        }
    }

    /// Check if the fade is in effect at a half-cycle
    pub const fn contains(&self, cycle: u32) -> bool {
        self.start_cycle <= cycle && cycle <= self.end_cycle
    }

    /// Check if the fade raises brightness
    pub const fn is_rising(&self) -> bool {
        self.end_brightness > self.start_brightness
    }

    /// Interpolated brightness at a half-cycle
    ///
    /// Returns `None` outside `start_cycle..=end_cycle`. A zero-length fade
    /// is fully at `end_brightness`.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub const fn brightness_at(&self, cycle: u32) -> Option<u16> {
        if !self.contains(cycle) {
            return None;
        }
        let span = self.end_cycle - self.start_cycle;
        if span == 0 {
            return Some(clamp_brightness(self.end_brightness as i64));
        }
        let remaining = (self.end_cycle - cycle) as i64;
        let delta = self.end_brightness as i64 - self.start_brightness as i64;
        // Truncation toward zero keeps the value between the two endpoints.
        let value = self.end_brightness as i64 - delta * remaining / span as i64;
        Some(clamp_brightness(value))
    }

    /// Channels driven by this record, in ascending order
    pub fn channel_iter(&self) -> impl Iterator<Item = u8> + '_ {
        (0..MAX_CHANNELS).filter(|&channel| self.applies_to(channel))
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
const fn clamp_brightness(value: i64) -> u16 {
    if value < 0 {
        0
    } else if value > MAX_BRIGHTNESS as i64 {
        MAX_BRIGHTNESS
    } else {
        value as u16
    }
}
