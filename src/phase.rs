//! Brightness to TRIAC gate timing

use crate::config::{GATE_PULSE_WIDTH, MAX_BRIGHTNESS, QUIESCE_MARGIN};

/// What a channel does during the coming half-cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseCommand {
    /// Raise the gate at `hpoint` counts for `width` counts
    Fire { hpoint: u16, width: u16 },
    /// Keep the output disabled
    Off,
}

impl PhaseCommand {
    /// Gate timing for a brightness value
    ///
    /// Offset and brightness are inverse: a later trigger is a dimmer output.
    /// The offset never drops below `QUIESCE_MARGIN`. Offsets whose pulse would
    /// run into the counter maximum switch the output off instead.
    pub const fn for_brightness(brightness: u16) -> Self {
        let brightness = if brightness > MAX_BRIGHTNESS {
            MAX_BRIGHTNESS
        } else {
            brightness
        };
        let mut hpoint = MAX_BRIGHTNESS - brightness;
        if hpoint < QUIESCE_MARGIN {
            hpoint = QUIESCE_MARGIN;
        }
        if hpoint >= MAX_BRIGHTNESS - GATE_PULSE_WIDTH {
            return Self::Off;
        }
        Self::Fire {
            hpoint,
            width: GATE_PULSE_WIDTH,
        }
    }

    /// Trigger offset the command programs, or the counter maximum when off
    pub const fn hpoint(self) -> u16 {
        match self {
            Self::Fire { hpoint, .. } => hpoint,
            Self::Off => MAX_BRIGHTNESS,
        }
    }

    pub const fn is_enabled(self) -> bool {
        matches!(self, Self::Fire { .. })
    }
}
