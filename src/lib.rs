#![no_std]

pub mod completion;
pub mod config;
pub mod diagnostics;
pub mod dimmer;
pub mod error;
pub mod fade;
#[cfg(feature = "esp32-log")]
pub mod logger;
pub mod phase;
pub mod pipeline;
pub mod ring;
pub mod zero_cross;

pub use completion::{FadeObserver, Oscillator};
pub use config::{DimmerConfig, MAX_BRIGHTNESS};
pub use diagnostics::Diagnostics;
pub use dimmer::{ChannelState, Dimmer};
pub use error::Error;
pub use fade::FadeRecord;
pub use phase::PhaseCommand;
pub use pipeline::RequestPipeline;
pub use ring::FadeRing;
pub use zero_cross::{EdgeOutcome, ZeroCrossEngine};

pub use embassy_time::{Duration, Instant};

/// Abstract phase timer driver
///
/// Implement this trait on top of the PWM peripheral whose counter period
/// equals one mains half-cycle. The fade engine is generic over this trait
/// and only calls it from the zero-crossing handler.
pub trait PhaseTimer {
    /// Pulse the counter reset so the phase origin matches the zero crossing
    fn reset_counter(&mut self);

    /// Program the trigger offset and gate pulse width of a channel and enable its output
    ///
    /// Both values are in counter ticks. Drivers scale them to whatever
    /// register format the peripheral expects.
    fn fire_at(&mut self, channel: u8, hpoint: u16, width: u16);

    /// Disable a channel's output for the coming half-cycle
    fn disable_output(&mut self, channel: u8);
}

/// Zero-crossing detector input
pub trait ZeroCrossInput {
    /// Re-read the detector level; `true` while the edge is still asserted
    fn is_asserted(&mut self) -> bool;
}
