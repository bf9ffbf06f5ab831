use core::fmt;

/// Errors reported by the fade engine
///
/// None of these are fatal. The worst outcome of any of them is a stale or
/// delayed brightness value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The fade request queue is full; the request was dropped
    RequestQueueFull,
    /// The fade ring buffer is saturated; the fade was dropped
    BufferFull,
    /// Channel index outside the configured range
    InvalidChannel,
    /// The completion queue is full; only the notification was lost
    CompletionDropped,
    /// The dimmer has not been initialized yet
    NotInitialized,
    /// `init` was called twice without `deinit`
    AlreadyInitialized,
    /// Channel count or mains frequency out of range
    InvalidConfig,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            Self::RequestQueueFull => "fade request queue full",
            Self::BufferFull => "fade buffer full",
            Self::InvalidChannel => "invalid channel",
            Self::CompletionDropped => "completion queue full",
            Self::NotInitialized => "dimmer not initialized",
            Self::AlreadyInitialized => "dimmer already initialized",
            Self::InvalidConfig => "invalid dimmer configuration",
        };
        f.write_str(msg)
    }
}

impl core::error::Error for Error {}
