//! Fade completion delivery

use embassy_time::Duration;
use log::{debug, info, warn};

use crate::config::{MAX_BRIGHTNESS, TEST_FADE_DURATION};
use crate::dimmer::Dimmer;
use crate::fade::FadeRecord;

/// Receiver of finished fades
///
/// Called once per channel of every finished record, from the completion
/// task, never from interrupt context.
pub trait FadeObserver {
    /// A fade of `channel` finished at `fade.end_brightness`
    fn fade_finished(&mut self, dimmer: &Dimmer, channel: u8, fade: &FadeRecord);
}

/// Fades every finished channel back the other way, forever
///
/// Useful for soak-testing a dimmer board.
#[derive(Debug, Clone, Copy)]
pub struct Oscillator {
    duration: Duration,
}

impl Oscillator {
    pub const fn new(duration: Duration) -> Self {
        Self { duration }
    }
}

impl Default for Oscillator {
    fn default() -> Self {
        Self::new(TEST_FADE_DURATION)
    }
}

impl FadeObserver for Oscillator {
    fn fade_finished(&mut self, dimmer: &Dimmer, channel: u8, fade: &FadeRecord) {
        let target = if fade.is_rising() { 0 } else { MAX_BRIGHTNESS };
        match dimmer.set_channel_fade(channel, self.duration, target) {
            Ok(()) => debug!(target: "fade", "Reset fade for channel {} to {}", channel, target),
            Err(err) => warn!(target: "fade", "Could not reverse channel {}: {}", channel, err),
        }
    }
}

impl Dimmer {
    /// Deliver finished fades to `observer` forever
    pub async fn run_completions<O: FadeObserver>(&self, observer: &mut O) -> ! {
        info!(target: "startup", "Fade completion task started");
        loop {
            let fade = self.completions.receive().await;
            self.dispatch_completion(observer, &fade);
        }
    }

    /// Deliver all queued completions without waiting (non-blocking)
    ///
    /// Returns the number of finished records delivered.
    pub fn process_completions<O: FadeObserver>(&self, observer: &mut O) -> usize {
        let mut delivered = 0;
        while let Ok(fade) = self.completions.try_receive() {
            self.dispatch_completion(observer, &fade);
            delivered += 1;
        }
        delivered
    }

    fn dispatch_completion<O: FadeObserver>(&self, observer: &mut O, fade: &FadeRecord) {
        for channel in fade.channel_iter() {
            observer.fade_finished(self, channel, fade);
        }
    }
}
