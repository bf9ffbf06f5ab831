#![allow(dead_code)]

use std::collections::VecDeque;

use triac_fader::{
    Dimmer, DimmerConfig, FadeObserver, FadeRecord, PhaseTimer, ZeroCrossEngine, ZeroCrossInput,
};

pub const CHANNELS: usize = 8;

/// Phase timer that remembers what was programmed
#[derive(Debug, Default)]
pub struct RecordingTimer {
    pub resets: u32,
    pub hpoint: [Option<u16>; CHANNELS],
    pub width: [Option<u16>; CHANNELS],
    pub enabled: [bool; CHANNELS],
    pub writes: u32,
}

impl PhaseTimer for RecordingTimer {
    fn reset_counter(&mut self) {
        self.resets += 1;
    }

    fn fire_at(&mut self, channel: u8, hpoint: u16, width: u16) {
        let channel = channel as usize;
        self.hpoint[channel] = Some(hpoint);
        self.width[channel] = Some(width);
        self.enabled[channel] = true;
        self.writes += 1;
    }

    fn disable_output(&mut self, channel: u8) {
        self.enabled[channel as usize] = false;
        self.writes += 1;
    }
}

/// Detector input replaying a script of levels, then staying asserted
#[derive(Debug, Default)]
pub struct ScriptedInput {
    levels: VecDeque<bool>,
}

impl ScriptedInput {
    pub fn new<const N: usize>(levels: [bool; N]) -> Self {
        Self {
            levels: levels.into_iter().collect(),
        }
    }
}

impl ZeroCrossInput for ScriptedInput {
    fn is_asserted(&mut self) -> bool {
        self.levels.pop_front().unwrap_or(true)
    }
}

/// Observer collecting `(channel, final brightness)` pairs
#[derive(Debug, Default)]
pub struct CollectingObserver {
    pub finished: Vec<(u8, u16)>,
}

impl FadeObserver for CollectingObserver {
    fn fade_finished(&mut self, _dimmer: &Dimmer, channel: u8, fade: &FadeRecord) {
        self.finished.push((channel, fade.end_brightness));
    }
}

pub type Engine = ZeroCrossEngine<'static, RecordingTimer, ScriptedInput>;

pub fn leak_dimmer() -> &'static Dimmer {
    Box::leak(Box::new(Dimmer::new()))
}

/// Initialized dimmer at 50 Hz mains: 100 half-cycles per second
pub fn start(num_channels: u8) -> (&'static Dimmer, Engine) {
    let dimmer = leak_dimmer();
    let config = DimmerConfig::new(num_channels, 50).unwrap();
    let engine = dimmer
        .init(config, RecordingTimer::default(), ScriptedInput::default())
        .unwrap();
    (dimmer, engine)
}

/// Process edges until the counter reaches `cycle`
pub fn run_until(engine: &mut Engine, dimmer: &Dimmer, cycle: u32) {
    while dimmer.half_cycles() < cycle {
        engine.on_edge();
    }
}
