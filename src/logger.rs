//! `log` backend printing over `esp-println`

use esp_println::println;
use log::{LevelFilter, Log, Metadata, Record, SetLoggerError};

struct EspLogger;

static LOGGER: EspLogger = EspLogger;

impl Log for EspLogger {
    fn enabled(&self, _: &Metadata) -> bool {
        // Filtered by `log` already
        true
    }

    fn log(&self, record: &Record) {
        println!("{} {}: {}", record.level(), record.target(), record.args());
    }

    fn flush(&self) {}
}

/// Install the logger with the given maximum level
pub fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
    log::set_logger(&LOGGER)?;
    log::set_max_level(level);
    Ok(())
}
