//! Console-backed sink for the `log` facade.
//!
//! Until a sink is installed, log records are discarded; install one right
//! after the cold console init and every hart's records flow through the
//! shared console.

use core::fmt::{self, Write};

use conquer_once::spin::OnceCell;
use log::{LevelFilter, Log, Metadata, Record};
use spin::Mutex;

/// Byte sink the logger writes through.
pub trait ConsoleSink: Send + Sync {
    fn write_byte(&self, byte: u8);
}

struct ConsoleLogger {
    sink: OnceCell<&'static dyn ConsoleSink>,
    // Serializes whole records; byte interleaving across harts is
    // otherwise unspecified by the console contract.
    lock: Mutex<()>,
}

static LOGGER: ConsoleLogger = ConsoleLogger {
    sink: OnceCell::uninit(),
    lock: Mutex::new(()),
};

/// Routes the `log` macros to the platform console. Call once after the
/// cold console init; repeated calls are ignored.
pub fn init(sink: &'static dyn ConsoleSink) {
    let _ = LOGGER.sink.try_init_once(|| sink);
    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(LevelFilter::Info);
    }
}

impl Log for ConsoleLogger {
    fn enabled(&self, _: &Metadata<'_>) -> bool {
        self.sink.get().is_some()
    }

    fn log(&self, record: &Record<'_>) {
        let Some(sink) = self.sink.get() else {
            return;
        };
        let _guard = self.lock.lock();
        let mut writer = SinkWriter { sink: *sink };
        let _ = writeln!(writer, "[{:>5}] {}", record.level(), record.args());
    }

    fn flush(&self) {}
}

struct SinkWriter<'s> {
    sink: &'s dyn ConsoleSink,
}

impl fmt::Write for SinkWriter<'_> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        for byte in s.bytes() {
            if byte == b'\n' {
                self.sink.write_byte(b'\r');
            }
            self.sink.write_byte(byte);
        }
        Ok(())
    }
}
