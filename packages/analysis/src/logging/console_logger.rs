// Console Logger
//
// Logger that writes to the console. Info goes to stdout, the rest to stderr.

use super::logger::{LogLevel, Logger};

/// Console logger.
pub struct ConsoleLogger {
    level: LogLevel,
}

impl ConsoleLogger {
    pub fn new(level: LogLevel) -> Self {
        Self { level }
    }
}

impl Logger for ConsoleLogger {
    fn level(&self) -> LogLevel {
        self.level
    }

    fn log(&self, level: LogLevel, msg: &str) {
        if !self.is_enabled(level) {
            return;
        }
        match level {
            LogLevel::Info => println!("[{}] {}", level.label(), msg),
            _ => eprintln!("[{}] {}", level.label(), msg),
        }
    }
}
