// Logger Interface
//
// Logger trait definition and the in-process loggers.

use std::sync::Mutex;

/// Log level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Debug = 0,
    Info = 1,
    Warn = 2,
    Error = 3,
}

impl LogLevel {
    pub fn label(&self) -> &'static str {
        match self {
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
        }
    }
}

/// Logger trait.
pub trait Logger: Send + Sync {
    fn level(&self) -> LogLevel;
    fn log(&self, level: LogLevel, msg: &str);

    fn debug(&self, msg: &str) {
        self.log(LogLevel::Debug, msg);
    }
    fn info(&self, msg: &str) {
        self.log(LogLevel::Info, msg);
    }
    fn warn(&self, msg: &str) {
        self.log(LogLevel::Warn, msg);
    }
    fn error(&self, msg: &str) {
        self.log(LogLevel::Error, msg);
    }
    fn is_enabled(&self, level: LogLevel) -> bool {
        level >= self.level()
    }
}

/// Null logger (logs nothing).
pub struct NullLogger;

impl NullLogger {
    pub fn new() -> Self {
        Self
    }
}

impl Default for NullLogger {
    fn default() -> Self {
        Self::new()
    }
}

impl Logger for NullLogger {
    fn level(&self) -> LogLevel {
        LogLevel::Error
    }
    fn log(&self, _level: LogLevel, _msg: &str) {}
}

/// Logger that keeps every enabled line in memory, formatted as `[LEVEL] msg`.
pub struct MemoryLogger {
    level: LogLevel,
    lines: Mutex<Vec<String>>,
}

impl MemoryLogger {
    pub fn new(level: LogLevel) -> Self {
        Self {
            level,
            lines: Mutex::new(Vec::new()),
        }
    }

    pub fn lines(&self) -> Vec<String> {
        match self.lines.lock() {
            Ok(lines) => lines.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.lines().iter().any(|line| line.contains(needle))
    }
}

impl Logger for MemoryLogger {
    fn level(&self) -> LogLevel {
        self.level
    }

    fn log(&self, level: LogLevel, msg: &str) {
        if !self.is_enabled(level) {
            return;
        }
        let line = format!("[{}] {}", level.label(), msg);
        match self.lines.lock() {
            Ok(mut lines) => lines.push(line),
            Err(poisoned) => poisoned.into_inner().push(line),
        }
    }
}
