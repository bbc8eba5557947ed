// Logging
//
// Diagnostics for the analyzer itself (not user-facing annotations).

mod console_logger;
mod logger;

pub use console_logger::ConsoleLogger;
pub use logger::{LogLevel, Logger, MemoryLogger, NullLogger};
