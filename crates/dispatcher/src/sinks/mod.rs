//! Sink implementations
//!
//! Contains FileSink, LogSink, and MemorySink.

mod file;
mod log;
mod memory;

pub use self::file::FileSink;
pub use self::log::LogSink;
pub use self::memory::MemorySink;
