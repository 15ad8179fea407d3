//! Output rendering (progress events, JSON reports)

pub mod report;
pub mod reporter;

pub use report::write_report;
pub use reporter::{ConsoleReporter, Event, MemoryReporter, Reporter, SilentReporter};
