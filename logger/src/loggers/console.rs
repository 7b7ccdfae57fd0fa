use std::io::Write;

use crate::{LogMessage, Logger};

/// Writes to stderr, leaving stdout to the command's own output
#[derive(Default)]
pub struct ConsoleLogger {}

impl Logger for ConsoleLogger {
    fn log(&mut self, message: &LogMessage) -> bool {
        let mut stderr = std::io::stderr().lock();
        writeln!(
            stderr,
            "({}) {} : {}",
            message.time.format("%H:%M:%S%.3f"),
            message.severity,
            message.content
        )
        .is_ok()
    }
}

impl ConsoleLogger {
    pub fn new() -> Self {
        Default::default()
    }
}
