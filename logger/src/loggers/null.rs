use crate::{LogMessage, Logger};

/// Discards everything; used when logging is switched off
#[derive(Default)]
pub struct NullLogger {}

impl NullLogger {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Logger for NullLogger {
    fn log(&mut self, _message: &LogMessage) -> bool {
        true
    }
}
