use std::{ops::Deref, thread::JoinHandle};

use chrono::{DateTime, Local, TimeDelta};
use serde::{Deserialize, Serialize};
use severity::LogSeverity;

pub mod loggers;
pub mod queue;
pub mod severity;

pub use queue::{LogQueue, LogQueueError};

pub trait Logger {
    /// Returns false once the logger can no longer accept messages
    fn log(&mut self, message: &LogMessage) -> bool;
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct LogMessage {
    pub time: DateTime<Local>,
    pub severity: LogSeverity,
    pub content: String,
}

impl LogMessage {
    pub fn new(severity: LogSeverity, content: impl Into<String>) -> Self {
        LogMessage {
            time: Local::now(),
            severity,
            content: content.into(),
        }
    }
}

/// Owns the log thread. Messages queued through any [`LogWorker`] are written by a
/// single background thread; dropping the manager flushes whatever is still queued
/// before joining it.
pub struct LogManager {
    queue: LogQueue<LogMessage>,
    thread: Option<JoinHandle<()>>,
    default_worker: LogWorker,
}

impl Drop for LogManager {
    fn drop(&mut self) {
        self.queue.close();
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

impl LogManager {
    pub fn new<F>(mut logger: F) -> Self
    where
        F: Logger + Send + 'static,
    {
        let queue = LogQueue::new();
        let thread = Some({
            let queue = queue.clone();
            std::thread::spawn(move || {
                while let Ok(message) = queue.dequeue() {
                    if !logger.log(&message) {
                        queue.close();
                    }
                }
            })
        });
        let default_worker = LogWorker::new(queue.clone(), Local::now());
        Self {
            queue,
            thread,
            default_worker,
        }
    }

    pub fn get_log_worker(&self) -> LogWorker {
        self.default_worker.clone()
    }
}

impl Deref for LogManager {
    type Target = LogWorker;

    fn deref(&self) -> &Self::Target {
        &self.default_worker
    }
}

#[derive(Clone, Debug)]
pub struct LogWorker {
    queue: LogQueue<LogMessage>,
    manager_start_time: DateTime<Local>,
}

impl LogWorker {
    fn new(queue: LogQueue<LogMessage>, manager_start_time: DateTime<Local>) -> Self {
        Self {
            queue,
            manager_start_time,
        }
    }

    /// Queues a message; false if the log thread has shut down
    pub fn log(&self, message: LogMessage) -> bool {
        self.queue.enqueue(message).is_ok()
    }

    pub fn error(&self, content: impl Into<String>) -> bool {
        self.log(LogMessage::new(LogSeverity::Error, content))
    }

    pub fn warn(&self, content: impl Into<String>) -> bool {
        self.log(LogMessage::new(LogSeverity::Warning, content))
    }

    pub fn info(&self, content: impl Into<String>) -> bool {
        self.log(LogMessage::new(LogSeverity::Info, content))
    }

    pub fn debug(&self, content: impl Into<String>) -> bool {
        self.log(LogMessage::new(LogSeverity::Debug, content))
    }

    pub fn verbose(&self, content: impl Into<String>) -> bool {
        self.log(LogMessage::new(LogSeverity::Verbose, content))
    }

    pub fn time_since_start(&self) -> TimeDelta {
        Local::now().signed_duration_since(self.manager_start_time)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;

    #[derive(Clone, Default)]
    pub(crate) struct CollectingLogger {
        pub seen: Arc<Mutex<Vec<LogMessage>>>,
    }

    impl Logger for CollectingLogger {
        fn log(&mut self, message: &LogMessage) -> bool {
            self.seen.lock().unwrap().push(message.clone());
            true
        }
    }

    #[test]
    fn drop_flushes_pending_messages() {
        let collector = CollectingLogger::default();
        let manager = LogManager::new(collector.clone());
        let worker = manager.get_log_worker();
        assert!(worker.info("resolving symbols"));
        assert!(manager.debug("walking 3 chunks"));
        drop(manager);

        let seen = collector.seen.lock().unwrap();
        let contents: Vec<_> = seen.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["resolving symbols", "walking 3 chunks"]);
        assert_eq!(seen[1].severity, LogSeverity::Debug);
        // The thread is gone, so the queue refuses new work
        assert!(!worker.warn("after shutdown"));
    }

    #[test]
    fn workers_share_the_manager_clock() {
        let collector = CollectingLogger::default();
        let manager = LogManager::new(collector.clone());
        let worker = manager.get_log_worker();
        assert!(worker.time_since_start() >= TimeDelta::zero());
        let elapsed = worker.time_since_start().num_milliseconds();
        assert!(worker.verbose(format!("took {} ms", elapsed)));
        drop(manager);

        let seen = collector.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].severity, LogSeverity::Verbose);
        assert!(seen[0].content.starts_with("took "));
    }
}
