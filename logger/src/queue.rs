use std::{
    collections::VecDeque,
    sync::{Arc, Condvar, Mutex},
};

use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum LogQueueError {
    #[error("The log queue mutex was poisoned")]
    Poisoned,
    #[error("The log queue has been closed")]
    Closed,
}

#[derive(Debug)]
struct QueueState<T> {
    items: VecDeque<T>,
    closed: bool,
}

/// Multi-producer queue feeding the log thread.
///
/// Closing stops new messages from being accepted, but anything already queued is
/// still handed out by `dequeue` before it reports `Closed`.
#[derive(Debug)]
pub struct LogQueue<T> {
    inner: Arc<(Mutex<QueueState<T>>, Condvar)>,
}

impl<T> Clone for LogQueue<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T> Default for LogQueue<T> {
    fn default() -> Self {
        Self {
            inner: Arc::new((
                Mutex::new(QueueState {
                    items: VecDeque::new(),
                    closed: false,
                }),
                Condvar::new(),
            )),
        }
    }
}

impl<T> LogQueue<T> {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn enqueue(&self, item: T) -> Result<(), LogQueueError> {
        let (lock, condvar) = &*self.inner;
        let mut state = lock.lock().map_err(|_| LogQueueError::Poisoned)?;
        if state.closed {
            return Err(LogQueueError::Closed);
        }
        state.items.push_back(item);
        drop(state);
        condvar.notify_one();
        Ok(())
    }

    /// Blocks until a message is available or the queue is closed and drained
    pub fn dequeue(&self) -> Result<T, LogQueueError> {
        let (lock, condvar) = &*self.inner;
        let guard = lock.lock().map_err(|_| LogQueueError::Poisoned)?;
        let mut state = condvar
            .wait_while(guard, |s| s.items.is_empty() && !s.closed)
            .map_err(|_| LogQueueError::Poisoned)?;
        state.items.pop_front().ok_or(LogQueueError::Closed)
    }

    pub fn close(&self) {
        let (lock, condvar) = &*self.inner;
        let mut state = match lock.lock() {
            Ok(state) => state,
            Err(poisoned) => poisoned.into_inner(),
        };
        state.closed = true;
        drop(state);
        condvar.notify_all();
    }

    pub fn len(&self) -> usize {
        self.inner.0.lock().map(|s| s.items.len()).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
