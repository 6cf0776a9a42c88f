//! Bounded store of recent log messages for the log viewer.
//!
//! The buffer is shared by the logger (any thread) and the interactive loop,
//! so it is the one piece of console state guarded by its own lock.

use parking_lot::Mutex;
use std::{collections::VecDeque, sync::Arc};

/// Number of messages kept before the oldest are evicted.
pub const LOG_BUFFER_CAPACITY: usize = 100;

#[derive(Debug, Clone)]
pub struct LogBuffer {
    entries: Arc<Mutex<VecDeque<String>>>,
    max_entries: usize,
}

impl LogBuffer {
    /// Create a new log buffer with a maximum number of entries
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: Arc::new(Mutex::new(VecDeque::with_capacity(max_entries + 1))),
            max_entries,
        }
    }

    /// Add a message, evicting from the front until the cap holds again.
    pub fn append(&self, message: impl Into<String>) {
        let mut entries = self.entries.lock();
        entries.push_back(message.into());
        while entries.len() > self.max_entries {
            entries.pop_front();
        }
    }

    /// Copy of the buffered messages, newest first.
    pub fn snapshot(&self) -> Vec<String> {
        self.entries.lock().iter().rev().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}

impl Default for LogBuffer {
    fn default() -> Self {
        Self::new(LOG_BUFFER_CAPACITY)
    }
}
