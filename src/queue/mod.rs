use crate::record::AuditRecord;
use std::collections::VecDeque;
use std::sync::Mutex;

/// Shared FIFO buffer between the ingest handlers and the dispatcher.
///
/// The queue is unbounded: ingestion never blocks on capacity, and a slow or
/// broken downstream only makes it grow. Each operation takes the one lock
/// for its full duration, so a pop and an append can never interleave.
/// Delivery itself happens with the lock released; a failed record comes
/// back through [`AuditQueue::push_front`] so it stays ahead of anything
/// that arrived after it was popped.
pub struct AuditQueue {
    inner: Mutex<VecDeque<AuditRecord>>,
}

impl AuditQueue {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(VecDeque::new()),
        }
    }

    /// Append a batch at the tail, preserving the given order.
    pub fn append_all(&self, records: Vec<AuditRecord>) {
        let mut queue = self.inner.lock().unwrap();
        queue.extend(records);
    }

    /// Remove and return the oldest record, if any.
    pub fn pop_front(&self) -> Option<AuditRecord> {
        self.inner.lock().unwrap().pop_front()
    }

    /// Reinsert a record at the head after a failed delivery attempt.
    pub fn push_front(&self, record: AuditRecord) {
        self.inner.lock().unwrap().push_front(record);
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().unwrap().is_empty()
    }
}

impl Default for AuditQueue {
    fn default() -> Self {
        Self::new()
    }
}
