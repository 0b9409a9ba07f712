//! Job id allocation

use parking_lot::Mutex;

use super::types::JobId;

/// Single point of serialization for job ids.
///
/// `next` is the only way to obtain an id; each call returns a value strictly
/// greater than every previous one.
#[derive(Debug, Default)]
pub struct JobCounter {
    last_issued: Mutex<u64>,
}

impl JobCounter {
    /// Counter whose first id is 1
    pub fn new() -> Self {
        Self::default()
    }

    /// Counter that continues after an already issued id
    pub fn resume_after(last_issued: u64) -> Self {
        Self {
            last_issued: Mutex::new(last_issued),
        }
    }

    /// Allocate the next id, or `None` once the id space is used up
    pub fn next(&self) -> Option<JobId> {
        let mut last = self.last_issued.lock();
        *last = last.checked_add(1)?;
        Some(JobId::new(*last))
    }

    /// Most recently issued id (0 if none)
    pub fn last_issued(&self) -> u64 {
        *self.last_issued.lock()
    }
}
