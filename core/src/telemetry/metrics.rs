use serde::Serialize;
use std::sync::Mutex;

/// Running totals of what the cache did with the records it was given.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheCounters {
    pub inserted: u64,
    pub updated: u64,
    pub merged: u64,
    pub rejected: u64,
    pub evicted: u64,
    pub expired: u64,
    pub compacted: u64,
    pub removed: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheEvent {
    Inserted,
    Updated,
    Merged,
    Rejected,
    Evicted,
    Expired,
    Compacted,
    Removed,
}

pub struct MetricsRecorder {
    inner: Mutex<CacheCounters>,
}

impl MetricsRecorder {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(CacheCounters::default()),
        }
    }

    pub fn record(&self, event: CacheEvent) {
        self.record_many(event, 1);
    }

    pub fn record_many(&self, event: CacheEvent, count: u64) {
        if count == 0 {
            return;
        }
        if let Ok(mut counters) = self.inner.lock() {
            let slot = match event {
                CacheEvent::Inserted => &mut counters.inserted,
                CacheEvent::Updated => &mut counters.updated,
                CacheEvent::Merged => &mut counters.merged,
                CacheEvent::Rejected => &mut counters.rejected,
                CacheEvent::Evicted => &mut counters.evicted,
                CacheEvent::Expired => &mut counters.expired,
                CacheEvent::Compacted => &mut counters.compacted,
                CacheEvent::Removed => &mut counters.removed,
            };
            *slot += count;
        }
    }

    pub fn snapshot(&self) -> CacheCounters {
        if let Ok(counters) = self.inner.lock() {
            *counters
        } else {
            CacheCounters::default()
        }
    }
}

impl Default for MetricsRecorder {
    fn default() -> Self {
        Self::new()
    }
}
