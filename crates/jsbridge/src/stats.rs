//! Process-wide handle lifecycle counters
//!
//! Every retain the bridge takes on a context, group, name array or
//! transient string is counted here, and so is every release. A balanced
//! program returns the live counts to where they started, which is what the
//! leak checks in the test suite assert.

use std::sync::atomic::{AtomicU64, Ordering};

/// Retain/release counters for engine handles owned by the bridge
#[derive(Debug, Default)]
pub struct HandleStats {
    contexts_retained: AtomicU64,
    contexts_released: AtomicU64,
    groups_retained: AtomicU64,
    groups_released: AtomicU64,
    name_arrays_retained: AtomicU64,
    name_arrays_released: AtomicU64,
    strings_created: AtomicU64,
    strings_released: AtomicU64,
}

static HANDLE_STATS: HandleStats = HandleStats::new();

/// Global handle statistics
pub fn handle_stats() -> &'static HandleStats {
    &HANDLE_STATS
}

impl HandleStats {
    pub const fn new() -> Self {
        Self {
            contexts_retained: AtomicU64::new(0),
            contexts_released: AtomicU64::new(0),
            groups_retained: AtomicU64::new(0),
            groups_released: AtomicU64::new(0),
            name_arrays_retained: AtomicU64::new(0),
            name_arrays_released: AtomicU64::new(0),
            strings_created: AtomicU64::new(0),
            strings_released: AtomicU64::new(0),
        }
    }

    pub(crate) fn record_context_retained(&self) {
        self.contexts_retained.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_context_released(&self) {
        self.contexts_released.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_group_retained(&self) {
        self.groups_retained.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_group_released(&self) {
        self.groups_released.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_name_array_retained(&self) {
        self.name_arrays_retained.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_name_array_released(&self) {
        self.name_arrays_released.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_string_created(&self) {
        self.strings_created.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_string_released(&self) {
        self.strings_released.fetch_add(1, Ordering::Relaxed);
    }

    /// Point-in-time copy of every counter
    pub fn snapshot(&self) -> HandleStatsSnapshot {
        HandleStatsSnapshot {
            contexts_retained: self.contexts_retained.load(Ordering::Relaxed),
            contexts_released: self.contexts_released.load(Ordering::Relaxed),
            groups_retained: self.groups_retained.load(Ordering::Relaxed),
            groups_released: self.groups_released.load(Ordering::Relaxed),
            name_arrays_retained: self.name_arrays_retained.load(Ordering::Relaxed),
            name_arrays_released: self.name_arrays_released.load(Ordering::Relaxed),
            strings_created: self.strings_created.load(Ordering::Relaxed),
            strings_released: self.strings_released.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of [`HandleStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HandleStatsSnapshot {
    pub contexts_retained: u64,
    pub contexts_released: u64,
    pub groups_retained: u64,
    pub groups_released: u64,
    pub name_arrays_retained: u64,
    pub name_arrays_released: u64,
    pub strings_created: u64,
    pub strings_released: u64,
}

impl HandleStatsSnapshot {
    pub fn live_contexts(&self) -> i64 {
        self.contexts_retained as i64 - self.contexts_released as i64
    }

    pub fn live_groups(&self) -> i64 {
        self.groups_retained as i64 - self.groups_released as i64
    }

    pub fn live_name_arrays(&self) -> i64 {
        self.name_arrays_retained as i64 - self.name_arrays_released as i64
    }

    pub fn live_strings(&self) -> i64 {
        self.strings_created as i64 - self.strings_released as i64
    }
}
