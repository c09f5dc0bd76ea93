//! Context groups and their shared execution time limit
//!
//! Contexts in one group share a VM: one heap, one collector and one
//! watchdog. The time limit is therefore group configuration. Setting it
//! through any context or group handle affects every sibling context.

use jsbridge_sys::*;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::ffi::c_void;
use std::fmt;
use std::marker::PhantomData;
use std::panic::{self, AssertUnwindSafe};
use std::ptr;
use std::time::Duration;
use tracing::{debug, trace, warn};

use crate::error::JsError;
use crate::stats::handle_stats;

type Predicate = Box<dyn FnMut() -> bool + Send>;

/// Bridge-side configuration of one engine group
#[derive(Default)]
struct GroupState {
    /// Live `ContextGroup` and `Context` wrappers referring to the group
    holders: usize,
    limit: Option<Duration>,
    predicate: Option<Predicate>,
    /// Bumped on every install, so a predicate returned after running never
    /// overwrites one installed while it ran
    generation: u64,
}

/// Keyed by group handle address
static GROUPS: Mutex<BTreeMap<usize, GroupState>> = Mutex::new(BTreeMap::new());

fn key(raw: JSContextGroupRef) -> usize {
    raw as usize
}

/// Register one more bridge handle on a group
pub(crate) fn attach(raw: JSContextGroupRef) {
    GROUPS.lock().entry(key(raw)).or_default().holders += 1;
}

/// Drop one bridge handle; the last one discards the stored configuration
pub(crate) fn detach(raw: JSContextGroupRef) {
    let removed = {
        let mut groups = GROUPS.lock();
        match groups.get_mut(&key(raw)) {
            Some(state) if state.holders > 1 => {
                state.holders -= 1;
                None
            }
            Some(_) => groups.remove(&key(raw)),
            None => None,
        }
    };
    // predicate destructors run outside the lock
    drop(removed);
}

/// Watchdog callback installed for groups with a predicate
unsafe extern "C" fn should_terminate(_ctx: JSContextRef, data: *mut c_void) -> bool {
    let group = key(data);
    let taken = {
        let mut groups = GROUPS.lock();
        groups
            .get_mut(&group)
            .and_then(|state| state.predicate.take().map(|p| (p, state.generation)))
    };
    let Some((mut predicate, generation)) = taken else {
        // configuration already dropped: behave like a plain deadline
        return true;
    };

    // the predicate may install a new limit, so it runs without the lock held
    let terminate = match panic::catch_unwind(AssertUnwindSafe(&mut predicate)) {
        Ok(terminate) => terminate,
        Err(_) => {
            warn!("time limit predicate panicked, terminating");
            true
        }
    };

    let stale = {
        let mut groups = GROUPS.lock();
        match groups.get_mut(&group) {
            Some(state) if state.generation == generation => {
                state.predicate = Some(predicate);
                None
            }
            _ => Some(predicate),
        }
    };
    drop(stale);

    debug!(terminate, "execution time limit reached");
    terminate
}

/// A retained JSC context group
///
/// Cloning retains the group, dropping releases it.
///
/// # Thread Safety
///
/// This type is `!Send` and `!Sync` because a group's contexts must run on
/// one thread.
pub struct ContextGroup {
    raw: JSContextGroupRef,
    /// Marker to make this type !Send + !Sync
    _not_send: PhantomData<*mut ()>,
}

impl ContextGroup {
    /// Create a fresh group
    pub fn new() -> Result<Self, JsError> {
        // SAFETY: no preconditions
        let raw = unsafe { JSContextGroupCreate() };
        if raw.is_null() {
            return Err(JsError::ContextCreation {
                message: "JSContextGroupCreate returned null".into(),
            });
        }
        trace!(group = ?raw, "context group created");
        Ok(Self::adopt_retained(raw))
    }

    /// Take one extra retain on a group the engine handed out
    ///
    /// # Safety
    /// `raw` must be a live, non-null group.
    pub(crate) unsafe fn retain_raw(raw: JSContextGroupRef) -> Self {
        assert!(!raw.is_null(), "null context group");
        // SAFETY: raw is live per caller contract
        let raw = unsafe { JSContextGroupRetain(raw) };
        Self::adopt_retained(raw)
    }

    fn adopt_retained(raw: JSContextGroupRef) -> Self {
        attach(raw);
        handle_stats().record_group_retained();
        Self {
            raw,
            _not_send: PhantomData,
        }
    }

    /// Get the raw group reference
    pub fn raw(&self) -> JSContextGroupRef {
        self.raw
    }

    /// Terminate any script in the group that runs longer than `limit`
    ///
    /// Replaces a previously installed limit and predicate. The deadline is
    /// measured per entry into the VM, not per context.
    pub fn set_execution_time_limit(&self, limit: Duration) {
        self.install(limit, None);
    }

    /// Like [`set_execution_time_limit`](Self::set_execution_time_limit),
    /// but asks `predicate` whether to terminate each time the deadline passes
    ///
    /// Returning `false` lets the script run for another `limit`.
    pub fn set_execution_time_limit_with<F>(&self, limit: Duration, predicate: F)
    where
        F: FnMut() -> bool + Send + 'static,
    {
        self.install(limit, Some(Box::new(predicate)));
    }

    fn install(&self, limit: Duration, predicate: Option<Predicate>) {
        let with_predicate = predicate.is_some();
        let replaced = {
            let mut groups = GROUPS.lock();
            let state = groups.entry(key(self.raw)).or_default();
            state.limit = Some(limit);
            state.generation += 1;
            std::mem::replace(&mut state.predicate, predicate)
        };
        drop(replaced);

        let (callback, data): (JSShouldTerminateCallback, *mut c_void) = if with_predicate {
            (Some(should_terminate), self.raw)
        } else {
            (None, ptr::null_mut())
        };
        // SAFETY: self.raw is retained; data is only used as a registry key
        unsafe {
            JSContextGroupSetExecutionTimeLimit(self.raw, limit.as_secs_f64(), callback, data)
        };
        debug!(
            group = ?self.raw,
            limit_ms = limit.as_millis() as u64,
            with_predicate,
            "execution time limit set"
        );
    }

    /// Remove the time limit for every context in the group
    pub fn clear_execution_time_limit(&self) {
        // SAFETY: self.raw is retained
        unsafe { JSContextGroupClearExecutionTimeLimit(self.raw) };
        let replaced = {
            let mut groups = GROUPS.lock();
            groups.get_mut(&key(self.raw)).and_then(|state| {
                state.limit = None;
                state.generation += 1;
                state.predicate.take()
            })
        };
        drop(replaced);
        debug!(group = ?self.raw, "execution time limit cleared");
    }

    /// The limit installed through this bridge, if any
    pub fn time_limit(&self) -> Option<Duration> {
        GROUPS.lock().get(&key(self.raw)).and_then(|state| state.limit)
    }
}

impl Clone for ContextGroup {
    fn clone(&self) -> Self {
        // SAFETY: self.raw is retained for the lifetime of self
        unsafe { Self::retain_raw(self.raw) }
    }
}

impl Drop for ContextGroup {
    fn drop(&mut self) {
        detach(self.raw);
        // SAFETY: balanced with the create/retain taken by this wrapper
        unsafe { JSContextGroupRelease(self.raw) };
        handle_stats().record_group_released();
    }
}

impl PartialEq for ContextGroup {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl Eq for ContextGroup {}

impl fmt::Debug for ContextGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContextGroup")
            .field("raw", &self.raw)
            .field("time_limit", &self.time_limit())
            .finish()
    }
}
