//! WTFTimer exports required when statically linking bun-webkit.
//!
//! bun-webkit leaves its RunLoop timers to the embedder. The execution
//! time-limit watchdog and the garbage collector's activity callbacks are
//! scheduled through these functions, so without them a time limit never
//! fires. Timers are driven by one background thread.

#![allow(unsafe_op_in_unsafe_fn)]
#![allow(non_snake_case)]

use parking_lot::{Condvar, Mutex, ReentrantMutex};
use std::collections::BinaryHeap;
use std::cmp::Ordering as CmpOrdering;
use std::ffi::c_void;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use std::thread;
use std::time::{Duration, Instant};

type TimerCallback = unsafe extern "C" fn(*mut c_void);

struct TimerState {
    callback: TimerCallback,
    user_data: *mut c_void,
    active: AtomicBool,
    schedule: Mutex<Schedule>,
    /// Held while the callback runs; deinit takes it so user_data outlives any call.
    /// Reentrant because a callback may deinit its own timer.
    firing: ReentrantMutex<()>,
}

#[derive(Default)]
struct Schedule {
    fire_time: Option<Instant>,
    repeat: Option<Duration>,
    /// Bumped on every update so stale queue entries are skipped
    generation: u64,
}

// SAFETY: user_data belongs to WTF, which only hands out thread-safe timer targets
unsafe impl Send for TimerState {}
unsafe impl Sync for TimerState {}

/// Opaque timer handle handed to WTF
pub struct WTFTimer {
    state: Arc<TimerState>,
}

impl WTFTimer {
    fn update(&self, delay_seconds: f64, repeat: bool) {
        let delay = Duration::from_secs_f64(delay_seconds.max(0.0));
        let generation = {
            let mut schedule = self.state.schedule.lock();
            schedule.fire_time = Some(Instant::now() + delay);
            schedule.repeat = repeat.then_some(delay);
            schedule.generation += 1;
            schedule.generation
        };
        self.state.active.store(true, Ordering::SeqCst);
        queue().push(self.state.clone(), Instant::now() + delay, generation);
    }

    fn cancel(&self) {
        self.state.active.store(false, Ordering::SeqCst);
        let mut schedule = self.state.schedule.lock();
        schedule.fire_time = None;
        schedule.generation += 1;
    }

    fn seconds_until_fire(&self) -> f64 {
        match self.state.schedule.lock().fire_time {
            Some(at) => at.saturating_duration_since(Instant::now()).as_secs_f64(),
            None => f64::INFINITY,
        }
    }
}

struct Entry {
    at: Instant,
    generation: u64,
    state: Arc<TimerState>,
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.at == other.at
    }
}

impl Eq for Entry {}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<CmpOrdering> {
        Some(self.cmp(other))
    }
}

impl Ord for Entry {
    fn cmp(&self, other: &Self) -> CmpOrdering {
        // min-heap on fire time
        other.at.cmp(&self.at)
    }
}

struct TimerQueue {
    entries: Mutex<BinaryHeap<Entry>>,
    wake: Condvar,
}

impl TimerQueue {
    fn push(&self, state: Arc<TimerState>, at: Instant, generation: u64) {
        self.entries.lock().push(Entry {
            at,
            generation,
            state,
        });
        self.wake.notify_one();
    }

    fn run(&self) {
        let mut entries = self.entries.lock();
        loop {
            let Some(next_at) = entries.peek().map(|e| e.at) else {
                self.wake.wait(&mut entries);
                continue;
            };

            let now = Instant::now();
            if next_at > now {
                self.wake.wait_for(&mut entries, next_at - now);
                continue;
            }

            if let Some(entry) = entries.pop() {
                // Callbacks may re-enter update(), which pushes onto the queue
                drop(entries);
                fire(entry);
                entries = self.entries.lock();
            }
        }
    }
}

fn queue() -> &'static TimerQueue {
    static QUEUE: OnceLock<TimerQueue> = OnceLock::new();
    static STARTED: OnceLock<()> = OnceLock::new();

    let q = QUEUE.get_or_init(|| TimerQueue {
        entries: Mutex::new(BinaryHeap::new()),
        wake: Condvar::new(),
    });
    STARTED.get_or_init(|| {
        thread::Builder::new()
            .name("wtf-timer".into())
            .spawn(move || q.run())
            .expect("failed to spawn wtf-timer thread");
    });
    q
}

fn fire(entry: Entry) {
    let state = entry.state;
    {
        let _firing = state.firing.lock();
        if !state.active.load(Ordering::SeqCst)
            || state.schedule.lock().generation != entry.generation
        {
            return;
        }
        // SAFETY: callback and user_data were supplied together by WTF, and
        // deinit cannot complete while the firing lock is held
        unsafe { (state.callback)(state.user_data) };
    }

    let rearm = {
        let mut schedule = state.schedule.lock();
        match schedule.repeat {
            Some(interval) if schedule.generation == entry.generation => {
                let at = Instant::now() + interval;
                schedule.fire_time = Some(at);
                Some((at, schedule.generation))
            }
            Some(_) => None,
            None => {
                if schedule.generation == entry.generation {
                    schedule.fire_time = None;
                    state.active.store(false, Ordering::SeqCst);
                }
                None
            }
        }
    };

    if let Some((at, generation)) = rearm {
        queue().push(state, at, generation);
    }
}

/// # Safety
/// `user_data` must stay valid until `WTFTimer__deinit`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn WTFTimer__create(
    callback: TimerCallback,
    user_data: *mut c_void,
) -> *mut WTFTimer {
    Box::into_raw(Box::new(WTFTimer {
        state: Arc::new(TimerState {
            callback,
            user_data,
            active: AtomicBool::new(false),
            schedule: Mutex::new(Schedule::default()),
            firing: ReentrantMutex::new(()),
        }),
    }))
}

/// # Safety
/// `timer` must come from `WTFTimer__create`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn WTFTimer__update(timer: *mut WTFTimer, delay_seconds: f64, repeat: bool) {
    if let Some(timer) = timer.as_ref() {
        timer.update(delay_seconds, repeat);
    }
}

/// # Safety
/// `timer` must come from `WTFTimer__create`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn WTFTimer__cancel(timer: *mut WTFTimer) {
    if let Some(timer) = timer.as_ref() {
        timer.cancel();
    }
}

/// # Safety
/// `timer` must come from `WTFTimer__create`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn WTFTimer__isActive(timer: *mut WTFTimer) -> bool {
    timer
        .as_ref()
        .is_some_and(|t| t.state.active.load(Ordering::SeqCst))
}

/// # Safety
/// `timer` must come from `WTFTimer__create`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn WTFTimer__secondsUntilTimer(timer: *mut WTFTimer) -> f64 {
    timer
        .as_ref()
        .map_or(f64::INFINITY, WTFTimer::seconds_until_fire)
}

/// # Safety
/// `timer` must come from `WTFTimer__create` and is invalid afterwards.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn WTFTimer__deinit(timer: *mut WTFTimer) {
    if timer.is_null() {
        return;
    }
    let timer = Box::from_raw(timer);
    timer.cancel();
    // wait out a callback already in flight on the timer thread
    drop(timer.state.firing.lock());
}

/// Timers are run by the background thread, nothing is ever imminent here.
#[unsafe(no_mangle)]
pub extern "C" fn WTFTimer__runIfImminent() {}
