#![doc = include_str!("../README.md")]

use std::{fmt::Debug, sync::Arc};

use arc_swap::ArcSwap;
use parking_lot::{RwLock, RwLockWriteGuard};
use tracing::{debug, trace};

mod clock;
mod error;
mod ring;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{Error, Result};

use ring::Ring;

pub const SECONDS_IN_MINUTE: u32 = 60;
pub const SECONDS_IN_HOUR: u32 = SECONDS_IN_MINUTE * 60;
pub const SECONDS_IN_24_HOURS: u32 = 24 * SECONDS_IN_HOUR;
pub const MILLIS_IN_SECOND: i64 = 1_000;
pub const MILLIS_IN_MINUTE: i64 = SECONDS_IN_MINUTE as i64 * MILLIS_IN_SECOND;
pub const MILLIS_IN_HOUR: i64 = SECONDS_IN_HOUR as i64 * MILLIS_IN_SECOND;
pub const MILLIS_IN_24_HOURS: i64 = SECONDS_IN_24_HOURS as i64 * MILLIS_IN_SECOND;

/// Number of per-second slots. One more than a day so that a full day of
/// history never shares a slot with the second being written.
pub const SLOTS: usize = SECONDS_IN_24_HOURS as usize + 1;

/// The trailing windows exposed by [`EventCounter::count`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Window {
    Minute,
    Hour,
    Day,
}

impl Window {
    pub const fn seconds(self) -> u32 {
        match self {
            Window::Minute => SECONDS_IN_MINUTE,
            Window::Hour => SECONDS_IN_HOUR,
            Window::Day => SECONDS_IN_24_HOURS,
        }
    }
}

/// A counter answering "how many events happened in the last minute, hour or day?".
///
/// Events are counted with a resolution of one second in a ring buffer of
/// [`SLOTS`] counters, so memory stays constant however long the counter
/// lives. Timestamps are milliseconds since the UNIX epoch.
///
/// ## Inserts
///
/// An insert credits the slot of its second with a single atomic increment
/// under a shared lock, so any number of threads can insert at once. When the
/// previous insert is more than one second old, the slots the idle period
/// skipped over may hold day-old data: the insert takes the lock exclusively
/// and zeroes them first. After more than a day of silence the whole ring is
/// replaced by a fresh one, with a new offset.
///
/// Inserts older than the last insert minus 24h are rejected.
///
/// ## Limitation
///
/// The counter assumes events never arrive more than about one second ahead
/// of the newest insert seen so far. An event for the next second racing
/// with the first insert of the current second may be lost. Beyond that
/// bound counts are approximate.
///
/// ## Counts
///
/// Counts sum the slots covering the requested window, up to the second of
/// the last insert. They never take the lock: the ring is published through
/// an [`ArcSwap`] and a count always reads one consistent ring.
///
/// ```text
///                   last insert       query
///                        |              |
///   ... | s-3 | s-2 | s-1 |  s  | s+1 | ... | q |
///         <----- summed ----->  <- not summed ->
/// ```
pub struct EventCounter<C = SystemClock> {
    ring: ArcSwap<Ring>,
    lock: RwLock<()>,
    clock: C,
}

impl<C: Clock> Debug for EventCounter<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventCounter")
            .field("ring", &**self.ring.load())
            .finish()
    }
}

impl EventCounter<SystemClock> {
    /// Create a counter driven by the wall clock.
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }
}

impl Default for EventCounter<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> EventCounter<C> {
    /// Create a counter driven by `clock`.
    ///
    /// The current time of `clock` becomes the offset and the initial last insert.
    pub fn with_clock(clock: C) -> Self {
        let now = clock.now_millis();
        Self {
            ring: ArcSwap::from_pointee(Ring::new(now)),
            lock: RwLock::new(()),
            clock,
        }
    }

    /// Register an event happening now.
    ///
    /// Always succeeds. If the clock went backwards, the event is counted at
    /// the time of the last insert.
    pub fn insert<T>(&self, event: T) -> T {
        // never behind the last insert, so never below the floor
        let _ = self.record(self.now());
        event
    }

    /// Register an event happening at `timestamp` (milliseconds).
    ///
    /// Fails without touching the counter when `timestamp` is older than the
    /// last insert minus 24h.
    pub fn insert_at<T>(&self, event: T, timestamp: i64) -> Result<T> {
        self.record(timestamp).map(|()| event)
    }

    pub fn count_in_last_minute(&self) -> u64 {
        self.count(Window::Minute)
    }

    pub fn count_in_last_hour(&self) -> u64 {
        self.count(Window::Hour)
    }

    pub fn count_in_last_day(&self) -> u64 {
        self.count(Window::Day)
    }

    /// Count the events in `window`, ending now.
    pub fn count(&self, window: Window) -> u64 {
        let ring = self.ring.load();
        // a concurrent insert may be slightly ahead of our clock read
        let now = self.clock.now_millis().max(ring.last_insert());
        count_in(&ring, window.seconds(), now)
    }

    /// Count the events in the `duration_seconds` before `timestamp`.
    ///
    /// Durations longer than a day are clamped to a day. Reading behind the
    /// last insert is not allowed: the slots may already have been reused.
    pub fn count_in_duration(&self, duration_seconds: u32, timestamp: i64) -> Result<u64> {
        let ring = self.ring.load();
        let last_insert = ring.last_insert();
        if timestamp < last_insert {
            trace!(timestamp, last_insert, "retroactive query rejected");
            return Err(Error::QueryBeforeLastInsert {
                timestamp,
                last_insert,
            });
        }
        Ok(count_in(&ring, duration_seconds, timestamp))
    }

    /// The reference time slot positions are computed from.
    pub fn offset_millis(&self) -> i64 {
        self.ring.load().offset()
    }

    /// Timestamp of the most recent accepted insert.
    pub fn last_insert_millis(&self) -> i64 {
        self.ring.load().last_insert()
    }

    fn now(&self) -> i64 {
        self.clock.now_millis().max(self.last_insert_millis())
    }

    fn record(&self, timestamp: i64) -> Result<()> {
        let mut guard = self.lock.read();
        self.check_floor(timestamp)?;

        if timestamp - self.last_insert_millis() > MILLIS_IN_SECOND {
            drop(guard);
            let exclusive = self.lock.write();
            self.reconcile(timestamp);
            guard = RwLockWriteGuard::downgrade(exclusive);
            // others may have moved the floor while we were unlocked
            self.check_floor(timestamp)?;
        }

        // the ring is only swapped under the exclusive lock
        let ring = self.ring.load();
        if !ring.record(ring.second(timestamp)) {
            trace!(timestamp, "event at the window floor dropped");
        }
        ring.advance_last_insert(timestamp);

        drop(guard);
        Ok(())
    }

    fn check_floor(&self, timestamp: i64) -> Result<()> {
        let floor = self.last_insert_millis().saturating_sub(MILLIS_IN_24_HOURS);
        if timestamp < floor {
            trace!(timestamp, floor, "insert before the window rejected");
            return Err(Error::InsertBeforeWindow { timestamp, floor });
        }
        Ok(())
    }

    /// Remove what the idle period since the last insert left behind.
    /// Requires the exclusive lock.
    fn reconcile(&self, timestamp: i64) {
        let ring = self.ring.load();
        let last_insert = ring.last_insert();
        let lag = timestamp - last_insert;

        if lag > MILLIS_IN_24_HOURS {
            debug!(lag, "idle for more than a day, starting a fresh ring");
            self.ring.store(Arc::new(Ring::new(timestamp)));
        } else if lag > MILLIS_IN_SECOND {
            // the current second is included: nobody cleared it ahead
            let cleared = ring.clear_seconds(ring.second(last_insert), ring.second(timestamp));
            debug!(lag, cleared, "cleared stale slots");
            ring.advance_last_insert(timestamp);
        }
    }
}

fn count_in(ring: &Ring, duration_seconds: u32, timestamp: i64) -> u64 {
    let duration = i64::from(duration_seconds.min(SECONDS_IN_24_HOURS));

    let start = ring.second(timestamp) + 1 - duration;
    let end = ring.second(ring.last_insert()) + 1;
    if start >= end {
        // the whole window lies after the last insert
        return 0;
    }

    ring.sum_seconds(start, end)
}
