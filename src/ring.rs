use std::fmt::Debug;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

use crate::{MILLIS_IN_SECOND, SLOTS};

const SLOTS_I64: i64 = SLOTS as i64;

/// One generation of per-second counters.
///
/// A `Ring` is never reset in place: when the counter has been idle for more
/// than a day a fresh one replaces it. Everything a reader needs to interpret
/// the slots (the offset and the last insert) lives here, so a reader holding
/// one `Ring` always sees a consistent picture.
///
/// Timestamps are mapped to an absolute `second` relative to `offset`. The
/// slot of a second is `second mod SLOTS`:
///
/// ```text
///  second    ... -1 | 0 | 1 | ... | 86399 | 86400 | 86401 | ...
///  slot      86400  | 0 | 1 | ... | 86399 | 86400 |   0   | ...
/// ```
pub(crate) struct Ring {
    offset: i64,
    slots: Box<[AtomicU64]>,
    /// Highest second whose slot has been zeroed ahead of use.
    /// Data of second `s` is live only while `s > clear_mark - SLOTS`.
    clear_mark: AtomicI64,
    last_insert: AtomicI64,
}

impl Ring {
    pub(crate) fn new(offset: i64) -> Self {
        Self {
            offset,
            slots: (0..SLOTS).map(|_| AtomicU64::new(0)).collect(),
            // second 1 of a fresh ring is already zero
            clear_mark: AtomicI64::new(1),
            last_insert: AtomicI64::new(offset),
        }
    }

    #[inline]
    pub(crate) fn offset(&self) -> i64 {
        self.offset
    }

    #[inline]
    pub(crate) fn last_insert(&self) -> i64 {
        self.last_insert.load(Ordering::Acquire)
    }

    #[inline]
    pub(crate) fn advance_last_insert(&self, timestamp: i64) {
        self.last_insert.fetch_max(timestamp, Ordering::AcqRel);
    }

    /// Whole seconds elapsed from the offset to `timestamp`, rounded down.
    #[inline]
    pub(crate) fn second(&self, timestamp: i64) -> i64 {
        (timestamp - self.offset).div_euclid(MILLIS_IN_SECOND)
    }

    #[cfg(test)]
    pub(crate) fn pos(&self, timestamp: i64) -> usize {
        index(self.second(timestamp))
    }

    /// Credit one event to `second`.
    ///
    /// The first insert of a new second also zeroes the slot of the following
    /// second, so steady traffic never needs a sweep. This assumes nobody
    /// inserts more than about one second ahead of the newest insert: an
    /// insert into that next second racing with the clear can be lost.
    ///
    /// Returns `false` when the slot of `second` already belongs to a second
    /// one full ring later; the event is outside every window and is dropped.
    pub(crate) fn record(&self, second: i64) -> bool {
        let ahead = second + 1;
        let previous = self.clear_mark.fetch_max(ahead, Ordering::AcqRel);
        if previous < ahead {
            self.slot(ahead).store(0, Ordering::Relaxed);
        } else if previous >= second + SLOTS_I64 {
            return false;
        }

        self.slot(second).fetch_add(1, Ordering::Relaxed);
        true
    }

    /// Zero the slots of the seconds in `(after, through]`.
    ///
    /// At most `SLOTS` slots are touched. Returns how many were zeroed.
    pub(crate) fn clear_seconds(&self, after: i64, through: i64) -> usize {
        if through <= after {
            return 0;
        }

        let span = through - after;
        let cleared = if span >= SLOTS_I64 {
            for slot in self.slots.iter() {
                slot.store(0, Ordering::Relaxed);
            }
            SLOTS
        } else {
            for second in (after + 1)..=through {
                self.slot(second).store(0, Ordering::Relaxed);
            }
            span as usize
        };
        self.clear_mark.fetch_max(through, Ordering::AcqRel);

        cleared
    }

    /// Sum the slots of the seconds in `[start, end)`.
    pub(crate) fn sum_seconds(&self, start: i64, end: i64) -> u64 {
        (start..end)
            .map(|second| self.slot(second).load(Ordering::Relaxed))
            .sum()
    }

    /// Number of slots holding at least one event.
    pub(crate) fn populated(&self) -> usize {
        self.slots
            .iter()
            .filter(|slot| slot.load(Ordering::Relaxed) > 0)
            .count()
    }

    #[inline]
    fn slot(&self, second: i64) -> &AtomicU64 {
        &self.slots[index(second)]
    }
}

#[inline]
fn index(second: i64) -> usize {
    second.rem_euclid(SLOTS_I64) as usize
}

impl Debug for Ring {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ring")
            .field("offset", &self.offset)
            .field("last_insert", &self.last_insert())
            .field("clear_mark", &self.clear_mark.load(Ordering::Relaxed))
            .field("populated", &self.populated())
            .finish()
    }
}
