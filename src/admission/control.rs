//! In-flight request counter with a fixed ceiling.
//!
//! # Responsibilities
//! - Count requests currently being handled
//! - Reject requests that would push the count above the ceiling
//! - Release each admitted slot exactly once
//!
//! # Design Decisions
//! - Increment-then-check: the count may briefly exceed the ceiling by the
//!   number of requests racing the check, each of which is rejected and
//!   released right away
//! - Plain mutex around an integer; every access is read-modify-write

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::observability::metrics;

/// Admission controller shared by every request handler.
#[derive(Debug)]
pub struct AdmissionControl {
    in_flight: Mutex<usize>,
    max_in_flight: usize,
}

impl AdmissionControl {
    /// Create a controller admitting at most `max_in_flight` concurrent requests.
    pub fn new(max_in_flight: usize) -> Self {
        Self {
            in_flight: Mutex::new(0),
            max_in_flight,
        }
    }

    // The counter is a bare integer, so a panic while holding the lock
    // cannot leave it half-updated.
    fn lock(&self) -> MutexGuard<'_, usize> {
        self.in_flight.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Increment the counter and return the new value.
    fn increment_and_get(&self) -> usize {
        let mut count = self.lock();
        *count += 1;
        *count
    }

    /// Try to take a slot.
    ///
    /// Returns `false` if the post-increment count exceeds the ceiling; the
    /// increment is compensated before returning. A `true` result must be
    /// paired with exactly one [`release`](Self::release).
    pub fn try_acquire(&self) -> bool {
        let count = self.increment_and_get();
        if count > self.max_in_flight {
            tracing::debug!(
                in_flight = count,
                max_in_flight = self.max_in_flight,
                "Admission rejected"
            );
            self.release();
            return false;
        }
        metrics::set_in_flight(count);
        true
    }

    /// Give a slot back.
    pub fn release(&self) {
        let mut count = self.lock();
        *count = count.saturating_sub(1);
        metrics::set_in_flight(*count);
    }

    /// Take a slot that is released when the returned permit is dropped.
    pub fn admit(self: &Arc<Self>) -> Option<AdmissionPermit> {
        if self.try_acquire() {
            Some(AdmissionPermit {
                control: Arc::clone(self),
            })
        } else {
            None
        }
    }

    /// Current number of requests holding a slot (including any racing a rejection).
    pub fn in_flight(&self) -> usize {
        *self.lock()
    }

    /// Configured ceiling.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight
    }
}

/// Guard for an admitted request.
/// Releases its slot when dropped, on every exit path of the handler.
#[derive(Debug)]
pub struct AdmissionPermit {
    control: Arc<AdmissionControl>,
}

impl Drop for AdmissionPermit {
    fn drop(&mut self) {
        self.control.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn acquire_up_to_ceiling() {
        let control = AdmissionControl::new(2);
        assert!(control.try_acquire());
        assert!(control.try_acquire());
        assert!(!control.try_acquire());
        assert_eq!(control.in_flight(), 2);

        control.release();
        assert_eq!(control.in_flight(), 1);
        assert!(control.try_acquire());
    }

    #[test]
    fn rejection_leaves_count_unchanged() {
        let control = AdmissionControl::new(1);
        assert!(control.try_acquire());
        for _ in 0..10 {
            assert!(!control.try_acquire());
        }
        assert_eq!(control.in_flight(), 1);
    }

    #[test]
    fn permit_releases_on_drop() {
        let control = Arc::new(AdmissionControl::new(1));

        let permit = control.admit().expect("first request admitted");
        assert_eq!(control.in_flight(), 1);
        assert!(control.admit().is_none());

        drop(permit);
        assert_eq!(control.in_flight(), 0);
        assert!(control.admit().is_some());
        assert_eq!(control.in_flight(), 0);
    }

    #[test]
    fn release_never_underflows() {
        let control = AdmissionControl::new(1);
        control.release();
        assert_eq!(control.in_flight(), 0);
    }

    #[test]
    fn concurrent_acquire_never_overshoots() {
        let control = Arc::new(AdmissionControl::new(50));
        let handles: Vec<_> = (0..200)
            .map(|_| {
                let control = Arc::clone(&control);
                std::thread::spawn(move || control.admit())
            })
            .collect();

        let permits: Vec<_> = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .collect();

        let admitted = permits.iter().filter(|p| p.is_some()).count();
        assert_eq!(admitted, 50);
        assert_eq!(control.in_flight(), 50);

        drop(permits);
        assert_eq!(control.in_flight(), 0);
    }
}
