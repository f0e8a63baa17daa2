//! Bounded permit pool capping in-flight requests per client.
//!
//! # Design
//! Calls are blocking, so the pool is a counting semaphore over
//! `Mutex<usize>` + `Condvar` rather than an async semaphore. A `Permit` is
//! an RAII guard: the slot is returned when it drops, on every exit path
//! including unwinding.

use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};

use crate::cancel::{CancellationToken, POLL_INTERVAL};
use crate::error::ApiError;

#[derive(Debug)]
struct State {
    available: Mutex<usize>,
    released: Condvar,
    capacity: usize,
}

/// Counting semaphore shared by every call of one client.
#[derive(Debug, Clone)]
pub struct ConcurrencyLimiter {
    state: Arc<State>,
}

impl ConcurrencyLimiter {
    /// A limiter with `capacity` slots. A capacity of 0 is raised to 1 so
    /// that calls can make progress.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            state: Arc::new(State {
                available: Mutex::new(capacity),
                released: Condvar::new(),
                capacity,
            }),
        }
    }

    pub fn capacity(&self) -> usize {
        self.state.capacity
    }

    pub fn available_permits(&self) -> usize {
        *self.lock()
    }

    /// Block until a slot frees up or `cancel` fires.
    pub fn acquire(&self, cancel: &CancellationToken) -> Result<Permit, ApiError> {
        let mut available = self.lock();
        loop {
            cancel.check()?;
            if *available > 0 {
                *available -= 1;
                return Ok(Permit {
                    limiter: self.clone(),
                });
            }
            available = self
                .state
                .released
                .wait_timeout(available, POLL_INTERVAL)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
    }

    /// Take a slot without waiting.
    pub fn try_acquire(&self) -> Option<Permit> {
        let mut available = self.lock();
        if *available == 0 {
            return None;
        }
        *available -= 1;
        Some(Permit {
            limiter: self.clone(),
        })
    }

    fn release(&self) {
        let mut available = self.lock();
        *available += 1;
        drop(available);
        self.state.released.notify_one();
    }

    // The counter is always left consistent, so a poisoned lock is still usable.
    fn lock(&self) -> MutexGuard<'_, usize> {
        self.state
            .available
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

/// A held slot; dropping it returns the slot to the limiter.
#[derive(Debug)]
pub struct Permit {
    limiter: ConcurrencyLimiter,
}

impl Drop for Permit {
    fn drop(&mut self) {
        self.limiter.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::{Duration, Instant};

    #[test]
    fn permits_are_returned_on_drop() {
        let limiter = ConcurrencyLimiter::new(2);
        let cancel = CancellationToken::new();
        let a = limiter.acquire(&cancel).unwrap();
        let _b = limiter.acquire(&cancel).unwrap();
        assert_eq!(limiter.available_permits(), 0);
        assert!(limiter.try_acquire().is_none());
        drop(a);
        assert_eq!(limiter.available_permits(), 1);
        assert!(limiter.try_acquire().is_some());
    }

    #[test]
    fn zero_capacity_is_raised_to_one() {
        let limiter = ConcurrencyLimiter::new(0);
        assert_eq!(limiter.capacity(), 1);
        assert!(limiter.try_acquire().is_some());
    }

    #[test]
    fn blocked_acquire_wakes_on_release() {
        let limiter = ConcurrencyLimiter::new(1);
        let held = limiter.try_acquire().unwrap();

        let waiter = {
            let limiter = limiter.clone();
            thread::spawn(move || limiter.acquire(&CancellationToken::new()).is_ok())
        };
        thread::sleep(Duration::from_millis(50));
        drop(held);
        assert!(waiter.join().unwrap());
        assert_eq!(limiter.available_permits(), 1);
    }

    #[test]
    fn blocked_acquire_honors_cancellation() {
        let limiter = ConcurrencyLimiter::new(1);
        let _held = limiter.try_acquire().unwrap();
        let cancel = CancellationToken::new();

        let waiter = {
            let limiter = limiter.clone();
            let cancel = cancel.clone();
            thread::spawn(move || {
                let started = Instant::now();
                let result = limiter.acquire(&cancel);
                (matches!(result, Err(ApiError::Cancelled)), started.elapsed())
            })
        };
        thread::sleep(Duration::from_millis(50));
        cancel.cancel();
        let (cancelled, elapsed) = waiter.join().unwrap();
        assert!(cancelled);
        assert!(elapsed < Duration::from_secs(2));
        assert_eq!(limiter.available_permits(), 0);
    }
}
