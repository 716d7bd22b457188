//! Admission control for operations.
//!
//! [`PermitPool`] caps the number of in-flight operations using a tokio semaphore. Acquiring a
//! permit races against the [`RunClock`], so a blocked acquire wakes up as soon as the run ends
//! instead of waiting for a permit that may never come. Each [`Permit`] is returned on drop and
//! notifies waiters, allowing [`PermitPool::wait_all`] to resolve once all permits are back.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use thiserror::Error;
use tokio::sync::{Notify, OwnedSemaphorePermit, Semaphore};

use crate::clock::RunClock;

/// Returned by [`PermitPool::acquire`] when the run ended before a permit was granted.
#[derive(Clone, Copy, Debug, Error, Eq, PartialEq)]
#[error("run ended before a permit became available")]
pub struct Cancelled;

/// A snapshot of the bookkeeping of a [`PermitPool`].
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct PoolStats {
    /// Total number of permits granted.
    pub acquired: u64,
    /// Total number of permits returned.
    pub released: u64,
    /// The highest number of permits that were outstanding at the same time.
    pub peak_in_flight: usize,
}

#[derive(Debug, Default)]
struct Counters {
    acquired: AtomicU64,
    released: AtomicU64,
    peak_in_flight: AtomicUsize,
}

/// A fixed-size pool of permits bounding the number of in-flight operations.
///
/// The pool is cheap to clone; clones share the same permits.
#[derive(Clone, Debug)]
pub struct PermitPool {
    semaphore: Arc<Semaphore>,
    capacity: usize,
    counters: Arc<Counters>,
    released: Arc<Notify>,
}

impl PermitPool {
    /// Creates a new pool with the given number of permits.
    pub fn new(capacity: std::num::NonZeroUsize) -> Self {
        let capacity = capacity.get();
        Self {
            semaphore: Arc::new(Semaphore::new(capacity)),
            capacity,
            counters: Arc::new(Counters::default()),
            released: Arc::new(Notify::new()),
        }
    }

    /// Waits for a permit, or until the clock fires.
    ///
    /// Returns [`Cancelled`] without granting a permit if the clock has fired, even when permits
    /// would be available. There is no fairness between concurrent waiters.
    pub async fn acquire(&self, clock: &RunClock) -> Result<Permit, Cancelled> {
        if clock.is_fired() {
            return Err(Cancelled);
        }

        let permit = tokio::select! {
            biased;
            _ = clock.fired() => return Err(Cancelled),
            permit = self.semaphore.clone().acquire_owned() => permit.map_err(|_| Cancelled)?,
        };

        self.counters.acquired.fetch_add(1, Ordering::Relaxed);
        self.counters
            .peak_in_flight
            .fetch_max(self.in_flight(), Ordering::Relaxed);

        Ok(Permit {
            permit: Some(permit),
            counters: Arc::clone(&self.counters),
            released: Arc::clone(&self.released),
        })
    }

    /// The total number of permits in this pool.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the number of permits currently held.
    pub fn in_flight(&self) -> usize {
        self.capacity - self.semaphore.available_permits()
    }

    /// Returns a snapshot of the pool's counters.
    pub fn stats(&self) -> PoolStats {
        PoolStats {
            acquired: self.counters.acquired.load(Ordering::Acquire),
            released: self.counters.released.load(Ordering::Acquire),
            peak_in_flight: self.counters.peak_in_flight.load(Ordering::Relaxed),
        }
    }

    /// Waits until all permits have been returned.
    pub async fn wait_all(&self) {
        loop {
            let notified = self.released.notified();
            if self.in_flight() == 0 {
                return;
            }
            notified.await;
        }
    }
}

/// RAII guard for an admitted operation.
///
/// Dropping this permit returns it to the [`PermitPool`] and notifies any task waiting in
/// [`PermitPool::wait_all`]. Returning a permit never blocks.
#[derive(Debug)]
pub struct Permit {
    permit: Option<OwnedSemaphorePermit>,
    counters: Arc<Counters>,
    released: Arc<Notify>,
}

impl Drop for Permit {
    fn drop(&mut self) {
        self.counters.released.fetch_add(1, Ordering::Release);
        drop(self.permit.take());
        self.released.notify_waiters();
    }
}
