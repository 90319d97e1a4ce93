//! Thread-safe status accumulator for parallel regions.
//!
//! Workers of a parallel region record failures into a shared
//! [`SafeStatus`] instead of returning early. After the region joins, the
//! caller detaches the accumulated [`Status`] and checks it sequentially.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

use crate::error::Error;
use crate::status::Status;

/// Mutex-protected [`Status`] with a lock-free ok check.
///
/// `is_ok()` reads an atomic flag so workers can skip remaining blocks
/// once any block has failed, without contending on the mutex. The flag
/// is only written while the mutex is held.
#[derive(Debug, Default)]
pub struct SafeStatus {
    failed: AtomicBool,
    status: Mutex<Status>,
}

impl SafeStatus {
    /// Create an ok accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one error.
    pub fn add(&self, error: impl Into<Error>) {
        let error = error.into();
        let mut guard = self.lock();
        guard.add(error);
        self.failed.store(true, Ordering::Release);
        drop(guard);
    }

    /// Merge a whole status. Ok statuses are ignored without locking.
    pub fn add_status(&self, status: Status) {
        if status.is_ok() {
            return;
        }
        let mut guard = self.lock();
        guard.merge(status);
        self.failed.store(true, Ordering::Release);
        drop(guard);
    }

    /// Merge the error side of a result, passing the value through.
    pub fn record<T>(&self, result: Result<T, Status>) -> Option<T> {
        match result {
            Ok(v) => Some(v),
            Err(status) => {
                self.add_status(status);
                None
            }
        }
    }

    /// Returns `true` if nothing has been recorded yet.
    pub fn is_ok(&self) -> bool {
        !self.failed.load(Ordering::Acquire)
    }

    /// Take the accumulated status, leaving this accumulator ok.
    pub fn detach(&self) -> Status {
        let mut guard = self.lock();
        self.failed.store(false, Ordering::Release);
        std::mem::take(&mut *guard)
    }

    /// Consume the accumulator into its status.
    pub fn into_status(self) -> Status {
        self.status
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Consume the accumulator into `Ok(())` or the accumulated errors.
    pub fn into_result(self) -> Result<(), Status> {
        self.into_status().into_result()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Status> {
        // A worker that panicked while holding the lock left a consistent
        // `Status` behind (push is the only mutation), so recover it.
        self.status.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
