//! Element-range leases on a shared backing store.
//!
//! Every block holds a [`LeaseGuard`] over the element range it views.
//! Shared leases may overlap each other; an exclusive lease overlaps
//! nothing. Conflicts fail immediately with [`ErrorId::BlockBusy`]
//! instead of blocking, so a kernel that mis-partitions its rows gets an
//! error rather than a deadlock or a data race.

use std::ops::Range;
use std::sync::{Mutex, PoisonError};

use smallvec::SmallVec;
use tabula_core::{Error, ErrorId};

#[derive(Debug)]
struct ActiveLease {
    id: u64,
    range: Range<usize>,
    exclusive: bool,
}

#[derive(Debug, Default)]
struct RegistryState {
    next_id: u64,
    active: SmallVec<[ActiveLease; 4]>,
}

/// Registry of the leases currently held on one buffer.
#[derive(Debug, Default)]
pub struct LeaseRegistry {
    state: Mutex<RegistryState>,
}

fn overlaps(a: &Range<usize>, b: &Range<usize>) -> bool {
    a.start < a.end && b.start < b.end && a.start < b.end && b.start < a.end
}

impl LeaseRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a lease over `range`.
    ///
    /// Empty ranges never conflict.
    pub fn acquire(&self, range: Range<usize>, exclusive: bool) -> Result<LeaseGuard<'_>, Error> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(held) = state
            .active
            .iter()
            .find(|l| (exclusive || l.exclusive) && overlaps(&l.range, &range))
        {
            return Err(Error::new(ErrorId::BlockBusy).with_message(format!(
                "requested {} lease on {}..{} conflicts with {} lease on {}..{}",
                if exclusive { "exclusive" } else { "shared" },
                range.start,
                range.end,
                if held.exclusive { "exclusive" } else { "shared" },
                held.range.start,
                held.range.end,
            )));
        }
        let id = state.next_id;
        state.next_id += 1;
        state.active.push(ActiveLease {
            id,
            range: range.clone(),
            exclusive,
        });
        Ok(LeaseGuard {
            registry: self,
            id,
            range,
            exclusive,
        })
    }

    /// Number of leases currently held.
    pub fn active_count(&self) -> usize {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .active
            .len()
    }

    fn release(&self, id: u64) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(pos) = state.active.iter().position(|l| l.id == id) {
            state.active.swap_remove(pos);
        }
    }
}

/// A held lease. Dropping it releases the range.
#[derive(Debug)]
#[must_use]
pub struct LeaseGuard<'a> {
    registry: &'a LeaseRegistry,
    id: u64,
    range: Range<usize>,
    exclusive: bool,
}

impl LeaseGuard<'_> {
    /// Leased element range.
    pub fn range(&self) -> Range<usize> {
        self.range.clone()
    }

    /// Whether the lease is exclusive.
    pub fn is_exclusive(&self) -> bool {
        self.exclusive
    }
}

impl Drop for LeaseGuard<'_> {
    fn drop(&mut self) {
        self.registry.release(self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shared_leases_overlap() {
        let reg = LeaseRegistry::new();
        let a = reg.acquire(0..10, false).unwrap();
        let b = reg.acquire(5..15, false).unwrap();
        assert_eq!(reg.active_count(), 2);
        drop(a);
        drop(b);
        assert_eq!(reg.active_count(), 0);
    }

    #[test]
    fn exclusive_conflicts_with_shared() {
        let reg = LeaseRegistry::new();
        let _a = reg.acquire(0..10, false).unwrap();
        let err = reg.acquire(9..12, true).unwrap_err();
        assert_eq!(err.id(), ErrorId::BlockBusy);
    }

    #[test]
    fn shared_conflicts_with_exclusive() {
        let reg = LeaseRegistry::new();
        let _a = reg.acquire(0..10, true).unwrap();
        assert!(reg.acquire(3..4, false).is_err());
    }

    #[test]
    fn disjoint_exclusive_leases_coexist() {
        let reg = LeaseRegistry::new();
        let a = reg.acquire(0..10, true).unwrap();
        let b = reg.acquire(10..20, true).unwrap();
        assert!(a.is_exclusive());
        assert_eq!(b.range(), 10..20);
    }

    #[test]
    fn empty_range_never_conflicts() {
        let reg = LeaseRegistry::new();
        let _a = reg.acquire(0..10, true).unwrap();
        assert!(reg.acquire(5..5, true).is_ok());
    }

    #[test]
    fn release_allows_reacquire() {
        let reg = LeaseRegistry::new();
        let a = reg.acquire(0..10, true).unwrap();
        drop(a);
        assert!(reg.acquire(0..10, true).is_ok());
    }
}
