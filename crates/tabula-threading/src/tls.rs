//! Per-worker scratch storage.

use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Lazily created per-worker values.
///
/// A worker calls the factory the first time it needs scratch in a
/// region and hands the value back when it exits. After the region
/// joins, the handed-back values are consumed with [`Tls::reduce`] or
/// [`Tls::into_values`].
///
/// The factory runs at most once per worker per region, so the number of
/// values is bounded by the worker count, not the block count.
pub struct Tls<T, I = fn() -> T> {
    init: I,
    values: Mutex<Vec<T>>,
}

impl<T, I> Tls<T, I>
where
    T: Send,
    I: Fn() -> T + Sync,
{
    /// Storage whose values are created by `init`.
    pub fn new(init: I) -> Self {
        Self {
            init,
            values: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn create(&self) -> T {
        (self.init)()
    }

    pub(crate) fn hand_back(&self, value: T) {
        self.lock().push(value);
    }

    /// Number of values handed back so far.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Returns `true` if no worker has handed back a value.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Consume into the handed-back values, in hand-back order.
    pub fn into_values(self) -> Vec<T> {
        self.values
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Fold every handed-back value into `acc`.
    pub fn reduce<R>(self, acc: R, f: impl FnMut(R, T) -> R) -> R {
        self.into_values().into_iter().fold(acc, f)
    }

    fn lock(&self) -> MutexGuard<'_, Vec<T>> {
        self.values.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T, I> fmt::Debug for Tls<T, I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let handed_back = self
            .values
            .lock()
            .map_or(0, |values| values.len());
        f.debug_struct("Tls")
            .field("handed_back", &handed_back)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reduce_folds_handed_back_values() {
        let tls = Tls::new(|| 0u64);
        for v in [3, 4, 5] {
            let mut x = tls.create();
            x += v;
            tls.hand_back(x);
        }
        assert_eq!(tls.len(), 3);
        assert_eq!(tls.reduce(0, |acc, v| acc + v), 12);
    }

    #[test]
    fn empty_until_handed_back() {
        let tls = Tls::new(Vec::<f64>::new);
        let _unused = tls.create();
        assert!(tls.is_empty());
        assert!(tls.into_values().is_empty());
    }
}
