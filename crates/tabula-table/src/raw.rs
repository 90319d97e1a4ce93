//! Shared backing store with leased slice views.
//!
//! [`SharedBuffer`] is the only place in this crate that uses `unsafe`:
//! it hands out `&[T]` / `&mut [T]` views from `&self`. Soundness rests
//! on the [`LeaseRegistry`]: a view exists only together with the lease
//! over its element range, and an exclusive lease never overlaps any
//! other live lease.

#![allow(unsafe_code)]

use std::cell::UnsafeCell;
use std::ops::Range;

use tabula_core::{AnySlice, AnySliceMut, Error, ErrorId, NumericValue};

use crate::lease::{LeaseGuard, LeaseRegistry};

/// Fixed-length buffer whose element ranges can be viewed concurrently
/// under leases.
pub(crate) struct SharedBuffer<T> {
    cells: Box<[UnsafeCell<T>]>,
    leases: LeaseRegistry,
}

// SAFETY: all access to `cells` goes through `read`/`write`, which hold a
// lease; exclusive leases never overlap other leases, so no element is
// mutably aliased across threads.
unsafe impl<T: Send + Sync> Sync for SharedBuffer<T> {}

impl<T: NumericValue> SharedBuffer<T> {
    pub(crate) fn from_vec(data: Vec<T>) -> Self {
        Self {
            cells: data.into_iter().map(UnsafeCell::new).collect(),
            leases: LeaseRegistry::new(),
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.cells.len()
    }

    fn check_range(&self, range: &Range<usize>) -> Result<(), Error> {
        if range.start > range.end || range.end > self.cells.len() {
            return Err(Error::new(ErrorId::IncorrectIndex).with_message(format!(
                "element range {}..{} outside buffer of {}",
                range.start,
                range.end,
                self.cells.len()
            )));
        }
        Ok(())
    }

    fn base_ptr(&self, start: usize) -> *mut T {
        // `UnsafeCell<T>` is `repr(transparent)`, so the cell slice has
        // the layout of a `[T]`.
        UnsafeCell::raw_get(self.cells[start..].as_ptr())
    }

    /// Shared view of `range` under a shared lease.
    pub(crate) fn read(&self, range: Range<usize>) -> Result<ReadView<'_>, Error> {
        self.check_range(&range)?;
        let guard = self.leases.acquire(range.clone(), false)?;
        // SAFETY: the range is in bounds and the shared lease excludes
        // any exclusive lease (and thus any `&mut`) over these elements
        // for as long as `guard` lives inside the returned view.
        let slice = unsafe { std::slice::from_raw_parts(self.base_ptr(range.start), range.len()) };
        Ok(ReadView {
            _guard: guard,
            data: T::into_any(slice),
        })
    }

    /// Mutable view of `range` under an exclusive lease.
    pub(crate) fn write(&self, range: Range<usize>) -> Result<WriteView<'_>, Error> {
        self.check_range(&range)?;
        let guard = self.leases.acquire(range.clone(), true)?;
        // SAFETY: the range is in bounds and the exclusive lease
        // guarantees no other view of these elements exists while
        // `guard` lives inside the returned view.
        let slice =
            unsafe { std::slice::from_raw_parts_mut(self.base_ptr(range.start), range.len()) };
        Ok(WriteView {
            _guard: guard,
            data: T::into_any_mut(slice),
        })
    }

    /// Copy the whole buffer out under a shared lease.
    pub(crate) fn to_vec(&self) -> Result<Vec<T>, Error> {
        let view = self.read(0..self.len())?;
        Ok(T::from_any(view.data()).map(<[T]>::to_vec).unwrap_or_default())
    }

    #[cfg(test)]
    pub(crate) fn active_leases(&self) -> usize {
        self.leases.active_count()
    }
}

/// A shared, type-erased view bundled with its lease.
///
/// The `'a` slice never leaves this struct except reborrowed through
/// `&self`, so it cannot outlive the lease.
pub(crate) struct ReadView<'a> {
    _guard: LeaseGuard<'a>,
    data: AnySlice<'a>,
}

impl ReadView<'_> {
    pub(crate) fn data(&self) -> AnySlice<'_> {
        self.data
    }
}

/// A mutable, type-erased view bundled with its exclusive lease.
pub(crate) struct WriteView<'a> {
    _guard: LeaseGuard<'a>,
    data: AnySliceMut<'a>,
}

impl WriteView<'_> {
    pub(crate) fn data(&self) -> AnySlice<'_> {
        self.data.as_any_slice()
    }

    pub(crate) fn data_mut(&mut self) -> AnySliceMut<'_> {
        self.data.reborrow()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_and_write_views() {
        let buf = SharedBuffer::from_vec(vec![1.0f64, 2.0, 3.0, 4.0]);
        {
            let mut w = buf.write(1..3).unwrap();
            if let AnySliceMut::F64(s) = w.data_mut() {
                s[0] = 20.0;
                s[1] = 30.0;
            }
        }
        assert_eq!(buf.to_vec().unwrap(), vec![1.0, 20.0, 30.0, 4.0]);
        assert_eq!(buf.active_leases(), 0);
    }

    #[test]
    fn overlapping_write_rejected_while_read_held() {
        let buf = SharedBuffer::from_vec(vec![0i32; 8]);
        let r = buf.read(0..4).unwrap();
        assert_eq!(r.data().len(), 4);
        let err = buf.write(3..5).err().unwrap();
        assert_eq!(err.id(), ErrorId::BlockBusy);
        drop(r);
        assert!(buf.write(3..5).is_ok());
    }

    #[test]
    fn disjoint_writes_from_threads() {
        let buf = SharedBuffer::from_vec(vec![0f32; 64]);
        std::thread::scope(|s| {
            for t in 0..4 {
                let buf = &buf;
                s.spawn(move || {
                    let mut w = buf.write(t * 16..(t + 1) * 16).unwrap();
                    if let AnySliceMut::F32(s) = w.data_mut() {
                        s.fill(t as f32);
                    }
                });
            }
        });
        let v = buf.to_vec().unwrap();
        for (i, x) in v.iter().enumerate() {
            assert_eq!(*x, (i / 16) as f32);
        }
    }

    #[test]
    fn out_of_range_is_incorrect_index() {
        let buf = SharedBuffer::from_vec(vec![0f32; 4]);
        assert_eq!(buf.read(2..5).err().unwrap().id(), ErrorId::IncorrectIndex);
    }

    #[test]
    fn empty_buffer_views() {
        let buf = SharedBuffer::<f64>::from_vec(Vec::new());
        assert!(buf.read(0..0).unwrap().data().is_empty());
        assert!(buf.to_vec().unwrap().is_empty());
    }
}
