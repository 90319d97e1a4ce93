//! Composite operation status.
//!
//! A [`Status`] is ok when it holds no errors. Kernels return
//! `Result<T, Status>`; a non-ok status can accumulate several errors
//! (e.g. one per failed block of a parallel region) before being
//! returned.

use std::error::Error as StdError;
use std::fmt;
use std::ops::BitOrAssign;

use smallvec::SmallVec;

use crate::error::{Error, ErrorId};

/// Possibly composite collection of [`Error`]s.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Status {
    errors: SmallVec<[Error; 1]>,
}

impl Status {
    /// The ok status (no errors).
    pub fn ok() -> Self {
        Self::default()
    }

    /// Returns `true` if no error has been recorded.
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    /// Record one more error.
    pub fn add(&mut self, error: impl Into<Error>) -> &mut Self {
        self.errors.push(error.into());
        self
    }

    /// Append every error of `other`.
    pub fn merge(&mut self, other: Status) -> &mut Self {
        self.errors.extend(other.errors);
        self
    }

    /// All recorded errors in insertion order.
    pub fn errors(&self) -> &[Error] {
        &self.errors
    }

    /// Number of recorded errors.
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// Returns `true` if no error has been recorded.
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// The first recorded error, if any.
    pub fn first(&self) -> Option<&Error> {
        self.errors.first()
    }

    /// Returns `true` if any recorded error has the given class.
    pub fn contains(&self, id: ErrorId) -> bool {
        self.errors.iter().any(|e| e.id() == id)
    }

    /// `Ok(())` when the status is ok, `Err(self)` otherwise.
    pub fn into_result(self) -> Result<(), Status> {
        if self.is_ok() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl From<Error> for Status {
    fn from(error: Error) -> Self {
        let mut errors = SmallVec::new();
        errors.push(error);
        Self { errors }
    }
}

impl From<ErrorId> for Status {
    fn from(id: ErrorId) -> Self {
        Self::from(Error::new(id))
    }
}

impl BitOrAssign for Status {
    fn bitor_assign(&mut self, rhs: Self) {
        self.merge(rhs);
    }
}

impl BitOrAssign<Error> for Status {
    fn bitor_assign(&mut self, rhs: Error) {
        self.add(rhs);
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.errors.is_empty() {
            return f.write_str("ok");
        }
        for (i, e) in self.errors.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{e}")?;
        }
        Ok(())
    }
}

impl StdError for Status {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.errors.first().map(|e| e as &(dyn StdError + 'static))
    }
}
