use std::{fmt, ops::Deref};

use crate::Pool;

/// Lease on a single slot of a [`Pool`] which implements [`Deref`] and
/// [`Drop`].
///
/// Use this object just as if it was of type `&T` and upon leaving a scope the
/// [`Drop::drop()`] will take care of releasing the slot, whether the scope is
/// left normally, early or by unwinding.
///
/// The guard keeps the [`Pool`] alive, so the object it points to cannot be
/// torn down underneath it.
#[must_use]
pub struct Object<T> {
    pool: Pool<T>,
    index: usize,
    detached: bool,
}

impl<T: fmt::Debug> fmt::Debug for Object<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Object")
            .field("index", &self.index)
            .field("obj", &**self)
            .finish_non_exhaustive()
    }
}

impl<T> Object<T> {
    pub(crate) fn new(pool: Pool<T>, index: usize) -> Self {
        Self {
            pool,
            index,
            detached: false,
        }
    }

    /// Returns the index of the leased slot.
    #[must_use]
    pub fn index(this: &Self) -> usize {
        this.index
    }

    /// Returns the [`Pool`] this [`Object`] was leased from.
    #[must_use]
    pub fn pool(this: &Self) -> &Pool<T> {
        &this.pool
    }

    /// Turns this guard into a plain index lease.
    ///
    /// The slot stays leased and must be given back with
    /// [`Pool::release()`].
    #[must_use = "the slot stays leased until it is released"]
    pub fn detach(mut this: Self) -> usize {
        this.detached = true;
        this.index
    }
}

impl<T> Drop for Object<T> {
    fn drop(&mut self) {
        if !self.detached {
            // Only fails if the caller already released the index by hand,
            // which the pool reports on its own.
            let _ = self.pool.inner.release(self.index);
        }
    }
}

impl<T> Deref for Object<T> {
    type Target = T;
    fn deref(&self) -> &T {
        &self.pool.inner.objects()[self.index]
    }
}

impl<T> AsRef<T> for Object<T> {
    fn as_ref(&self) -> &T {
        self
    }
}
