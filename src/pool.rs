use std::{
    convert::Infallible,
    fmt,
    sync::Arc,
    time::{Duration, Instant},
};

use parking_lot::{Condvar, Mutex};
use tracing::{debug, trace, warn};

use crate::{
    slots::{Released, Signal, Slots, Target},
    Acquire, BuildError, Manager, Object, PoolBuilder, PoolConfig, PoolError, PoolMetrics, Status,
};

/// Fixed-size pool of objects leased out by slot index.
///
/// Every slot holds one object for the whole lifetime of the pool. Callers
/// lease a slot, use the object returned by [`Pool::at()`] and give the slot
/// back with [`Pool::release()`]. The pool does not track *who* holds a
/// lease: releasing the right index exactly once is up to the caller. The
/// [`Object`] guard returned by [`Pool::get()`] does this automatically and
/// should be preferred where the lease does not need to cross an API
/// boundary as a plain index.
///
/// Waiters are served in arrival order. A released slot goes straight to the
/// earliest waiter that can take it, so nobody arriving later can overtake
/// them.
///
/// This struct can be cloned and transferred across thread boundaries and uses
/// reference counting for its internal state. The objects are dropped once
/// the last clone is gone, regardless of any leases still outstanding.
pub struct Pool<T> {
    pub(crate) inner: Arc<PoolInner<T>>,
}

// Implemented manually to avoid unnecessary trait bound on `T`.
impl<T> fmt::Debug for Pool<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pool")
            .field("config", &self.inner.config)
            .field("status", &self.status())
            .finish()
    }
}

impl<T> Clone for Pool<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T> Pool<T> {
    /// Instantiates a builder for a new [`Pool`] whose objects are created
    /// by `manager`.
    pub fn builder<M>(manager: M) -> PoolBuilder<M>
    where
        M: Manager<Type = T>,
    {
        PoolBuilder::new(manager)
    }

    /// Creates a [`Pool`] with one slot per object, in the given order.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::InvalidSize`] if `objects` is empty.
    pub fn from_objects(objects: Vec<T>) -> Result<Self, BuildError<Infallible>> {
        if objects.is_empty() {
            return Err(BuildError::InvalidSize);
        }
        let config = PoolConfig::new(objects.len());
        Ok(Self::from_parts(objects, config))
    }

    pub(crate) fn from_parts(objects: Vec<T>, mut config: PoolConfig) -> Self {
        config.max_size = objects.len();
        debug!(size = config.max_size, "pool created");
        Self {
            inner: Arc::new(PoolInner {
                slots: Mutex::new(Slots::new(objects.len())),
                objects: objects.into_boxed_slice(),
                metrics: PoolMetrics::default(),
                config,
            }),
        }
    }

    /// Number of slots in this [`Pool`].
    #[must_use]
    pub fn size(&self) -> usize {
        self.inner.objects.len()
    }

    /// Returns the object stored in slot `index`.
    ///
    /// This is a plain lookup. It neither checks nor changes the lease state,
    /// so the same object is returned for the same index at any time. Using
    /// it concurrently with other callers is only sound as far as `T` allows
    /// shared access; the lease is what keeps other pool users away.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::IndexOutOfRange`] if `index` is not a slot.
    pub fn at(&self, index: usize) -> Result<&T, PoolError> {
        self.inner.objects.get(index).ok_or(PoolError::IndexOutOfRange {
            index,
            size: self.size(),
        })
    }

    /// Leases any free slot, waiting as long as it takes for one.
    ///
    /// If nobody ever releases a slot this blocks forever.
    #[must_use = "the slot stays leased until it is released"]
    pub fn acquire(&self) -> usize {
        let Some(index) = self.inner.lease(Target::Any, None) else {
            unreachable!("waiting without a timeout cannot time out")
        };
        index
    }

    /// Leases any free slot, waiting up to `timeout` for one.
    ///
    /// A zero `timeout` only polls and never suspends the calling thread.
    /// Returns [`None`] if no slot became available in time.
    #[must_use = "the slot stays leased until it is released"]
    pub fn try_acquire(&self, timeout: Duration) -> Option<usize> {
        self.inner.lease(Target::Any, Some(timeout))
    }

    /// Leases slot `index`, waiting up to `timeout` for it to become free.
    ///
    /// Only a release of this very slot can end the wait early. Returns
    /// `false` if the slot stayed leased for the whole `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::IndexOutOfRange`] if `index` is not a slot.
    pub fn try_acquire_at(&self, index: usize, timeout: Duration) -> Result<bool, PoolError> {
        self.check(index)?;
        Ok(self.inner.lease(Target::Index(index), Some(timeout)).is_some())
    }

    /// Ends the lease on slot `index`.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::IndexOutOfRange`] if `index` is not a slot and
    /// [`PoolError::NotLeased`] if the slot is free already. Neither changes
    /// the state of the pool.
    pub fn release(&self, index: usize) -> Result<(), PoolError> {
        self.check(index)?;
        self.inner.release(index)
    }

    /// Leases a slot wrapped in an [`Object`] guard, waiting up to the
    /// configured [`PoolConfig::timeout`].
    ///
    /// Without a configured timeout this always returns [`Some`].
    #[must_use]
    pub fn get(&self) -> Option<Object<T>> {
        self.timeout_get(self.inner.config.timeout)
    }

    /// Leases a slot wrapped in an [`Object`] guard using a different
    /// `timeout` than the configured one. `None` waits forever.
    #[must_use]
    pub fn timeout_get(&self, timeout: Option<Duration>) -> Option<Object<T>> {
        self.inner
            .lease(Target::Any, timeout)
            .map(|index| Object::new(self.clone(), index))
    }

    /// Leases slot `index` wrapped in an [`Object`] guard, waiting up to
    /// `timeout` for it.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::IndexOutOfRange`] if `index` is not a slot.
    pub fn get_at(&self, index: usize, timeout: Duration) -> Result<Option<Object<T>>, PoolError> {
        self.check(index)?;
        Ok(self
            .inner
            .lease(Target::Index(index), Some(timeout))
            .map(|index| Object::new(self.clone(), index)))
    }

    /// Returns a future leasing any free slot.
    ///
    /// Unlike [`Pool::acquire()`] the wait can be cancelled by dropping the
    /// future. See [`Acquire`] for details.
    pub fn acquire_async(&self) -> Acquire<T> {
        Acquire::new(self.clone(), Target::Any)
    }

    /// Returns a future leasing slot `index`.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::IndexOutOfRange`] if `index` is not a slot.
    pub fn acquire_at_async(&self, index: usize) -> Result<Acquire<T>, PoolError> {
        self.check(index)?;
        Ok(Acquire::new(self.clone(), Target::Index(index)))
    }

    /// Leases any free slot, waiting up to `timeout` without blocking the
    /// executor thread.
    #[cfg(feature = "rt_tokio_1")]
    #[cfg_attr(docsrs, doc(cfg(feature = "rt_tokio_1")))]
    pub async fn try_acquire_async(&self, timeout: Duration) -> Option<usize> {
        if timeout.is_zero() {
            return self.try_acquire(timeout);
        }
        let leased = tokio::time::timeout(timeout, self.acquire_async()).await.ok();
        if leased.is_none() {
            self.inner.metrics.record_timeout();
        }
        leased
    }

    /// Retrieves [`Status`] of this [`Pool`].
    #[must_use]
    pub fn status(&self) -> Status {
        let slots = self.inner.slots.lock();
        Status {
            max_size: slots.len(),
            available: slots.free(),
            leased: slots.leased(),
            waiting: slots.waiting(),
        }
    }

    /// Returns the [`PoolMetrics`] collected since this [`Pool`] was built.
    #[must_use]
    pub fn metrics(&self) -> &PoolMetrics {
        &self.inner.metrics
    }

    fn check(&self, index: usize) -> Result<(), PoolError> {
        if index < self.size() {
            Ok(())
        } else {
            Err(PoolError::IndexOutOfRange {
                index,
                size: self.size(),
            })
        }
    }
}

pub(crate) struct PoolInner<T> {
    objects: Box<[T]>,
    pub(crate) slots: Mutex<Slots>,
    pub(crate) metrics: PoolMetrics,
    config: PoolConfig,
}

impl<T> PoolInner<T> {
    pub(crate) fn objects(&self) -> &[T] {
        &self.objects
    }

    /// Blocks the calling thread until `target` can be leased or `timeout`
    /// elapses.
    fn lease(&self, target: Target, timeout: Option<Duration>) -> Option<usize> {
        let mut slots = self.slots.lock();
        if let Some(index) = slots.try_take(target) {
            trace!(index, "slot leased");
            return Some(index);
        }
        if timeout.is_some_and(|t| t.is_zero()) {
            self.metrics.record_timeout();
            return None;
        }

        let start = Instant::now();
        let deadline = timeout.and_then(|t| start.checked_add(t));
        let cond = Arc::new(Condvar::new());
        let ticket = slots.enqueue(target, Signal::Thread(cond.clone()));
        trace!(wanted = ?target, ticket, "waiting for a slot");

        let leased = loop {
            if let Some(index) = slots.claim(ticket) {
                break Some(index);
            }
            match deadline {
                None => cond.wait(&mut slots),
                Some(deadline) => {
                    if cond.wait_until(&mut slots, deadline).timed_out() {
                        // A release may have handed us the slot just now.
                        break slots.withdraw(ticket);
                    }
                }
            }
        };
        drop(slots);

        self.metrics.record_waiting(start.elapsed());
        if let Some(index) = leased {
            trace!(index, ticket, "slot leased after waiting");
        } else {
            self.metrics.record_timeout();
            trace!(wanted = ?target, ticket, "gave up waiting for a slot");
        }
        leased
    }

    /// Ends the lease on an in-range `index`, waking whoever it is handed to.
    pub(crate) fn release(&self, index: usize) -> Result<(), PoolError> {
        let released = self.slots.lock().release(index);
        let Ok(Released { held, handoff }) = released else {
            self.metrics.record_violation();
            warn!(index, "rejected release of a slot that is not leased");
            return Err(PoolError::NotLeased(index));
        };

        self.metrics.record_leased(held);
        if let Some(signal) = handoff {
            trace!(index, "slot handed to next waiter");
            signal.wake();
        } else {
            trace!(index, "slot released");
        }
        Ok(())
    }
}

impl<T> Drop for PoolInner<T> {
    fn drop(&mut self) {
        let slots = self.slots.get_mut();
        debug!(
            size = slots.len(),
            leased = slots.leased(),
            "pool torn down"
        );
    }
}
