use std::{fmt, time::Duration};

use super::{BuildError, Manager, Pool, PoolConfig};

/// Builder for [`Pool`]s.
///
/// Instances of this are created by calling the [`Pool::builder()`] method.
#[must_use = "builder does nothing itself, use `.build()` to build it"]
pub struct PoolBuilder<M: Manager> {
    pub(crate) manager: M,
    pub(crate) config: PoolConfig,
}

// Implemented manually to avoid unnecessary trait bound on `M::Type`.
impl<M> fmt::Debug for PoolBuilder<M>
where
    M: fmt::Debug + Manager,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PoolBuilder")
            .field("manager", &self.manager)
            .field("config", &self.config)
            .finish()
    }
}

impl<M: Manager> PoolBuilder<M> {
    pub(crate) fn new(manager: M) -> Self {
        Self {
            manager,
            config: PoolConfig::default(),
        }
    }

    /// Builds the [`Pool`], calling [`Manager::create()`] once per slot.
    ///
    /// Either every slot gets its object or no pool comes up at all. Objects
    /// created before a failure are dropped again.
    ///
    /// # Errors
    ///
    /// See [`BuildError`] for details.
    pub fn build(self) -> Result<Pool<M::Type>, BuildError<M::Error>> {
        let size = self.config.max_size;
        if size == 0 {
            return Err(BuildError::InvalidSize);
        }
        let mut objects = Vec::with_capacity(size);
        for index in 0..size {
            let obj = self
                .manager
                .create()
                .map_err(|source| BuildError::Backend { index, source })?;
            objects.push(obj);
        }
        Ok(Pool::from_parts(objects, self.config))
    }

    /// Sets a [`PoolConfig`] to build the [`Pool`] with.
    pub fn config(mut self, value: PoolConfig) -> Self {
        self.config = value;
        self
    }

    /// Sets the [`PoolConfig::max_size`].
    pub fn max_size(mut self, value: usize) -> Self {
        self.config.max_size = value;
        self
    }

    /// Sets the [`PoolConfig::timeout`].
    pub fn timeout(mut self, value: Option<Duration>) -> Self {
        self.config.timeout = value;
        self
    }
}
