use std::time::Duration;

/// [`Pool`] configuration.
///
/// [`Pool`]: super::Pool
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PoolConfig {
    /// Number of slots in the [`Pool`]. Fixed once the pool is built.
    ///
    /// [`Pool`]: super::Pool
    pub max_size: usize,

    /// How long [`Pool::get()`] waits for a slot. `None` waits forever.
    ///
    /// [`Pool::get()`]: super::Pool::get
    pub timeout: Option<Duration>,
}

impl PoolConfig {
    /// Creates a new [`PoolConfig`] without any timeout and with the provided
    /// `max_size`.
    #[must_use]
    pub fn new(max_size: usize) -> Self {
        Self {
            max_size,
            timeout: None,
        }
    }
}

impl Default for PoolConfig {
    /// Creates a new [`PoolConfig`] with the `max_size` being set to
    /// `cpu_count * 4` ignoring any logical CPUs (Hyper-Threading).
    fn default() -> Self {
        Self::new(num_cpus::get_physical() * 4)
    }
}
