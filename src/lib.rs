#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(
    nonstandard_style,
    rust_2018_idioms,
    rustdoc::broken_intra_doc_links,
    rustdoc::private_intra_doc_links
)]
#![warn(clippy::pedantic)]
#![warn(
    deprecated_in_future,
    missing_copy_implementations,
    missing_debug_implementations,
    missing_docs,
    unreachable_pub,
    unused_import_braces,
    unused_labels,
    unused_lifetimes,
    unused_qualifications,
    unused_results
)]
#![allow(
    clippy::missing_panics_doc,
    clippy::module_name_repetitions,
    clippy::match_same_arms
)]

mod builder;
mod config;
mod errors;
mod future;
mod metrics;
mod object;
mod pool;
mod slots;

pub use self::{
    builder::PoolBuilder,
    config::PoolConfig,
    errors::{BuildError, PoolError},
    future::Acquire,
    metrics::PoolMetrics,
    object::Object,
    pool::Pool,
};

/// The current pool status.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Status {
    /// Number of slots in the pool.
    pub max_size: usize,

    /// Slots currently free.
    pub available: usize,

    /// Slots currently leased. Always `max_size - available`.
    pub leased: usize,

    /// Callers currently suspended waiting for a slot.
    pub waiting: usize,
}

/// Manager responsible for creating the objects stored in a [`Pool`].
///
/// It is called exactly once per slot while the pool is built and never
/// again afterwards. Objects are destroyed by dropping them when the pool
/// is torn down.
pub trait Manager {
    /// Type of objects that this [`Manager`] creates.
    type Type;
    /// Error that this [`Manager`] can return when creating objects.
    type Error;

    /// Creates a new instance of [`Manager::Type`].
    ///
    /// # Errors
    ///
    /// Any error aborts building the whole [`Pool`].
    fn create(&self) -> Result<Self::Type, Self::Error>;
}

impl<F, T, E> Manager for F
where
    F: Fn() -> Result<T, E>,
{
    type Type = T;
    type Error = E;

    fn create(&self) -> Result<T, E> {
        self()
    }
}
