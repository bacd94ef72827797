use std::fmt;

/// Possible errors returned by the indexed operations of a [`Pool`].
///
/// Timeouts are not errors. The timed acquire methods report them through
/// their return value instead.
///
/// [`Pool`]: super::Pool
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PoolError {
    /// The index does not name a slot of the [`Pool`].
    ///
    /// [`Pool`]: super::Pool
    IndexOutOfRange {
        /// The offending index.
        index: usize,
        /// Number of slots in the pool.
        size: usize,
    },

    /// The slot was released while it was not leased.
    ///
    /// This always indicates a bug in the calling code, typically a double
    /// release. The slot is left untouched.
    NotLeased(usize),
}

impl fmt::Display for PoolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::IndexOutOfRange { index, size } => write!(
                f,
                "Index {} is out of range for a pool of {} slots",
                index, size
            ),
            Self::NotLeased(index) => {
                write!(f, "Slot {} was released while it was not leased", index)
            }
        }
    }
}

impl std::error::Error for PoolError {}

/// Possible errors returned by [`PoolBuilder::build()`].
///
/// [`PoolBuilder::build()`]: super::PoolBuilder::build
#[derive(Debug)]
pub enum BuildError<E> {
    /// The pool was configured with zero slots.
    InvalidSize,

    /// The [`Manager`] failed to create the object for slot `index`.
    ///
    /// [`Manager`]: super::Manager
    Backend {
        /// Slot whose object could not be created.
        index: usize,
        /// Error reported by the [`Manager`].
        ///
        /// [`Manager`]: super::Manager
        source: E,
    },
}

impl<E: fmt::Display> fmt::Display for BuildError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidSize => write!(f, "Pool size must be at least 1"),
            Self::Backend { index, source } => write!(
                f,
                "Error occurred while creating the object for slot {}: {}",
                index, source
            ),
        }
    }
}

impl<E: std::error::Error + 'static> std::error::Error for BuildError<E> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::InvalidSize => None,
            Self::Backend { source, .. } => Some(source),
        }
    }
}
