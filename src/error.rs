//! Error types for the cachemux library.
//!
//! ## Key Components
//!
//! - [`CacheError`]: The single error type crossing the public API. Carries
//!   the `NotFound` miss sentinel and verbatim loader failures from the
//!   updater wrapper.
//!
//! ## Example Usage
//!
//! ```
//! use cachemux::engine::map::MapCache;
//! use cachemux::error::CacheError;
//! use cachemux::traits::Cache;
//!
//! let cache: MapCache<String, i32> = MapCache::new();
//! let err = cache.get(&"missing".to_string()).unwrap_err();
//! assert!(err.is_not_found());
//! assert!(matches!(err, CacheError::NotFound));
//! ```

use std::error::Error;
use std::fmt;

/// Boxed user error produced by an updater loader.
pub type BoxError = Box<dyn Error + Send + Sync + 'static>;

// ---------------------------------------------------------------------------
// CacheError
// ---------------------------------------------------------------------------

/// Error returned by fallible cache operations.
///
/// `NotFound` is the expected signalling value for missing or expired keys
/// and is not a failure in any meaningful sense; callers match on it the way
/// they would match on `Option::None`. `Loader` wraps an error returned by a
/// user-provided load function, propagated verbatim by
/// [`Updater::get`](crate::wrap::updater::Updater::get).
#[derive(Debug)]
pub enum CacheError {
    /// The key is not in the cache (or is expired and awaiting sweep).
    NotFound,
    /// A loader invoked on cache miss failed; the cache was not populated.
    Loader(BoxError),
}

impl CacheError {
    /// Returns `true` if this error is the `NotFound` sentinel.
    #[inline]
    pub fn is_not_found(&self) -> bool {
        matches!(self, CacheError::NotFound)
    }
}

impl fmt::Display for CacheError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheError::NotFound => f.write_str("not found"),
            CacheError::Loader(err) => write!(f, "loader failed: {err}"),
        }
    }
}

impl Error for CacheError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            CacheError::NotFound => None,
            CacheError::Loader(err) => Some(err.as_ref()),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
