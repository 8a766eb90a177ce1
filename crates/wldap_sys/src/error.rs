//! Errors raised while binding the native library.

use thiserror::Error;

/// Result type for library loading.
pub type LoadResult<T> = Result<T, LoadError>;

/// The native library or one of its entry points could not be bound.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The library itself could not be loaded.
    #[error("failed to load {library}: {source}")]
    Library {
        /// Library file name.
        library: &'static str,
        /// Loader error.
        #[source]
        source: libloading::Error,
    },

    /// The library is missing an expected export.
    #[error("symbol {symbol} not found: {source}")]
    Symbol {
        /// Exported symbol name.
        symbol: &'static str,
        /// Loader error.
        #[source]
        source: libloading::Error,
    },
}
