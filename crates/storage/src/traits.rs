//! Storage adapter contract
//!
//! A backend only has to scan a range, apply a batch of writes, and close.
//! Everything else (conflict detection, reactivity, read-your-writes) lives
//! above this seam, so any backend satisfying the contract is interchangeable.

use std::sync::Arc;

use tupledb_core::{KeyValuePair, NormalizedBounds, Result, WriteOps};

/// Synchronous storage backend
///
/// Thread safety: all methods must be safe to call concurrently from
/// multiple threads (requires Send + Sync).
pub trait TupleStorage: Send + Sync {
    /// Rows whose key lies within `bounds`, in key order
    ///
    /// Honors `bounds.limit` and `bounds.reverse`: with both set the result
    /// is the last `limit` rows of the range, in descending order.
    ///
    /// # Errors
    ///
    /// Returns `InvalidBounds` for an inverted range, or a `Storage` error
    /// if the backend fails or is closed.
    fn scan(&self, bounds: &NormalizedBounds) -> Result<Vec<KeyValuePair>>;

    /// Apply every set and remove in `writes` atomically
    ///
    /// # Errors
    ///
    /// Returns a `Storage` error if the backend fails or is closed.
    fn commit(&self, writes: &WriteOps) -> Result<()>;

    /// Release the backend; later calls fail
    fn close(&self) -> Result<()>;
}

impl<S: TupleStorage + ?Sized> TupleStorage for Arc<S> {
    fn scan(&self, bounds: &NormalizedBounds) -> Result<Vec<KeyValuePair>> {
        (**self).scan(bounds)
    }

    fn commit(&self, writes: &WriteOps) -> Result<()> {
        (**self).commit(writes)
    }

    fn close(&self) -> Result<()> {
        (**self).close()
    }
}

impl<S: TupleStorage + ?Sized> TupleStorage for Box<S> {
    fn scan(&self, bounds: &NormalizedBounds) -> Result<Vec<KeyValuePair>> {
        (**self).scan(bounds)
    }

    fn commit(&self, writes: &WriteOps) -> Result<()> {
        (**self).commit(writes)
    }

    fn close(&self) -> Result<()> {
        (**self).close()
    }
}

#[cfg(feature = "async")]
pub use self::asynchronous::{AsyncTupleStorage, SyncAdapter};

#[cfg(feature = "async")]
mod asynchronous {
    use std::future::Future;

    use super::TupleStorage;
    use tupledb_core::{KeyValuePair, NormalizedBounds, Result, WriteOps};

    /// Asynchronous storage backend
    ///
    /// Same contract as [`TupleStorage`], with every call a suspension point.
    pub trait AsyncTupleStorage: Send + Sync {
        /// Rows whose key lies within `bounds`, in key order
        fn scan(
            &self,
            bounds: &NormalizedBounds,
        ) -> impl Future<Output = Result<Vec<KeyValuePair>>> + Send;

        /// Apply every set and remove in `writes` atomically
        fn commit(&self, writes: &WriteOps) -> impl Future<Output = Result<()>> + Send;

        /// Release the backend; later calls fail
        fn close(&self) -> impl Future<Output = Result<()>> + Send;
    }

    /// Lifts a synchronous backend into [`AsyncTupleStorage`]
    #[derive(Debug, Clone, Default)]
    pub struct SyncAdapter<S> {
        inner: S,
    }

    impl<S: TupleStorage> SyncAdapter<S> {
        /// Wrap `inner`
        pub fn new(inner: S) -> Self {
            Self { inner }
        }

        /// The wrapped backend
        pub fn inner(&self) -> &S {
            &self.inner
        }
    }

    impl<S: TupleStorage> AsyncTupleStorage for SyncAdapter<S> {
        async fn scan(&self, bounds: &NormalizedBounds) -> Result<Vec<KeyValuePair>> {
            self.inner.scan(bounds)
        }

        async fn commit(&self, writes: &WriteOps) -> Result<()> {
            self.inner.commit(writes)
        }

        async fn close(&self) -> Result<()> {
            self.inner.close()
        }
    }
}
