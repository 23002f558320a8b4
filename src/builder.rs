use std::fmt;
use std::marker::PhantomData;
use std::time::Duration;

use crate::manage::{ErrorSink, ManageConnection, NopErrorSink};
use crate::pool::Pool;

/// A builder for a [`Pool`].
pub struct Builder<M: ManageConnection> {
    pub(crate) max_size: u32,
    pub(crate) max_ttl: Duration,
    pub(crate) error_sink: Box<dyn ErrorSink<M::Error>>,
    _p: PhantomData<M>,
}

impl<M: ManageConnection> fmt::Debug for Builder<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Builder")
            .field("max_size", &self.max_size)
            .field("max_ttl", &self.max_ttl)
            .finish()
    }
}

impl<M: ManageConnection> Default for Builder<M> {
    fn default() -> Self {
        Builder {
            max_size: 10,
            max_ttl: Duration::from_secs(30 * 60),
            error_sink: Box::new(NopErrorSink),
            _p: PhantomData,
        }
    }
}

impl<M: ManageConnection> Builder<M> {
    /// Constructs a new `Builder` with default values (`max_size = 10`,
    /// `max_ttl = 30 minutes`).
    pub fn new() -> Builder<M> {
        Default::default()
    }

    /// Sets the maximum number of connections managed by the pool.
    ///
    /// # Panics
    ///
    /// Panics if `max_size` is zero.
    pub fn max_size(mut self, max_size: u32) -> Builder<M> {
        assert!(max_size > 0, "max_size must be greater than zero!");
        self.max_size = max_size;
        self
    }

    /// Sets the maximum lifetime an idle connection may sit in the free list
    /// before the reaper evicts it.
    ///
    /// # Panics
    ///
    /// Panics if `max_ttl` is zero.
    pub fn max_ttl(mut self, max_ttl: Duration) -> Builder<M> {
        assert!(max_ttl > Duration::from_secs(0), "max_ttl must be greater than zero!");
        self.max_ttl = max_ttl;
        self
    }

    /// Sets the sink for errors not associated with any particular caller
    /// (currently: reaper-triggered invalidation failures).
    ///
    /// Defaults to [`NopErrorSink`].
    pub fn error_sink(mut self, error_sink: Box<dyn ErrorSink<M::Error>>) -> Builder<M> {
        self.error_sink = error_sink;
        self
    }

    /// Consumes the builder, constructing a [`Pool`] and spawning its
    /// background reaper.
    pub fn build(self, manager: M) -> Pool<M> {
        Pool::new_inner(self, manager)
    }
}
