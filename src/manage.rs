use async_trait::async_trait;
use std::fmt;

/// A trait which provides connection-specific functionality.
///
/// Implementations must be safe to call concurrently from multiple threads and
/// cooperative tasks at once; the pool gives no guarantee about which caller's
/// request a given [`connect`](ManageConnection::connect) call is serving.
#[async_trait]
pub trait ManageConnection: Send + Sync + 'static {
    /// The connection type this manager deals with.
    type Connection: Send + 'static;
    /// The error type returned by the manager.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Attempts to create a new connection, blocking the calling task until one
    /// is available or the attempt fails.
    async fn connect(&self) -> Result<Self::Connection, Self::Error>;

    /// Determines if the connection is still usable via a round-trip check.
    ///
    /// The pool never calls this on its own admission path (connection
    /// probing before hand-out is out of scope); it exists so that a caller
    /// embedding this crate can opt into a check-out validation pass itself.
    async fn is_valid(&self, conn: &mut Self::Connection) -> Result<(), Self::Error>;

    /// Synchronously determines if the connection is known-broken without I/O.
    fn has_broken(&self, conn: &mut Self::Connection) -> bool;

    /// Best-effort hook invoked when the pool drops a connection — on TTL
    /// expiry, explicit invalidation, or `close()`. The default simply drops
    /// `conn`. A failure here is logged and otherwise swallowed: the pool's
    /// own accounting never depends on this succeeding (spec.md §7).
    async fn invalidate_connection(&self, conn: Self::Connection) -> Result<(), Self::Error> {
        drop(conn);
        Ok(())
    }
}

/// A sink for errors generated off the request path (e.g. a reaper-triggered
/// invalidation) that aren't tied to any particular caller.
pub trait ErrorSink<E>: fmt::Debug + Send + Sync + 'static {
    /// Receive an error.
    fn sink(&self, error: E);

    /// Clone this sink into a new box.
    fn boxed_clone(&self) -> Box<dyn ErrorSink<E>>;
}

/// An [`ErrorSink`] that discards everything it receives.
#[derive(Debug, Clone, Copy, Default)]
pub struct NopErrorSink;

impl<E> ErrorSink<E> for NopErrorSink {
    fn sink(&self, _error: E) {}

    fn boxed_clone(&self) -> Box<dyn ErrorSink<E>> {
        Box::new(*self)
    }
}
