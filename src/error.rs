/// Errors surfaced across the pool's public boundary.
///
/// A [`PoolError::Provider`] carries the backing [`ManageConnection`](crate::ManageConnection)'s
/// own error type unchanged; the pool never interprets or wraps it beyond this variant.
#[derive(Debug, thiserror::Error)]
pub enum PoolError<E> {
    /// The pool observed `close()` either before or while this acquisition was pending.
    #[error("the connection pool has been closed")]
    Closed,
    /// The provider failed to produce a connection for this acquisition.
    #[error(transparent)]
    Provider(E),
}

impl<E> PoolError<E> {
    /// `true` if this is [`PoolError::Closed`].
    pub fn is_closed(&self) -> bool {
        matches!(self, PoolError::Closed)
    }
}
