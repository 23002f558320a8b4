use std::fmt;
use std::ops::{Deref, DerefMut};

use crate::internals::Conn;
use crate::manage::ManageConnection;
use crate::pool::Pool;

/// A scoped, user-facing borrow of a pooled connection.
///
/// Exposes the underlying connection through `Deref`/`DerefMut` so its own
/// I/O methods stay reachable verbatim (spec.md §6). Returned to the pool — or
/// discarded, if [`invalidate`](PooledConnection::invalidate) was called —
/// exactly once, when this value is dropped.
pub struct PooledConnection<'a, M>
where
    M: ManageConnection,
{
    pool: &'a Pool<M>,
    // `None` only in the brief window between `Drop::drop` taking it and the
    // wrapper's own destruction; never observable by a caller.
    conn: Option<Conn<M::Connection>>,
    invalidated: bool,
}

impl<'a, M> PooledConnection<'a, M>
where
    M: ManageConnection,
{
    pub(crate) fn new(pool: &'a Pool<M>, conn: Conn<M::Connection>) -> Self {
        PooledConnection {
            pool,
            conn: Some(conn),
            invalidated: false,
        }
    }

    /// Marks this connection for destruction instead of return. The borrow
    /// remains usable until it is dropped, but the pool will never hand the
    /// underlying connection out again.
    pub fn invalidate(&mut self) {
        self.invalidated = true;
    }

    fn conn(&self) -> &M::Connection {
        &self
            .conn
            .as_ref()
            .expect("PooledConnection used after release")
            .conn
    }

    fn conn_mut(&mut self) -> &mut M::Connection {
        &mut self
            .conn
            .as_mut()
            .expect("PooledConnection used after release")
            .conn
    }
}

impl<'a, M> Deref for PooledConnection<'a, M>
where
    M: ManageConnection,
{
    type Target = M::Connection;

    fn deref(&self) -> &M::Connection {
        self.conn()
    }
}

impl<'a, M> DerefMut for PooledConnection<'a, M>
where
    M: ManageConnection,
{
    fn deref_mut(&mut self) -> &mut M::Connection {
        self.conn_mut()
    }
}

impl<'a, M> fmt::Debug for PooledConnection<'a, M>
where
    M: ManageConnection,
    M::Connection: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PooledConnection")
            .field("connection", &self.conn.as_ref().map(|c| &c.conn))
            .field("invalidated", &self.invalidated)
            .finish()
    }
}

impl<'a, M> Drop for PooledConnection<'a, M>
where
    M: ManageConnection,
{
    fn drop(&mut self) {
        // Exactly one release per wrapper: `conn` is only `Some` here on the
        // first (and only) drop, so a double-release — an InvariantViolation
        // per spec.md §7 — cannot reach `Pool::release` twice. There is no
        // legal way to observe a second call to this `drop`.
        if let Some(conn) = self.conn.take() {
            let invalidated = self.invalidated;
            let pool = self.pool;
            futures::executor::block_on(async move {
                pool.release(conn, invalidated).await;
            });
        }
    }
}
