use std::fmt;
use std::sync::{Arc, Weak};
use std::time::Instant;

use futures::channel::oneshot;

use crate::builder::Builder;
use crate::error::PoolError;
use crate::internals::{Conn, PoolInternals, WaitResult};
use crate::manage::ManageConnection;
use crate::wrapper::PooledConnection;

/// Information about the current state of a [`Pool`].
pub struct State {
    /// Connections currently managed by the pool (checked out + idle).
    pub connections: u32,
    /// Idle connections sitting in the free list.
    pub idle_connections: u32,
    _p: (),
}

impl fmt::Debug for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("State")
            .field("connections", &self.connections)
            .field("idle_connections", &self.idle_connections)
            .finish()
    }
}

/// The guts of a [`Pool`], shared between every clone via an [`Arc`].
pub(crate) struct SharedPool<M>
where
    M: ManageConnection,
{
    pub(crate) builder: Builder<M>,
    pub(crate) manager: M,
    pub(crate) internals: tokio::sync::Mutex<PoolInternals<M>>,
}

/// A bounded, provider-backed pool of connections.
///
/// Cloning a `Pool` is cheap — every clone shares the same underlying state
/// via an `Arc`, matching the way the manager and reaper are expected to
/// outlive any single checked-out connection.
pub struct Pool<M>
where
    M: ManageConnection,
{
    pub(crate) inner: Arc<SharedPool<M>>,
}

impl<M> Clone for Pool<M>
where
    M: ManageConnection,
{
    fn clone(&self) -> Self {
        Pool {
            inner: self.inner.clone(),
        }
    }
}

impl<M> fmt::Debug for Pool<M>
where
    M: ManageConnection,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Pool").field(&Arc::as_ptr(&self.inner)).finish()
    }
}

/// Runs the provider's invalidation hook on a discarded connection, outside
/// the pool lock (spec.md §5). A failure is routed to the configured
/// `ErrorSink` and logged; it never propagates to any caller (spec.md §7).
async fn invalidate<M>(shared: &SharedPool<M>, conn: Conn<M::Connection>)
where
    M: ManageConnection,
{
    if let Err(e) = shared.manager.invalidate_connection(conn.conn).await {
        #[cfg(feature = "tracing")]
        tracing::warn!(error = %e, "connection invalidation failed");

        shared.builder.error_sink.sink(e);
    }
}

/// Attempts to serve one queued waiter with a freshly created connection.
///
/// Called after a slot frees up with no handle to hand off directly — either
/// because a release discarded a handle (invalidated/closed/expired/stale
/// generation) or because the reaper evicted an idle handle. spec.md §4.2 and
/// §4.4 call this "wake one waiter (so it may create a fresh one)": the
/// waiter itself never calls `connect()` — the pool does it on the waiter's
/// behalf and resumes it with the outcome, success or failure alike.
async fn serve_one_waiter<M>(shared: Arc<SharedPool<M>>)
where
    M: ManageConnection,
{
    let waiter = {
        let mut internals = shared.internals.lock().await;
        if internals.closed || internals.live_count() >= shared.builder.max_size {
            return;
        }
        match internals.waiters.pop_front() {
            Some(w) => {
                internals.pending_conns += 1;
                w
            }
            None => return,
        }
    };

    match shared.manager.connect().await {
        Ok(raw) => {
            let mut internals = shared.internals.lock().await;
            internals.pending_conns -= 1;
            internals.num_conns += 1;
            let generation = internals.generation;
            let conn = Conn {
                conn: raw,
                birth: Instant::now(),
                generation,
                expire_at: None,
            };
            drop(internals);

            if let Err(WaitResult::Conn(returned)) = waiter.send(WaitResult::Conn(conn)) {
                // The waiter cancelled between being dequeued and the
                // connection landing. Don't leak it — give it to the next
                // waiter or the free list.
                let mut internals = shared.internals.lock().await;
                internals.put_idle_conn(returned, shared.builder.max_ttl);
            }
        }
        Err(e) => {
            let mut internals = shared.internals.lock().await;
            internals.pending_conns -= 1;
            drop(internals);

            #[cfg(feature = "tracing")]
            tracing::warn!(error = %e, "connection creation on behalf of a queued waiter failed");

            let _ = waiter.send(WaitResult::Provider(e));
        }
    }
}

fn wake_one_waiter<M>(shared: &Arc<SharedPool<M>>)
where
    M: ManageConnection,
{
    tokio::spawn(serve_one_waiter(shared.clone()));
}

fn spawn_reaper<M>(weak: Weak<SharedPool<M>>, max_ttl: std::time::Duration)
where
    M: ManageConnection,
{
    // No coarser than max_ttl / 2, per spec.md §4.4.
    let period = std::cmp::max(max_ttl / 2, std::time::Duration::from_millis(1));
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.tick().await; // first tick fires immediately; skip it.
        loop {
            interval.tick().await;
            let shared = match weak.upgrade() {
                Some(s) => s,
                None => return,
            };

            let mut internals = shared.internals.lock().await;
            if internals.closed {
                return;
            }

            let now = Instant::now();
            let mut evicted = Vec::new();
            let mut i = 0;
            while i < internals.conns.len() {
                let expired = internals.conns[i].expire_at.map(|e| e <= now).unwrap_or(false);
                if expired {
                    evicted.push(internals.conns.remove(i).unwrap());
                } else {
                    i += 1;
                }
            }
            let waiters_pending = !evicted.is_empty() && !internals.waiters.is_empty();
            internals.num_conns -= evicted.len() as u32;
            drop(internals);

            #[cfg(feature = "tracing")]
            if !evicted.is_empty() {
                tracing::debug!(evicted = evicted.len(), "reaper evicted expired idle connections");
            }

            // Invalidation happens outside the lock (spec.md §5).
            for conn in evicted {
                invalidate(&shared, conn).await;
            }

            if waiters_pending {
                wake_one_waiter(&shared);
            }
        }
    });
}

impl<M: ManageConnection> Pool<M> {
    pub(crate) fn new_inner(builder: Builder<M>, manager: M) -> Pool<M> {
        let max_ttl = builder.max_ttl;
        let shared = Arc::new(SharedPool {
            builder,
            manager,
            internals: tokio::sync::Mutex::new(PoolInternals::new()),
        });

        spawn_reaper(Arc::downgrade(&shared), max_ttl);

        Pool { inner: shared }
    }

    /// Returns a [`Builder`] to configure a new pool.
    pub fn builder() -> Builder<M> {
        Builder::new()
    }

    /// Constructs a pool directly, equivalent to
    /// `Pool::builder().max_size(max_size).max_ttl(max_ttl).build(manager)`.
    ///
    /// # Panics
    ///
    /// Panics if `max_size` is zero or `max_ttl` is zero, per spec.md §4.2
    /// ("`maxConnections ≥ 1`, `maxTTL > 0`").
    pub fn new(manager: M, max_size: u32, max_ttl: std::time::Duration) -> Pool<M> {
        Builder::new().max_size(max_size).max_ttl(max_ttl).build(manager)
    }

    /// Returns a snapshot of the pool's current state.
    pub fn state(&self) -> State {
        let locked = loop {
            if let Ok(internals) = self.inner.internals.try_lock() {
                break internals;
            }
        };

        State {
            connections: locked.num_conns,
            idle_connections: locked.conns.len() as u32,
            _p: (),
        }
    }

    /// Retrieves a connection from the pool, suspending the calling task if
    /// the pool is at capacity with no idle handle available.
    pub async fn get(&self) -> Result<PooledConnection<'_, M>, PoolError<M::Error>> {
        let conn = self.get_conn().await?;
        Ok(PooledConnection::new(self, conn))
    }

    /// Retrieves a connection from the pool, blocking the calling OS thread.
    ///
    /// Built on the same admission algorithm as [`Pool::get`] — the pool
    /// does not distinguish blocking and cooperative callers beyond how each
    /// drives the returned future (spec.md §4.5, §5). The calling thread must
    /// have an active Tokio runtime context (the same requirement the pool's
    /// `Drop`-triggered release already carries).
    pub fn get_blocking(&self) -> Result<PooledConnection<'_, M>, PoolError<M::Error>> {
        futures::executor::block_on(self.get())
    }

    async fn get_conn(&self) -> Result<Conn<M::Connection>, PoolError<M::Error>> {
        let inner = &self.inner;
        let mut internals = inner.internals.lock().await;

        if internals.closed {
            return Err(PoolError::Closed);
        }

        if let Some(mut conn) = internals.conns.pop_front() {
            // `expire_at` is only meaningful while a handle sits idle.
            conn.expire_at = None;
            return Ok(conn);
        }

        if internals.live_count() < inner.builder.max_size {
            internals.pending_conns += 1;
            let generation = internals.generation;
            drop(internals);

            return match inner.manager.connect().await {
                Ok(raw) => {
                    let mut internals = inner.internals.lock().await;
                    internals.pending_conns -= 1;
                    internals.num_conns += 1;
                    Ok(Conn {
                        conn: raw,
                        birth: Instant::now(),
                        generation,
                        expire_at: None,
                    })
                }
                Err(e) => {
                    let mut internals = inner.internals.lock().await;
                    internals.pending_conns -= 1;
                    let waiters_pending = !internals.waiters.is_empty();
                    drop(internals);

                    if waiters_pending {
                        wake_one_waiter(inner);
                    }

                    Err(PoolError::Provider(e))
                }
            };
        }

        // At capacity with an empty free list: enqueue FIFO and suspend.
        // This is the pool's one suspension point other than the connect()
        // call above (spec.md §4.5).
        let (tx, rx) = oneshot::channel();
        internals.waiters.push_back(tx);
        drop(internals);

        match rx.await {
            Ok(WaitResult::Conn(conn)) => Ok(conn),
            Ok(WaitResult::Provider(e)) => Err(PoolError::Provider(e)),
            Ok(WaitResult::Closed) | Err(oneshot::Canceled) => Err(PoolError::Closed),
        }
    }

    /// Returns a handle to the pool, invoked exactly once by
    /// [`PooledConnection`]'s `Drop` (spec.md §4.2 "Release algorithm").
    pub(crate) async fn release(&self, conn: Conn<M::Connection>, invalidated: bool) {
        let inner = &self.inner;
        let mut internals = inner.internals.lock().await;

        let now = Instant::now();
        let aged_out_while_checked_out = conn.expire_at.map(|e| now > e).unwrap_or(false);
        let stale_generation = conn.generation != internals.generation;

        if invalidated || internals.closed || aged_out_while_checked_out || stale_generation {
            internals.num_conns -= 1;
            let waiters_pending = !internals.waiters.is_empty();
            drop(internals);

            invalidate(inner, conn).await;

            if waiters_pending {
                wake_one_waiter(inner);
            }
        } else {
            internals.put_idle_conn(conn, inner.builder.max_ttl);
        }
    }

    /// Idempotently closes the pool: no further handle is created, every
    /// queued waiter fails with [`PoolError::Closed`], and every idle handle
    /// is invalidated. Connections already checked out keep working; their
    /// eventual release destroys rather than re-pools them (spec.md §4.2,
    /// §5 "Shutdown ordering").
    pub async fn close(&self) {
        let mut internals = self.inner.internals.lock().await;
        if internals.closed {
            return;
        }
        internals.closed = true;
        internals.generation += 1;

        let waiters = std::mem::take(&mut internals.waiters);
        let idle = std::mem::take(&mut internals.conns);
        internals.num_conns -= idle.len() as u32;
        drop(internals);

        for waiter in waiters {
            let _ = waiter.send(WaitResult::Closed);
        }

        // Invalidation happens outside the lock (spec.md §5).
        for conn in idle {
            invalidate(&self.inner, conn).await;
        }
    }
}
