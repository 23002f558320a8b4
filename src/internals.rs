use std::collections::VecDeque;
use std::time::{Duration, Instant};

use futures::channel::oneshot;

use crate::manage::ManageConnection;

/// A live connection plus the bookkeeping the pool needs to reclaim it safely.
pub(crate) struct Conn<C> {
    pub(crate) conn: C,
    pub(crate) birth: Instant,
    /// The pool generation this handle was created under. A handle whose
    /// generation no longer matches `PoolInternals::generation` is stale —
    /// it was checked out before a `close()` and must be discarded rather
    /// than re-pooled on return (spec invariant 5).
    pub(crate) generation: u64,
    /// Set only while the handle sits in the free list (spec invariant 6);
    /// `None` for a handle that has never yet been idle.
    pub(crate) expire_at: Option<Instant>,
}

/// What a queued waiter is resumed with.
pub(crate) enum WaitResult<C, E> {
    /// A handle, either handed off directly from a release or freshly created
    /// on this waiter's behalf.
    Conn(Conn<C>),
    /// A fresh creation attempted on this waiter's behalf failed.
    Provider(E),
    /// The pool was closed while this waiter was queued.
    Closed,
}

pub(crate) type Waiter<C, E> = oneshot::Sender<WaitResult<C, E>>;

/// The pool data that must be protected by a single mutex. Critical sections
/// over this type are O(1) deque operations only — provider calls and handle
/// teardown must happen with the lock released.
pub(crate) struct PoolInternals<M>
where
    M: ManageConnection,
{
    pub(crate) waiters: VecDeque<Waiter<M::Connection, M::Error>>,
    /// The free list. Newest-released sits at the front; the reaper treats
    /// the back as coldest. Front-push/front-pop gives LIFO reuse (spec.md
    /// §4.2 "LIFO of free handles maximises reuse of recently warm
    /// connections") — a deliberate divergence from the teacher crate, whose
    /// free list is FIFO.
    pub(crate) conns: VecDeque<Conn<M::Connection>>,
    pub(crate) num_conns: u32,
    pub(crate) pending_conns: u32,
    pub(crate) closed: bool,
    pub(crate) generation: u64,
}

impl<M> PoolInternals<M>
where
    M: ManageConnection,
{
    pub(crate) fn new() -> Self {
        PoolInternals {
            waiters: VecDeque::new(),
            conns: VecDeque::new(),
            num_conns: 0,
            pending_conns: 0,
            closed: false,
            generation: 0,
        }
    }

    /// Hands `conn` to the head waiter if one is queued, otherwise pushes it
    /// onto the free list with a fresh deadline. Invariant 4 (spec.md §3)
    /// depends on this always preferring a waiter over the free list.
    pub(crate) fn put_idle_conn(&mut self, mut conn: Conn<M::Connection>, max_ttl: Duration) {
        loop {
            if let Some(waiter) = self.waiters.pop_front() {
                // `expire_at` is only meaningful while a handle sits idle; a
                // handle handed straight to a waiter is never idle.
                conn.expire_at = None;
                match waiter.send(WaitResult::Conn(conn)) {
                    Ok(()) => return,
                    // Receiver gone (the waiter was cancelled) — recover the
                    // connection and try to hand it to the next waiter.
                    Err(WaitResult::Conn(c)) => conn = c,
                    Err(_) => unreachable!("send echoes back exactly what was sent"),
                }
            } else {
                conn.expire_at = Some(Instant::now() + max_ttl);
                self.conns.push_front(conn);
                return;
            }
        }
    }

    /// Connections the pool currently accounts for against `max_size`:
    /// confirmed live plus slots reserved for an in-flight `connect()`.
    pub(crate) fn live_count(&self) -> u32 {
        self.num_conns + self.pending_conns
    }
}
