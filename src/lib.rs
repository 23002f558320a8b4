//! A generic, provider-backed connection pool for both blocking and
//! cooperative (`async`/`await`) callers.
//!
//! Opening a new connection every time one is needed is both inefficient and
//! can lead to resource exhaustion under load. This pool maintains a bounded
//! set of connections, handing them out for repeated use, aging them out by
//! TTL, and reclaiming capacity correctly across invalidation, expiry, and
//! pool shutdown.
//!
//! The pool is agnostic to the connection type it manages — implementors of
//! [`ManageConnection`] provide the backend-specific logic to create and
//! (optionally) health-check connections.
//!
//! # Example
//!
//! ```ignore
//! use aveza_pool::{ManageConnection, Pool};
//!
//! #[tokio::main]
//! async fn main() {
//!     let manager = MyConnectionManager::new("localhost:1234");
//!     let pool = Pool::builder()
//!         .max_size(10)
//!         .max_ttl(std::time::Duration::from_secs(30))
//!         .build(manager);
//!
//!     let conn = pool.get().await.unwrap();
//!     // use the connection; it returns to the pool when it falls out of scope.
//! }
//! ```
#![deny(missing_docs, missing_debug_implementations)]

mod builder;
mod error;
mod internals;
mod manage;
mod pool;
mod wrapper;

pub use builder::Builder;
pub use error::PoolError;
pub use manage::{ErrorSink, ManageConnection, NopErrorSink};
pub use pool::{Pool, State};
pub use wrapper::PooledConnection;
