use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use aveza_pool::{ErrorSink, ManageConnection};

/// The error a [`StubManager`] returns once its failure threshold is hit.
#[derive(Debug, thiserror::Error)]
#[error("stub provider failed on creation #{0}")]
pub struct StubError(pub usize);

/// A fake connection whose drop is observable, standing in for the raw I/O
/// stream a real `ManageConnection` would hand out.
pub struct StubConnection {
    pub id: usize,
    drops: Arc<AtomicUsize>,
}

impl Drop for StubConnection {
    fn drop(&mut self) {
        self.drops.fetch_add(1, Ordering::SeqCst);
    }
}

/// A [`ManageConnection`] that counts creations and drops, and can be
/// programmed to fail on a specific, 1-indexed creation attempt.
#[derive(Debug, Default)]
pub struct StubManager {
    pub created: Arc<AtomicUsize>,
    pub drops: Arc<AtomicUsize>,
    pub invalidated: Arc<AtomicUsize>,
    pub fail_on_attempt: Option<usize>,
}

impl StubManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_on(attempt: usize) -> Self {
        StubManager {
            fail_on_attempt: Some(attempt),
            ..Default::default()
        }
    }

    pub fn created_count(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    pub fn drop_count(&self) -> usize {
        self.drops.load(Ordering::SeqCst)
    }

    pub fn invalidated_count(&self) -> usize {
        self.invalidated.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ManageConnection for StubManager {
    type Connection = StubConnection;
    type Error = StubError;

    async fn connect(&self) -> Result<Self::Connection, Self::Error> {
        let attempt = self.created.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_on_attempt == Some(attempt) {
            return Err(StubError(attempt));
        }
        Ok(StubConnection {
            id: attempt,
            drops: self.drops.clone(),
        })
    }

    async fn is_valid(&self, _conn: &mut Self::Connection) -> Result<(), Self::Error> {
        Ok(())
    }

    fn has_broken(&self, _conn: &mut Self::Connection) -> bool {
        false
    }

    async fn invalidate_connection(&self, conn: Self::Connection) -> Result<(), Self::Error> {
        self.invalidated.fetch_add(1, Ordering::SeqCst);
        drop(conn);
        Ok(())
    }
}

/// A [`ManageConnection`] whose `invalidate_connection` hook always fails,
/// for exercising the `ErrorSink` escape hatch.
#[derive(Debug, Default)]
pub struct PoisonOnInvalidateManager {
    pub created: Arc<AtomicUsize>,
}

impl PoisonOnInvalidateManager {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ManageConnection for PoisonOnInvalidateManager {
    type Connection = StubConnection;
    type Error = StubError;

    async fn connect(&self) -> Result<Self::Connection, Self::Error> {
        let attempt = self.created.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(StubConnection {
            id: attempt,
            drops: Arc::new(AtomicUsize::new(0)),
        })
    }

    async fn is_valid(&self, _conn: &mut Self::Connection) -> Result<(), Self::Error> {
        Ok(())
    }

    fn has_broken(&self, _conn: &mut Self::Connection) -> bool {
        false
    }

    async fn invalidate_connection(&self, conn: Self::Connection) -> Result<(), Self::Error> {
        let id = conn.id;
        drop(conn);
        Err(StubError(id))
    }
}

/// An [`ErrorSink`] that collects every error it receives, for assertions.
#[derive(Debug, Clone, Default)]
pub struct CollectingErrorSink {
    pub errors: Arc<Mutex<Vec<String>>>,
}

impl CollectingErrorSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self) -> usize {
        self.errors.lock().unwrap().len()
    }
}

impl ErrorSink<StubError> for CollectingErrorSink {
    fn sink(&self, error: StubError) {
        self.errors.lock().unwrap().push(error.to_string());
    }

    fn boxed_clone(&self) -> Box<dyn ErrorSink<StubError>> {
        Box::new(self.clone())
    }
}
