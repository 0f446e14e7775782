//! The wait between attempts.
//!
//! Backoff waits run on the caller's task. Dropping the executor's future
//! (for example when a surrounding `tokio::time::timeout` fires) aborts the wait.

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Boxed future returned by [`Sleeper::sleep`].
pub type SleepFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

/// Waits out a backoff delay. Installed with [`crate::ExecutorBuilder::sleeper`].
pub trait Sleeper: Send + Sync + std::fmt::Debug {
    fn sleep(&self, delay: Duration) -> SleepFuture;
}

/// Waits on the tokio timer. The default.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioSleeper;

impl Sleeper for TokioSleeper {
    fn sleep(&self, delay: Duration) -> SleepFuture {
        Box::pin(tokio::time::sleep(delay))
    }
}

/// Records every requested backoff delay instead of waiting.
///
/// Clones share one record: keep a handle, give a clone to the executor, and
/// inspect [`TrackingSleeper::calls`] after the call.
#[derive(Debug, Clone, Default)]
pub struct TrackingSleeper {
    delays: Arc<Mutex<Vec<Duration>>>,
}

impl TrackingSleeper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delays requested so far, oldest first.
    pub fn calls(&self) -> Vec<Duration> {
        self.delays
            .lock()
            .map(|delays| delays.clone())
            .unwrap_or_default()
    }

    /// Sum of all requested delays.
    pub fn total(&self) -> Duration {
        self.calls().into_iter().sum()
    }
}

impl Sleeper for TrackingSleeper {
    fn sleep(&self, delay: Duration) -> SleepFuture {
        if let Ok(mut delays) = self.delays.lock() {
            delays.push(delay);
        }
        Box::pin(std::future::ready(()))
    }
}
