//! Single-flight connection cache
//!
//! Hands out one memoized database handle to every collaborator that needs
//! it. The first caller starts the establishment attempt; callers arriving
//! while it is in flight join the same attempt and are all released together
//! when it settles.
//!
//! ## State machine
//!
//! ```text
//! Empty ──acquire──▶ Establishing ──ok──▶ Ready
//!   ▲                     │                 │
//!   └───────err───────────┘                 │
//!   └──────────invalidate / shutdown────────┘
//! ```
//!
//! A failed attempt is never cached: the slot is emptied before the error
//! reaches any caller, so the next `acquire()` starts over. There is no
//! internal retry or backoff; layer that above `acquire()`.
//!
//! ```rust,ignore
//! let cache = Arc::new(ConnectionCache::new(settings, MongoConnector));
//! cache.init()?;
//! let client = cache.acquire().await?;
//! ```

use async_trait::async_trait;
use futures::future::{BoxFuture, FutureExt, Shared};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::config::ConnectionSettings;
use crate::db::events::{ConnectionObserver, LoggingObserver};
use crate::types::{Result, VestibuleError};

/// Establishes connections for the cache.
///
/// The connector owns the transport details; the cache only decides when an
/// attempt runs and who gets its result.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    /// Cheaply clonable handle to an established connection
    type Handle: Clone + Send + Sync + 'static;

    /// Open a connection to `target`, registering `observer` for transport
    /// events on the resulting connection.
    async fn connect(
        &self,
        target: &str,
        settings: &ConnectionSettings,
        observer: Arc<dyn ConnectionObserver>,
    ) -> Result<Self::Handle>;
}

type Attempt<H> = Shared<BoxFuture<'static, Result<H>>>;

enum Slot<H> {
    Empty,
    Establishing { id: u64, attempt: Attempt<H> },
    Ready(H),
}

/// Observable cache state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheState {
    Empty,
    Establishing,
    Ready,
}

/// Memoized, single-flight database connection
pub struct ConnectionCache<C: Connector> {
    connector: Arc<C>,
    settings: ConnectionSettings,
    observer: Arc<dyn ConnectionObserver>,
    slot: Arc<Mutex<Slot<C::Handle>>>,
    attempts: AtomicU64,
}

impl<C: Connector> ConnectionCache<C> {
    /// Create an empty cache that logs connection events
    pub fn new(settings: ConnectionSettings, connector: C) -> Self {
        Self::with_observer(settings, connector, Arc::new(LoggingObserver))
    }

    /// Create an empty cache reporting connection events to `observer`
    pub fn with_observer(
        settings: ConnectionSettings,
        connector: C,
        observer: Arc<dyn ConnectionObserver>,
    ) -> Self {
        Self {
            connector: Arc::new(connector),
            settings,
            observer,
            slot: Arc::new(Mutex::new(Slot::Empty)),
            attempts: AtomicU64::new(0),
        }
    }

    /// Check configuration eagerly at process start.
    ///
    /// Fails with a configuration error when no target address is set.
    pub fn init(&self) -> Result<()> {
        let target = self.settings.target()?;
        debug!("Connection cache configured for {}", target);
        Ok(())
    }

    pub fn settings(&self) -> &ConnectionSettings {
        &self.settings
    }

    /// Number of establishment attempts started so far
    pub fn attempts(&self) -> u64 {
        self.attempts.load(Ordering::SeqCst)
    }

    pub async fn state(&self) -> CacheState {
        match &*self.slot.lock().await {
            Slot::Empty => CacheState::Empty,
            Slot::Establishing { .. } => CacheState::Establishing,
            Slot::Ready(_) => CacheState::Ready,
        }
    }

    pub async fn is_ready(&self) -> bool {
        self.state().await == CacheState::Ready
    }

    /// Get the shared connection handle, establishing it if needed.
    ///
    /// Returns the cached handle without touching the network once ready.
    /// Concurrent callers share one attempt and all observe its outcome.
    /// The attempt runs on its own task: dropping the returned future never
    /// cancels it, and it settles the cache even when nobody is waiting.
    pub async fn acquire(&self) -> Result<C::Handle> {
        let attempt = {
            let mut slot = self.slot.lock().await;
            match &*slot {
                Slot::Ready(handle) => return Ok(handle.clone()),
                Slot::Establishing { id, attempt } => {
                    debug!(attempt = *id, "Joining in-flight MongoDB connection attempt");
                    attempt.clone()
                }
                Slot::Empty => {
                    let target = self.settings.target()?.to_string();
                    let id = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
                    let attempt = self.establish(id, target);
                    *slot = Slot::Establishing {
                        id,
                        attempt: attempt.clone(),
                    };
                    attempt
                }
            }
        };

        attempt.await
    }

    /// Drop a ready handle so the next `acquire()` reconnects.
    ///
    /// Meant for callers that saw an operation fail on a stale connection.
    /// Returns false when there was no ready handle; an in-flight attempt is
    /// left alone.
    pub async fn invalidate(&self) -> bool {
        let mut slot = self.slot.lock().await;
        if matches!(*slot, Slot::Ready(_)) {
            warn!("Invalidating cached MongoDB connection");
            *slot = Slot::Empty;
            true
        } else {
            false
        }
    }

    /// Release the cached handle at process teardown.
    ///
    /// An attempt still in flight settles for its waiters but no longer
    /// repopulates the cache.
    pub async fn shutdown(&self) {
        let mut slot = self.slot.lock().await;
        match &*slot {
            Slot::Empty => {}
            Slot::Establishing { id, .. } => {
                info!(attempt = *id, "Abandoning in-flight MongoDB connection attempt");
            }
            Slot::Ready(_) => info!("Releasing cached MongoDB connection"),
        }
        *slot = Slot::Empty;
    }

    fn establish(&self, id: u64, target: String) -> Attempt<C::Handle> {
        let connector = Arc::clone(&self.connector);
        let settings = self.settings.clone();
        let observer = Arc::clone(&self.observer);
        let slot = Arc::clone(&self.slot);

        // The attempt runs on its own task so it settles even with no waiters.
        let task = tokio::spawn({
            let slot = Arc::clone(&slot);
            async move {
                info!(attempt = id, "Establishing MongoDB connection");
                let outcome = connector.connect(&target, &settings, observer).await;

                // Settle the slot before any waiter sees the outcome.
                let mut slot = slot.lock().await;
                let current = is_current(&*slot, id);
                match &outcome {
                    Ok(handle) => {
                        info!(attempt = id, "MongoDB connection established");
                        if current {
                            *slot = Slot::Ready(handle.clone());
                        }
                    }
                    Err(e) => {
                        error!(attempt = id, "MongoDB connection error: {}", e);
                        if current {
                            *slot = Slot::Empty;
                        }
                    }
                }

                outcome
            }
        });

        async move {
            match task.await {
                Ok(outcome) => outcome,
                Err(e) => {
                    error!(attempt = id, "MongoDB connection task failed: {}", e);
                    let mut slot = slot.lock().await;
                    if is_current(&*slot, id) {
                        *slot = Slot::Empty;
                    }
                    Err(VestibuleError::Internal(format!(
                        "Connection attempt {} aborted: {}",
                        id, e
                    )))
                }
            }
        }
        .boxed()
        .shared()
    }
}

fn is_current<H>(slot: &Slot<H>, id: u64) -> bool {
    matches!(slot, Slot::Establishing { id: pending, .. } if *pending == id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    struct SlowConnector {
        connects: Arc<AtomicUsize>,
        delay: Duration,
        fail: bool,
    }

    #[async_trait]
    impl Connector for SlowConnector {
        type Handle = Arc<usize>;

        async fn connect(
            &self,
            _target: &str,
            _settings: &ConnectionSettings,
            _observer: Arc<dyn ConnectionObserver>,
        ) -> Result<Self::Handle> {
            let n = self.connects.fetch_add(1, Ordering::SeqCst) + 1;
            tokio::time::sleep(self.delay).await;
            if self.fail {
                Err(VestibuleError::Connection("connection refused".into()))
            } else {
                Ok(Arc::new(n))
            }
        }
    }

    fn cache(delay_ms: u64, fail: bool) -> (Arc<ConnectionCache<SlowConnector>>, Arc<AtomicUsize>) {
        let connects = Arc::new(AtomicUsize::new(0));
        let connector = SlowConnector {
            connects: Arc::clone(&connects),
            delay: Duration::from_millis(delay_ms),
            fail,
        };
        let settings = ConnectionSettings::new("mongodb://localhost:27017/testdb");
        (Arc::new(ConnectionCache::new(settings, connector)), connects)
    }

    #[tokio::test]
    async fn test_starts_empty() {
        let (cache, connects) = cache(0, false);
        assert_eq!(cache.state().await, CacheState::Empty);
        assert_eq!(cache.attempts(), 0);
        assert_eq!(connects.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_state_transitions_to_ready() {
        let (cache, _) = cache(20, false);

        let task = tokio::spawn({
            let cache = Arc::clone(&cache);
            async move { cache.acquire().await }
        });
        while cache.attempts() == 0 {
            tokio::task::yield_now().await;
        }
        assert_eq!(cache.state().await, CacheState::Establishing);

        task.await.unwrap().unwrap();
        assert!(cache.is_ready().await);
    }

    #[tokio::test]
    async fn test_failure_empties_slot_before_error_surfaces() {
        let (cache, _) = cache(5, true);
        let err = cache.acquire().await.unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(cache.state().await, CacheState::Empty);
    }

    #[tokio::test]
    async fn test_shutdown_during_attempt_leaves_cache_empty() {
        let (cache, _) = cache(30, false);

        let task = tokio::spawn({
            let cache = Arc::clone(&cache);
            async move { cache.acquire().await }
        });
        while cache.attempts() == 0 {
            tokio::task::yield_now().await;
        }
        cache.shutdown().await;

        // The waiter still gets its handle
        assert!(task.await.unwrap().is_ok());
        // but the abandoned attempt does not repopulate the cache
        assert_eq!(cache.state().await, CacheState::Empty);
    }

    #[tokio::test]
    async fn test_invalidate_only_affects_ready() {
        let (cache, _) = cache(0, false);
        assert!(!cache.invalidate().await);

        cache.acquire().await.unwrap();
        assert!(cache.invalidate().await);
        assert_eq!(cache.state().await, CacheState::Empty);
    }

    struct PanickingConnector;

    #[async_trait]
    impl Connector for PanickingConnector {
        type Handle = Arc<usize>;

        async fn connect(
            &self,
            _target: &str,
            _settings: &ConnectionSettings,
            _observer: Arc<dyn ConnectionObserver>,
        ) -> Result<Self::Handle> {
            panic!("driver bug");
        }
    }

    #[tokio::test]
    async fn test_panicking_attempt_reports_internal_error_and_clears_slot() {
        let settings = ConnectionSettings::new("mongodb://localhost:27017/testdb");
        let cache = ConnectionCache::new(settings, PanickingConnector);

        let err = cache.acquire().await.unwrap_err();
        assert!(matches!(err, VestibuleError::Internal(_)));
        assert_eq!(cache.state().await, CacheState::Empty);
        assert_eq!(cache.attempts(), 1);
    }
}
