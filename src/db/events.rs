//! Connection event observers
//!
//! Connectors report asynchronous transport trouble on an established
//! connection through a [`ConnectionObserver`]. Observers are informational:
//! they never tear down the cache and never trigger a reconnect on their own.

use tracing::{error, warn};

/// Receives transport events for an established connection
pub trait ConnectionObserver: Send + Sync {
    /// A transport error occurred after the connection was established
    fn on_error(&self, address: &str, message: &str);

    /// The server at `address` stopped being reachable
    fn on_disconnected(&self, address: &str);
}

/// Default observer: reports events through tracing
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingObserver;

impl ConnectionObserver for LoggingObserver {
    fn on_error(&self, address: &str, message: &str) {
        error!(address = %address, "MongoDB runtime error: {}", message);
    }

    fn on_disconnected(&self, address: &str) {
        warn!(
            address = %address,
            "MongoDB disconnected; the next failed operation should invalidate the cache"
        );
    }
}
