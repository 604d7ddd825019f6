//! Database access for Vestibule
//!
//! - [`cache`]: single-flight, memoized connection cache
//! - [`events`]: observers for transport events on an established connection
//! - [`mongo`]: MongoDB connector and client handle

pub mod cache;
pub mod events;
pub mod mongo;

pub use cache::{CacheState, ConnectionCache, Connector};
pub use events::{ConnectionObserver, LoggingObserver};
pub use mongo::{MongoClient, MongoConnector};

/// The cache as wired in production
pub type MongoConnectionCache = ConnectionCache<MongoConnector>;
