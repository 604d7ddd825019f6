//! Vestibule - connection cache for credential sign-in services
//!
//! Vestibule owns the one piece of a sign-in service that needs real care:
//! the shared MongoDB connection. Every handler asks the cache for a handle;
//! the first request connects, concurrent requests wait on that same attempt,
//! and failures are surfaced without poisoning later retries.
//!
//! ## Modules
//!
//! - **db**: single-flight connection cache, MongoDB connector, event observers
//! - **auth**: typed sign-up / sign-in request contracts
//! - **config**: CLI and environment configuration
//! - **logging**: tracing subscriber setup

pub mod auth;
pub mod config;
pub mod db;
pub mod logging;
pub mod types;

pub use config::{Args, ConnectionSettings};
pub use db::{CacheState, ConnectionCache, Connector, MongoConnectionCache};
pub use types::{Result, VestibuleError};
