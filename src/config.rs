//! Configuration for Vestibule
//!
//! CLI arguments and environment variable handling using clap, plus the
//! resolved connection parameters handed to the connection cache.

use clap::Parser;
use std::time::Duration;

use crate::types::{Result, VestibuleError};

/// Upper bound on pooled connections per server
pub const MAX_POOL_SIZE: u32 = 10;

/// How long the driver may spend selecting a server before failing
pub const SERVER_SELECTION_TIMEOUT_MS: u64 = 5000;

/// Socket-level idle timeout, also the ceiling on one establishment attempt
pub const SOCKET_TIMEOUT_MS: u64 = 45000;

/// Database used when the URI does not name one
pub const DEFAULT_DB_NAME: &str = "vestibule";

/// Vestibule - connection cache for credential sign-in services
#[derive(Parser, Debug, Clone)]
#[command(name = "vestibule")]
#[command(about = "Single-flight MongoDB connection cache for sign-in services")]
pub struct Args {
    /// MongoDB connection URI (required)
    #[arg(long, env = "MONGODB_URI")]
    pub mongodb_uri: Option<String>,

    /// MongoDB database name, used when the URI carries none
    #[arg(long, env = "MONGODB_DB", default_value = DEFAULT_DB_NAME)]
    pub mongodb_db: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Log output format (text, json)
    #[arg(long, env = "LOG_FORMAT", default_value = "text")]
    pub log_format: String,
}

impl Args {
    /// Validate configuration
    pub fn validate(&self) -> std::result::Result<(), String> {
        match self.mongodb_uri.as_deref() {
            None => return Err("MONGODB_URI is required".to_string()),
            Some(uri) if uri.trim().is_empty() => {
                return Err("MONGODB_URI must not be blank".to_string())
            }
            Some(_) => {}
        }

        if self.mongodb_db.trim().is_empty() {
            return Err("MONGODB_DB must not be blank".to_string());
        }

        if !matches!(self.log_format.as_str(), "text" | "json") {
            return Err(format!(
                "LOG_FORMAT must be 'text' or 'json', got '{}'",
                self.log_format
            ));
        }

        Ok(())
    }
}

/// Connection parameters fixed at first use.
///
/// Command buffering has no knob here: the Rust driver never queues
/// operations against a dead connection, it fails them immediately.
#[derive(Debug, Clone)]
pub struct ConnectionSettings {
    /// Target MongoDB URI; `None` means the process is misconfigured
    pub uri: Option<String>,
    /// Database name when the URI has no default database
    pub fallback_db: String,
    pub max_pool_size: u32,
    pub server_selection_timeout: Duration,
    pub socket_timeout: Duration,
}

impl ConnectionSettings {
    /// Settings for the given URI with the fixed pool and timeout bounds
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: Some(uri.into()),
            ..Self::unconfigured()
        }
    }

    /// Settings with no target address
    pub fn unconfigured() -> Self {
        Self {
            uri: None,
            fallback_db: DEFAULT_DB_NAME.to_string(),
            max_pool_size: MAX_POOL_SIZE,
            server_selection_timeout: Duration::from_millis(SERVER_SELECTION_TIMEOUT_MS),
            socket_timeout: Duration::from_millis(SOCKET_TIMEOUT_MS),
        }
    }

    pub fn from_args(args: &Args) -> Self {
        Self {
            uri: args.mongodb_uri.clone(),
            fallback_db: args.mongodb_db.clone(),
            ..Self::unconfigured()
        }
    }

    pub fn with_fallback_db(mut self, db_name: impl Into<String>) -> Self {
        self.fallback_db = db_name.into();
        self
    }

    /// The configured target address, or a fatal configuration error
    pub fn target(&self) -> Result<&str> {
        match self.uri.as_deref().map(str::trim) {
            Some(uri) if !uri.is_empty() => Ok(uri),
            _ => Err(VestibuleError::Config(
                "Please define the MONGODB_URI environment variable (or add it to .env)".into(),
            )),
        }
    }
}
