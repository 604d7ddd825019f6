//! MongoDB connector and client handle
//!
//! [`MongoConnector`] is the production [`Connector`] behind the connection
//! cache. It applies the fixed pool and timeout bounds, wires the driver's
//! SDAM events into a [`ConnectionObserver`], and verifies the new client
//! with a `ping` before handing it out.

use async_trait::async_trait;
use bson::{doc, Document};
use mongodb::{
    event::{sdam::SdamEvent, EventHandler},
    options::ClientOptions,
    Client, Collection, Database, ServerType,
};
use std::sync::Arc;
use tracing::{debug, info};

use crate::config::ConnectionSettings;
use crate::db::cache::Connector;
use crate::db::events::ConnectionObserver;
use crate::types::{Result, VestibuleError};

/// MongoDB client wrapper
#[derive(Clone, Debug)]
pub struct MongoClient {
    client: Client,
    db_name: String,
}

impl MongoClient {
    /// Handle to the configured database
    pub fn database(&self) -> Database {
        self.client.database(&self.db_name)
    }

    /// Get a typed collection
    pub fn collection<T>(&self, name: &str) -> Collection<T>
    where
        T: Send + Sync,
    {
        self.database().collection::<T>(name)
    }

    /// Round-trip a `ping` command to the server
    pub async fn ping(&self) -> Result<Document> {
        self.database()
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|e| VestibuleError::Connection(format!("MongoDB ping failed: {}", e)))
    }

    /// Get the raw MongoDB client
    pub fn inner(&self) -> &Client {
        &self.client
    }

    /// Get the database name
    pub fn db_name(&self) -> &str {
        &self.db_name
    }
}

/// Opens [`MongoClient`]s for the connection cache
#[derive(Debug, Default, Clone, Copy)]
pub struct MongoConnector;

#[async_trait]
impl Connector for MongoConnector {
    type Handle = MongoClient;

    async fn connect(
        &self,
        target: &str,
        settings: &ConnectionSettings,
        observer: Arc<dyn ConnectionObserver>,
    ) -> Result<MongoClient> {
        info!("Connecting to MongoDB at {}", redact_uri(target));

        let (options, db_name) = client_options(target, settings, observer).await?;

        let client = Client::with_options(options).map_err(|e| {
            VestibuleError::Connection(format!("Failed to create MongoDB client: {}", e))
        })?;

        let handle = MongoClient { client, db_name };

        // Server selection is bounded by the driver; the socket timeout
        // caps the whole round trip.
        tokio::time::timeout(settings.socket_timeout, handle.ping())
            .await
            .map_err(|_| {
                VestibuleError::Connection(format!(
                    "MongoDB ping timed out after {}ms",
                    settings.socket_timeout.as_millis()
                ))
            })??;

        info!("Connected to MongoDB database '{}'", handle.db_name);
        Ok(handle)
    }
}

/// Driver options for `target` with the fixed pool and timeout bounds.
///
/// Returns the options and the database to use: the URI's default database,
/// otherwise the configured fallback. Parsing a non-SRV URI needs no server.
pub async fn client_options(
    target: &str,
    settings: &ConnectionSettings,
    observer: Arc<dyn ConnectionObserver>,
) -> Result<(ClientOptions, String)> {
    let mut options = ClientOptions::parse(target)
        .await
        .map_err(|e| VestibuleError::Connection(format!("Invalid MongoDB URI: {}", e)))?;

    options.max_pool_size = Some(settings.max_pool_size);
    options.server_selection_timeout = Some(settings.server_selection_timeout);
    options.connect_timeout = Some(settings.server_selection_timeout);
    options.max_idle_time = Some(settings.socket_timeout);
    options.sdam_event_handler = Some(observer_handler(observer));

    let db_name = options
        .default_database
        .clone()
        .unwrap_or_else(|| settings.fallback_db.clone());

    Ok((options, db_name))
}

/// Route driver topology events to the observer
fn observer_handler(observer: Arc<dyn ConnectionObserver>) -> EventHandler<SdamEvent> {
    EventHandler::callback(move |event: SdamEvent| match event {
        SdamEvent::ServerHeartbeatFailed(failed) => {
            observer.on_error(&failed.server_address.to_string(), &failed.failure.to_string());
        }
        SdamEvent::ServerDescriptionChanged(changed) => {
            let previous = changed.previous_description.server_type();
            let new = changed.new_description.server_type();
            if lost(previous, new) {
                observer.on_disconnected(&changed.address.to_string());
            }
        }
        SdamEvent::ServerClosed(closed) => {
            observer.on_disconnected(&closed.address.to_string());
        }
        other => debug!("MongoDB topology event: {:?}", other),
    })
}

/// A server that was usable became unknown
fn lost(previous: ServerType, new: ServerType) -> bool {
    !matches!(previous, ServerType::Unknown) && matches!(new, ServerType::Unknown)
}

/// Strip credentials from a URI before logging it
pub fn redact_uri(uri: &str) -> String {
    let Some((scheme, rest)) = uri.split_once("://") else {
        return uri.to_string();
    };
    let authority_end = rest.find('/').unwrap_or(rest.len());
    match rest[..authority_end].rfind('@') {
        Some(at) => format!("{}://***@{}", scheme, &rest[at + 1..]),
        None => uri.to_string(),
    }
}
