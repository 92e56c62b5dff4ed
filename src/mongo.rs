//! Document store backend on MongoDB.

use async_trait::async_trait;
use mongodb::bson::{doc, Document};
use mongodb::{Client, Database};
use robin_core::contract::DocumentStore;
use robin_core::{BackendKind, HandlerError, HandlerResult};
use tracing::info;

pub struct MongoStore {
    client: Client,
    database: Database,
}

impl MongoStore {
    /// Connect and verify the connection with a `ping` before handing out the store.
    pub async fn connect(uri: &str, db_name: &str) -> HandlerResult<Self> {
        let unavailable = |context: &str, e: mongodb::error::Error| HandlerError::BackendUnavailable {
            kind: BackendKind::DocumentStore,
            message: format!("{context}: {e}"),
        };

        let client = Client::with_uri_str(uri)
            .await
            .map_err(|e| unavailable("failed to connect to MongoDB", e))?;
        let database = client.database(db_name);
        database
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|e| unavailable("failed to ping MongoDB", e))?;

        info!(database = db_name, "Connected to MongoDB");
        Ok(MongoStore { client, database })
    }
}

#[async_trait]
impl DocumentStore for MongoStore {
    async fn insert_document(
        &self,
        collection: &str,
        document: serde_json::Value,
    ) -> HandlerResult<()> {
        let request_error = |message: String| HandlerError::Request {
            kind: BackendKind::DocumentStore,
            message,
        };

        let document: Document = mongodb::bson::to_document(&document)
            .map_err(|e| request_error(format!("document is not representable as BSON: {e}")))?;
        self.database
            .collection::<Document>(collection)
            .insert_one(document)
            .await
            .map_err(|e| request_error(format!("failed to insert document into MongoDB: {e}")))?;

        info!(collection, "Document successfully inserted into MongoDB");
        Ok(())
    }

    async fn close(&self) {
        self.client.clone().shutdown().await;
    }
}
