//! Cache backend on Redis.
//!
//! Creating a [`RedisCache`] only parses the address; the server is first contacted
//! by the first command (usually `ping`). The multiplexed connection is opened once
//! and shared by every later command.

use std::time::Duration;

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use robin_core::contract::Cache;
use robin_core::{BackendKind, HandlerError, HandlerResult};
use tokio::sync::OnceCell;
use tracing::{debug, info};

pub struct RedisCache {
    client: redis::Client,
    connection: OnceCell<MultiplexedConnection>,
}

fn request_error(context: &str, e: redis::RedisError) -> HandlerError {
    HandlerError::Request {
        kind: BackendKind::Cache,
        message: format!("{context}: {e}"),
    }
}

impl RedisCache {
    pub fn new(host: &str, port: u16) -> HandlerResult<Self> {
        let client = redis::Client::open(format!("redis://{host}:{port}/")).map_err(|e| {
            HandlerError::Configuration(format!("invalid redis address {host}:{port}: {e}"))
        })?;
        info!(host, port, "Redis client created");
        Ok(RedisCache {
            client,
            connection: OnceCell::new(),
        })
    }

    async fn connection(&self) -> HandlerResult<MultiplexedConnection> {
        let connection = self
            .connection
            .get_or_try_init(|| async {
                debug!("Opening multiplexed Redis connection");
                self.client
                    .get_multiplexed_async_connection()
                    .await
                    .map_err(|e| request_error("failed to connect to Redis", e))
            })
            .await?;
        Ok(connection.clone())
    }
}

#[async_trait]
impl Cache for RedisCache {
    async fn ping(&self) -> HandlerResult<()> {
        let mut conn = self.connection().await?;
        let _pong: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(|e| request_error("failed to ping Redis", e))?;
        Ok(())
    }

    async fn get(&self, key: &str) -> HandlerResult<Option<String>> {
        let mut conn = self.connection().await?;
        let value: Option<String> = conn
            .get(key)
            .await
            .map_err(|e| request_error("failed to get key", e))?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> HandlerResult<()> {
        let mut conn = self.connection().await?;
        let result: redis::RedisResult<()> = match ttl {
            Some(ttl) => conn.set_ex(key, value, ttl.as_secs().max(1)).await,
            None => conn.set(key, value).await,
        };
        result.map_err(|e| request_error("failed to set key", e))
    }
}
