//! Handler options backed by real clients.
//!
//! Each option captures the settings it needs when it is created, and validates them
//! in [`HandlerOption::build`] before any network call. A missing or invalid setting
//! is a [`HandlerError::Configuration`] naming the settings key.
//!
//! | option | required keys | optional keys (default) |
//! |---|---|---|
//! | [`SqsOption`] | `sqs.url` | `sqs.region` (`us-east-1`), `sqs.profile` (`aws`) |
//! | [`S3Option`] | `s3.bucket`, `s3.endpoint` | `s3.region` (`us-east-1`), `s3.profile` (`linode`) |
//! | [`MongoOption`] | `mongo.uri`, `mongo.dbName` | |
//! | [`RedisOption`] | `redis.port` | `redis.host` (`localhost`) |

use std::sync::Arc;

use async_trait::async_trait;
use robin_core::handler::{Backend, HandlerOption};
use robin_core::{BackendKind, HandlerError, HandlerResult};

use crate::load_config::Settings;
use crate::mongo::MongoStore;
use crate::redis::RedisCache;
use crate::s3::S3Store;
use crate::sqs::SqsQueue;

const DEFAULT_REGION: &str = "us-east-1";

fn required(value: &Option<String>, key: &str) -> HandlerResult<String> {
    value
        .clone()
        .ok_or_else(|| HandlerError::Configuration(format!("{key} must be set in the config file")))
}

#[derive(Debug, Clone)]
pub struct SqsOption {
    url: Option<String>,
    region: String,
    profile: String,
}

impl SqsOption {
    pub fn from_settings(settings: &Settings) -> Self {
        SqsOption {
            url: settings.get_string("sqs.url"),
            region: settings.get_string_or("sqs.region", DEFAULT_REGION),
            profile: settings.get_string_or("sqs.profile", "aws"),
        }
    }
}

#[async_trait]
impl HandlerOption for SqsOption {
    fn kind(&self) -> BackendKind {
        BackendKind::Queue
    }

    async fn build(&self) -> HandlerResult<Backend> {
        let url = required(&self.url, "sqs.url")?;
        let queue = SqsQueue::connect(&url, &self.region, &self.profile).await;
        println!("SQS client successfully initialized for queue: {}", queue.queue_url());
        Ok(Backend::Queue(Arc::new(queue)))
    }
}

#[derive(Debug, Clone)]
pub struct S3Option {
    bucket: Option<String>,
    endpoint: Option<String>,
    region: String,
    profile: String,
}

impl S3Option {
    pub fn from_settings(settings: &Settings) -> Self {
        S3Option {
            bucket: settings.get_string("s3.bucket"),
            endpoint: settings.get_string("s3.endpoint"),
            region: settings.get_string_or("s3.region", DEFAULT_REGION),
            profile: settings.get_string_or("s3.profile", "linode"),
        }
    }
}

#[async_trait]
impl HandlerOption for S3Option {
    fn kind(&self) -> BackendKind {
        BackendKind::ObjectStore
    }

    async fn build(&self) -> HandlerResult<Backend> {
        let endpoint = required(&self.endpoint, "s3.endpoint")?;
        let bucket = required(&self.bucket, "s3.bucket")?;
        let store = S3Store::connect(&bucket, &endpoint, &self.region, &self.profile).await;
        println!("S3 client successfully initialized for bucket: {}", store.bucket());
        Ok(Backend::ObjectStore(Arc::new(store)))
    }
}

#[derive(Debug, Clone)]
pub struct MongoOption {
    uri: Option<String>,
    db_name: Option<String>,
}

impl MongoOption {
    pub fn from_settings(settings: &Settings) -> Self {
        MongoOption {
            uri: settings.get_string("mongo.uri"),
            db_name: settings
                .get_string("mongo.dbName")
                .or_else(|| settings.get_string("mongo.dbname")),
        }
    }
}

#[async_trait]
impl HandlerOption for MongoOption {
    fn kind(&self) -> BackendKind {
        BackendKind::DocumentStore
    }

    async fn build(&self) -> HandlerResult<Backend> {
        let uri = required(&self.uri, "mongo.uri")?;
        let db_name = required(&self.db_name, "mongo.dbName")?;
        let store = MongoStore::connect(&uri, &db_name).await?;
        println!("MongoDB client successfully initialized");
        Ok(Backend::DocumentStore(Arc::new(store)))
    }
}

#[derive(Debug, Clone)]
pub struct RedisOption {
    host: String,
    port: Option<i64>,
}

impl RedisOption {
    pub fn from_settings(settings: &Settings) -> Self {
        RedisOption {
            host: settings.get_string_or("redis.host", "localhost"),
            port: settings.get_int("redis.port"),
        }
    }
}

#[async_trait]
impl HandlerOption for RedisOption {
    fn kind(&self) -> BackendKind {
        BackendKind::Cache
    }

    async fn build(&self) -> HandlerResult<Backend> {
        let port = self
            .port
            .filter(|port| *port != 0)
            .ok_or_else(|| {
                HandlerError::Configuration("redis.port is not set or invalid".to_string())
            })?;
        let port = u16::try_from(port).map_err(|_| {
            HandlerError::Configuration(format!("redis.port {port} is out of range"))
        })?;
        let cache = RedisCache::new(&self.host, port)?;
        println!("Redis client created on port {port}");
        Ok(Backend::Cache(Arc::new(cache)))
    }
}
