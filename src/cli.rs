///
/// This module implements the CLI interface for robin: command parsing, settings
/// loading, and one handler composition per subcommand.
///
/// Every subcommand follows the same shape: load settings, build a handler from the
/// options it needs, run one operation (or the watch loop), then close the handler.
/// All domain logic lives in [`robin_core`]; this module only wires it up.
///
/// ## How To Use
/// - For command-line users: run the `robin` binary with `--help`.
/// - For programmatic/integration use: call [`run`] with a constructed [`Cli`].
///
/// ## Extending
/// Add a variant to [`Commands`], pick the options it needs from [`crate::options`],
/// and keep non-trivial behaviour inside `robin-core`.
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use robin_core::handler::{Handler, HandlerBuilder};
use robin_core::{ConsoleReporter, PollOutcome, ReceiveParams};
use tokio_util::sync::CancellationToken;

use crate::load_config::{load_config, load_config_or_default, Settings, DEFAULT_CONFIG_PATH};
use crate::options::{MongoOption, RedisOption, S3Option, SqsOption};

/// CLI for robin: compose cloud clients behind one handler and watch a queue.
#[derive(Parser)]
#[clap(
    name = "robin",
    version,
    about = "Compose queue, object store, document store and cache clients, and watch a queue for messages"
)]
pub struct Cli {
    /// Path to the YAML settings file [default: .config.yaml]
    #[clap(long, global = true)]
    pub config: Option<PathBuf>,

    #[clap(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create a handler with no backends
    Handler,
    /// Create a handler with an SQS client
    Sqs,
    /// Create a handler with an S3 client
    S3,
    /// Receive and process messages from the SQS queue once
    Getmsg {
        #[clap(flatten)]
        receive: ReceiveArgs,
    },
    /// Check the SQS queue every INTERVAL seconds until interrupted
    Watch {
        /// Seconds between two checks
        #[clap(long, short = 't', default_value_t = 5, value_parser = clap::value_parser!(u64).range(1..))]
        interval: u64,
        #[clap(flatten)]
        receive: ReceiveArgs,
    },
    /// List every object in the S3 bucket with its version id
    Versions {
        /// Print the listing as JSON
        #[clap(long)]
        json: bool,
    },
    /// Create a handler with a MongoDB client
    Mongo,
    /// Insert one JSON document into a MongoDB collection
    Insert {
        #[clap(long)]
        collection: String,
        /// The document, as a JSON object
        #[clap(long)]
        json: String,
    },
    /// Ping Redis
    Redis,
    /// Read or write a Redis entry
    Cache {
        #[clap(subcommand)]
        action: CacheAction,
    },
}

#[derive(Subcommand)]
pub enum CacheAction {
    /// Print the value stored under KEY
    Get { key: String },
    /// Store VALUE under KEY
    Set {
        key: String,
        value: String,
        /// Expiry in seconds
        #[clap(long)]
        ttl: Option<u64>,
    },
}

/// Receive parameters shared by `getmsg` and `watch`, bounded by what SQS accepts.
#[derive(Args, Debug, Clone, Copy)]
pub struct ReceiveArgs {
    /// Seconds a received message stays hidden from other consumers
    #[clap(long, default_value_t = 30, value_parser = clap::value_parser!(i32).range(0..=43_200))]
    pub visibility_timeout: i32,
    /// Seconds to wait for a message before returning empty
    #[clap(long, default_value_t = 10, value_parser = clap::value_parser!(i32).range(0..=20))]
    pub wait_time: i32,
    /// Maximum number of messages per receive
    #[clap(long, default_value_t = 1, value_parser = clap::value_parser!(i32).range(1..=10))]
    pub max_messages: i32,
}

impl From<ReceiveArgs> for ReceiveParams {
    fn from(args: ReceiveArgs) -> Self {
        ReceiveParams {
            visibility_timeout: args.visibility_timeout,
            wait_time: args.wait_time,
            max_messages: args.max_messages,
        }
    }
}

async fn build(builder: HandlerBuilder) -> Result<Handler> {
    let handler = builder
        .build()
        .await
        .context("failed to initialize handler")?;
    println!("Successfully created handler instance!");
    Ok(handler)
}

/// Extracted async CLI logic entrypoint for integration tests and main()
pub async fn run(cli: Cli) -> Result<()> {
    // Emit a top-level 'trace_initialised' event at the very start
    tracing::info!("trace_initialised");

    let Some(command) = cli.command else {
        println!("running robin...\n for options: robin --help");
        return Ok(());
    };

    let settings = match &cli.config {
        Some(path) => load_config(path)?,
        None => load_config_or_default(DEFAULT_CONFIG_PATH)?,
    };

    execute(command, &settings).await
}

async fn execute(command: Commands, settings: &Settings) -> Result<()> {
    match command {
        Commands::Handler => {
            let mut handler = build(Handler::builder()).await?;
            handler.shutdown().await;
            Ok(())
        }
        Commands::Sqs => {
            let mut handler = build(Handler::builder().with(SqsOption::from_settings(settings)))
                .await
                .context("failed to initialize SQS client")?;
            handler.shutdown().await;
            Ok(())
        }
        Commands::S3 => {
            let mut handler = build(Handler::builder().with(S3Option::from_settings(settings)))
                .await
                .context("failed to initialize S3 client")?;
            handler.shutdown().await;
            Ok(())
        }
        Commands::Getmsg { receive } => {
            let mut handler =
                build(Handler::builder().with(SqsOption::from_settings(settings))).await?;
            let result = handler.receive_message(&receive.into()).await;
            handler.shutdown().await;
            match result.context("error while receiving message")? {
                PollOutcome::ItemsProcessed(_) => {
                    println!("Message successfully received and processed.")
                }
                _ => println!("No messages found in the queue."),
            }
            Ok(())
        }
        Commands::Watch { interval, receive } => {
            let mut handler =
                build(Handler::builder().with(SqsOption::from_settings(settings))).await?;

            let cancel = CancellationToken::new();
            let signal_token = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    tracing::info!("Interrupt received, stopping after the current poll");
                    signal_token.cancel();
                }
            });

            println!("Starting periodic check on queue every {interval}s...");
            let result = handler
                .watch(
                    Duration::from_secs(interval),
                    receive.into(),
                    ConsoleReporter,
                    cancel,
                )
                .await;
            handler.shutdown().await;
            result.context("watch stopped")?;
            println!("Stopped watching the queue.");
            Ok(())
        }
        Commands::Versions { json } => {
            let mut handler =
                build(Handler::builder().with(S3Option::from_settings(settings))).await?;
            let result = handler.list_object_versions().await;
            handler.shutdown().await;
            let objects = result.context("failed to list object versions")?;
            if json {
                println!("{}", serde_json::to_string_pretty(&objects)?);
            } else {
                println!("Objects in bucket with their version IDs:");
                for object in &objects {
                    println!(" - Key: {}, Version ID: {}", object.key, object.version_id);
                }
            }
            Ok(())
        }
        Commands::Mongo => {
            let mut handler =
                build(Handler::builder().with(MongoOption::from_settings(settings))).await?;
            handler.shutdown().await;
            Ok(())
        }
        Commands::Insert { collection, json } => {
            let document: serde_json::Value =
                serde_json::from_str(&json).context("--json is not valid JSON")?;
            let mut handler =
                build(Handler::builder().with(MongoOption::from_settings(settings))).await?;
            let result = handler.insert_document(&collection, document).await;
            handler.shutdown().await;
            result.context("failed to insert document")?;
            println!("Document successfully inserted into {collection}.");
            Ok(())
        }
        Commands::Redis => {
            let mut handler =
                build(Handler::builder().with(RedisOption::from_settings(settings))).await?;
            let result = handler.cache_ping().await;
            handler.shutdown().await;
            result.context("failed to connect to Redis")?;
            println!("Successfully connected to Redis!");
            Ok(())
        }
        Commands::Cache { action } => {
            let mut handler =
                build(Handler::builder().with(RedisOption::from_settings(settings))).await?;
            let result = match &action {
                CacheAction::Get { key } => handler.cache_get(key).await.map(|value| {
                    match value {
                        Some(value) => println!("{value}"),
                        None => println!("(nil)"),
                    }
                }),
                CacheAction::Set { key, value, ttl } => handler
                    .cache_set(key, value, ttl.map(Duration::from_secs))
                    .await
                    .map(|()| println!("OK")),
            };
            handler.shutdown().await;
            result.context("cache command failed")?;
            Ok(())
        }
    }
}
