pub mod cli;
pub mod load_config;
pub mod mongo;
pub mod options;
pub mod redis;
pub mod s3;
pub mod sqs;

pub use cli::{run, Cli, Commands};
