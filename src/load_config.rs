/// `load_config` module: reads the YAML settings file into a [`Settings`] value with
/// dotted-key lookup (`sqs.url`, `mongo.dbName`, `redis.port`, ...).
///
/// This module is the only place where the settings file is parsed. It does not know
/// which keys are required: each handler option reads the keys it needs and reports
/// missing ones itself, when (and only when) that backend is requested.
///
/// # Lookup rules
/// - Keys are dotted paths through nested sections, resolved by the `config` crate.
/// - Scalars coerce: numbers and booleans read as strings, numeric strings read as ints.
/// - Absent keys and empty strings both read as `None`.
///
/// # Errors
/// All errors use `anyhow::Error` and are surfaced at the CLI boundary.
use anyhow::{Context, Result};
use config::{Config, File, FileFormat, Source};
use std::fs;
use std::path::Path;
use tracing::{debug, error, info, warn};

/// Settings file looked up in the working directory when `--config` is not given.
pub const DEFAULT_CONFIG_PATH: &str = ".config.yaml";

#[derive(Debug, Clone, Default)]
pub struct Settings {
    inner: Config,
}

impl Settings {
    /// Parse settings from YAML text. An empty document yields empty settings.
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let inner = Config::builder()
            .add_source(File::from_str(content, FileFormat::Yaml))
            .build()
            .context("Failed to parse config YAML")?;
        Ok(Settings { inner })
    }

    /// String at `key`; `None` when absent, empty or not a scalar.
    pub fn get_string(&self, key: &str) -> Option<String> {
        let value = self.inner.get_string(key).ok()?;
        let value = value.trim();
        (!value.is_empty()).then(|| value.to_string())
    }

    /// String at `key`, or `default` when absent.
    pub fn get_string_or(&self, key: &str, default: &str) -> String {
        self.get_string(key).unwrap_or_else(|| default.to_string())
    }

    /// Integer at `key`; `None` when absent or not an integer.
    pub fn get_int(&self, key: &str) -> Option<i64> {
        self.inner.get_int(key).ok()
    }

    pub fn is_empty(&self) -> bool {
        self.inner
            .collect()
            .map(|sections| sections.is_empty())
            .unwrap_or(true)
    }
}

/// Loads the settings file at `path`.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Settings> {
    let path_ref = path.as_ref();
    info!(config_path = ?path_ref, "Loading configuration from file");

    let config_content = match fs::read_to_string(path_ref) {
        Ok(content) => {
            info!(config_path = ?path_ref, "Config file read successfully");
            content
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to read config file");
            return Err(anyhow::anyhow!(
                "Failed to read config file {:?}: {}",
                path_ref,
                e
            ));
        }
    };

    let settings = Settings::from_yaml_str(&config_content)
        .with_context(|| format!("Invalid config file {:?}", path_ref))?;
    debug!(?settings, "Config loaded (full debug)");
    Ok(settings)
}

/// Like [`load_config`], but a missing file yields empty settings.
///
/// Used for the default path: running without a settings file is fine as long as
/// the chosen subcommand needs no backend settings.
pub fn load_config_or_default<P: AsRef<Path>>(path: P) -> Result<Settings> {
    let path_ref = path.as_ref();
    if !path_ref.exists() {
        warn!(config_path = ?path_ref, "No configuration file found; using defaults");
        return Ok(Settings::default());
    }
    load_config(path_ref)
}
