//! Layered configuration.
//!
//! Values come from, in increasing priority:
//! 1. built-in defaults;
//! 2. a configuration file (TOML, YAML or JSON, picked by extension);
//! 3. `SHOWREEL_`-prefixed environment variables, with `__` separating
//!    nested keys (`SHOWREEL_PREFETCH__BATCH_CAP=5`).
//!
//! Durations are plain integers in milliseconds.

pub mod error;

use crate::error::{ErrorKind, Result};
use directories::ProjectDirs;
use exn::{OptionExt, ResultExt};
use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized, Toml, Yaml};
use serde::{Deserialize, Serialize};
use showreel_prefetch::PrefetchConfig;
use std::path::{Path, PathBuf};

pub const ENV_PREFIX: &str = "SHOWREEL_";
const CONFIG_FILE: &str = "showreel.toml";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Catalog file used when a command isn't given one.
    pub catalog: Option<PathBuf>,
    pub storage: StorageConfig,
    pub prefetch: PrefetchConfig,
    /// Default log filter, overridden by `RUST_LOG`.
    pub log: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            catalog: None,
            storage: StorageConfig::default(),
            prefetch: PrefetchConfig::default(),
            log: "info".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory of the persistent store. Defaults to the platform data
    /// directory.
    pub dir: Option<PathBuf>,
    /// Byte quota of the session store, like a browser's storage limit.
    pub session_quota: Option<u64>,
    /// Treat both stores as disabled: reads work, writes are dropped.
    pub read_only: bool,
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("dev", "showreel", "showreel")
}

/// Where the configuration file lives when none is given.
pub fn default_config_file() -> Option<PathBuf> {
    project_dirs().map(|dirs| dirs.config_dir().join(CONFIG_FILE))
}

impl Config {
    /// Build the provider stack without extracting it.
    ///
    /// An explicit `file` must exist. Without one, the default configuration
    /// file is used if present.
    pub fn figment(file: Option<&Path>) -> Result<Figment> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));
        let file = match file {
            Some(path) if !path.is_file() => exn::bail!(ErrorKind::NotFound(path.to_path_buf())),
            Some(path) => Some(path.to_path_buf()),
            None => default_config_file().filter(|path| path.is_file()),
        };
        if let Some(path) = file {
            tracing::debug!(path = %path.display(), "Reading configuration file");
            figment = match path.extension().and_then(|ext| ext.to_str()) {
                Some("toml") => figment.merge(Toml::file_exact(&path)),
                Some("yaml" | "yml") => figment.merge(Yaml::file_exact(&path)),
                Some("json") => figment.merge(Json::file_exact(&path)),
                _ => exn::bail!(ErrorKind::UnsupportedFormat(path)),
            };
        }
        Ok(figment.merge(Env::prefixed(ENV_PREFIX).split("__")))
    }

    /// Load and validate configuration.
    pub fn load(file: Option<&Path>) -> Result<Self> {
        let config: Self = Self::figment(file)?.extract().or_raise(|| ErrorKind::Invalid)?;
        config.prefetch.validate().or_raise(|| ErrorKind::Invalid)?;
        Ok(config)
    }

    /// Absolute directory of the persistent store.
    pub fn storage_dir(&self) -> Result<PathBuf> {
        let dir = self
            .storage
            .dir
            .clone()
            .or_else(|| project_dirs().map(|dirs| dirs.data_dir().join("storage")))
            .ok_or_raise(|| ErrorKind::NoDataDir)?;
        std::path::absolute(&dir).or_raise(|| ErrorKind::NoDataDir)
    }
}
