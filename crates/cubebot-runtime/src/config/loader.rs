//! Configuration loader using figment.
//!
//! # Configuration Priority (lowest to highest)
//!
//! 1. Built-in defaults
//! 2. Config file (`cubebot.toml`, searched in the current directory and the
//!    user config directory, or given explicitly)
//! 3. Environment variables (`CUBE_*`)
//! 4. Programmatic overrides
//!
//! # Environment Variable Mapping
//!
//! Environment variables are mapped using the `CUBE_` prefix with `__` as separator:
//!
//! - `CUBE_BOT__TOKEN=xxx` → `bot.token = "xxx"`
//! - `CUBE_LOGGING__LEVEL=debug` → `logging.level = "debug"`
//! - `CUBE_INTERACTIONS__MODAL_TIMEOUT_SECS=60` → `interactions.modal_timeout_secs = 60`
//!
//! # Example
//!
//! ```rust,ignore
//! use cubebot_runtime::config::ConfigLoader;
//!
//! let config = ConfigLoader::new()
//!     .file("./cubebot.toml")
//!     .load()?;
//! ```

use std::path::{Path, PathBuf};

use figment::Figment;
#[cfg(feature = "toml-config")]
use figment::providers::{Format, Toml};
use figment::providers::{Env, Serialized};
use tracing::{debug, info, trace, warn};

use super::error::{ConfigError, ConfigResult};
use super::schema::CubeConfig;

/// Environment variable prefix.
pub const ENV_PREFIX: &str = "CUBE_";

/// Config file names searched for, in order.
const FILE_NAMES: &[&str] = &["cubebot.toml", "config.toml"];

/// Configuration loader with figment-based multi-source support.
pub struct ConfigLoader {
    overrides: Figment,
    search_paths: Vec<PathBuf>,
    load_env: bool,
    config_file: Option<PathBuf>,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self {
            overrides: Figment::new(),
            search_paths: Vec::new(),
            load_env: true,
            config_file: None,
        }
    }

    /// Adds a search path for configuration files.
    pub fn search_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.search_paths.push(path.as_ref().to_path_buf());
        self
    }

    /// Sets a specific configuration file to load. It must exist.
    pub fn file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_file = Some(path.as_ref().to_path_buf());
        self
    }

    /// Disables loading environment variables.
    pub fn without_env(mut self) -> Self {
        self.load_env = false;
        self
    }

    /// Merges configuration programmatically, above every other source.
    pub fn merge(mut self, config: CubeConfig) -> Self {
        self.overrides = self.overrides.merge(Serialized::defaults(config));
        self
    }

    /// Loads and returns the configuration.
    pub fn load(self) -> ConfigResult<CubeConfig> {
        let figment = self.build_figment()?;
        let config: CubeConfig = figment.extract()?;

        debug!(
            config_dir = %config.storage.config_dir.display(),
            logging_level = %config.logging.level.as_str(),
            "Configuration loaded successfully"
        );
        Ok(config)
    }

    fn build_figment(mut self) -> ConfigResult<Figment> {
        let mut figment = Figment::from(Serialized::defaults(CubeConfig::default()));

        if let Some(path) = self.config_file.take() {
            if !path.exists() {
                return Err(ConfigError::FileNotFound(path));
            }
            info!(path = %path.display(), "Loading configuration file");
            figment = Self::merge_file(figment, &path)?;
        } else {
            figment = self.search_files(figment)?;
        }

        if self.load_env {
            trace!("Loading environment variables with {ENV_PREFIX} prefix");
            figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));
        }

        Ok(figment.merge(self.overrides))
    }

    fn merge_file(figment: Figment, path: &Path) -> ConfigResult<Figment> {
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        match ext {
            #[cfg(feature = "toml-config")]
            "toml" => Ok(figment.merge(Toml::file(path))),
            _ => Err(ConfigError::ParseError(format!(
                "Unsupported or disabled configuration file format: .{ext}"
            ))),
        }
    }

    fn resolve_search_paths(&self) -> Vec<PathBuf> {
        if !self.search_paths.is_empty() {
            return self.search_paths.clone();
        }
        let mut paths = Vec::new();
        if let Ok(cwd) = std::env::current_dir() {
            paths.push(cwd);
        }
        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("cubebot"));
        }
        paths
    }

    fn search_files(&self, figment: Figment) -> ConfigResult<Figment> {
        for dir in self.resolve_search_paths() {
            for name in FILE_NAMES {
                let path = dir.join(name);
                if path.exists() {
                    info!(path = %path.display(), "Loading configuration file");
                    return Self::merge_file(figment, &path);
                }
            }
        }
        warn!("No configuration file found, using defaults");
        Ok(figment)
    }
}

// =============================================================================
// Tests
// =============================================================================
