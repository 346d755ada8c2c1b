//! JSON-file backed module configuration.
//!
//! A [`ConfigBag`] owns one file under the configuration directory. Its
//! initializer loads the file at startup; handlers then read and mutate the
//! in-memory copy and persist it with [`ConfigBag::save`].
//!
//! Loading favours availability: a missing or unparsable file is logged and
//! treated as `{}`, and contents that do not match `T` leave the bag unloaded
//! so that only the handlers using it fail. Reserved keys are the exception
//! and abort startup.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::{debug, error, warn};

use crate::error::ConfigBagError;
use crate::initializer::Initializer;

/// Keys a configuration file may not define.
pub const RESERVED_KEYS: &[&str] = &["run", "save"];

/// Typed, persisted configuration for one module.
pub struct ConfigBag<T> {
    file: String,
    path: RwLock<Option<PathBuf>>,
    value: RwLock<Option<T>>,
}

impl<T> ConfigBag<T>
where
    T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
{
    /// Creates an unloaded bag backed by `file` inside the config directory.
    pub fn new(file: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            path: RwLock::new(None),
            value: RwLock::new(None),
        }
    }

    pub fn file(&self) -> &str {
        &self.file
    }

    /// Returns an initializer that loads this bag.
    pub fn initializer(self: &Arc<Self>) -> Initializer {
        let bag = Arc::clone(self);
        Initializer::new(format!("config:{}", self.file), move |ctx| {
            let bag = Arc::clone(&bag);
            async move {
                bag.load(ctx.config_dir()).await?;
                Ok(())
            }
        })
    }

    /// Loads the file from `config_dir`.
    pub async fn load(&self, config_dir: &Path) -> Result<(), ConfigBagError> {
        let path = config_dir.join(&self.file);
        let object = match tokio::fs::read_to_string(&path).await {
            Ok(text) => match serde_json::from_str::<Value>(&text) {
                Ok(Value::Object(map)) => map,
                Ok(_) => {
                    error!(file = %self.file, "Configuration is not a JSON object");
                    Map::new()
                }
                Err(e) => {
                    error!(file = %self.file, error = %e, "Failed to parse configuration");
                    Map::new()
                }
            },
            Err(e) => {
                error!(file = %self.file, error = %e, "Failed to read configuration");
                Map::new()
            }
        };
        self.load_object(path, object)
    }

    /// Installs already-parsed contents.
    pub fn load_object(&self, path: PathBuf, object: Map<String, Value>) -> Result<(), ConfigBagError> {
        if let Some(key) = RESERVED_KEYS.iter().find(|k| object.contains_key(**k)) {
            return Err(ConfigBagError::ReservedKey {
                key: (*key).to_string(),
                file: self.file.clone(),
            });
        }

        *self.path.write() = Some(path);
        match serde_json::from_value::<T>(Value::Object(object)) {
            Ok(value) => {
                debug!(file = %self.file, "Configuration loaded");
                *self.value.write() = Some(value);
            }
            Err(e) => {
                warn!(file = %self.file, error = %e, "Configuration does not match the expected shape");
                *self.value.write() = None;
            }
        }
        Ok(())
    }

    pub fn is_loaded(&self) -> bool {
        self.value.read().is_some()
    }

    /// Returns a snapshot of the current contents.
    pub fn get(&self) -> Result<T, ConfigBagError> {
        self.value.read().clone().ok_or_else(|| self.not_loaded())
    }

    /// Mutates the contents in place.
    ///
    /// Changes stay in memory until [`save`](Self::save) is called.
    pub fn update<R>(&self, f: impl FnOnce(&mut T) -> R) -> Result<R, ConfigBagError> {
        let mut guard = self.value.write();
        let value = guard.as_mut().ok_or_else(|| self.not_loaded())?;
        Ok(f(value))
    }

    /// Replaces the contents wholesale.
    pub fn replace(&self, value: T) {
        *self.value.write() = Some(value);
    }

    /// Writes the contents back to disk as 4-space indented JSON.
    pub async fn save(&self) -> Result<(), ConfigBagError> {
        let path = self.path.read().clone().ok_or_else(|| self.not_loaded())?;
        let value = self.get()?;

        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
        value
            .serialize(&mut serializer)
            .map_err(|source| ConfigBagError::Serialize {
                file: self.file.clone(),
                source,
            })?;

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| self.io_error(source))?;
        }
        tokio::fs::write(&path, buf)
            .await
            .map_err(|source| self.io_error(source))?;
        debug!(file = %self.file, "Configuration saved");
        Ok(())
    }

    fn not_loaded(&self) -> ConfigBagError {
        ConfigBagError::NotLoaded {
            file: self.file.clone(),
        }
    }

    fn io_error(&self, source: std::io::Error) -> ConfigBagError {
        ConfigBagError::Io {
            file: self.file.clone(),
            source,
        }
    }
}

impl<T> std::fmt::Debug for ConfigBag<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigBag")
            .field("file", &self.file)
            .field("loaded", &self.value.read().is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Settings {
        channel: Option<String>,
        #[serde(default)]
        count: u32,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    struct Strict {
        title: String,
    }

    #[tokio::test]
    async fn test_missing_file_loads_as_empty_object() {
        let dir = tempfile::tempdir().unwrap();
        let bag = ConfigBag::<Settings>::new("settings.json");

        bag.load(dir.path()).await.unwrap();
        assert_eq!(
            bag.get().unwrap(),
            Settings {
                channel: None,
                count: 0
            }
        );
    }

    #[tokio::test]
    async fn test_reserved_key_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("settings.json"), r#"{"save": 1}"#).unwrap();
        let bag = ConfigBag::<Settings>::new("settings.json");

        let err = bag.load(dir.path()).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "Cannot use the reserved property save in settings.json"
        );
    }

    #[tokio::test]
    async fn test_shape_mismatch_fails_at_use() {
        let dir = tempfile::tempdir().unwrap();
        let bag = ConfigBag::<Strict>::new("strict.json");

        bag.load(dir.path()).await.unwrap();
        assert!(!bag.is_loaded());
        assert!(matches!(bag.get(), Err(ConfigBagError::NotLoaded { .. })));
    }

    #[tokio::test]
    async fn test_update_and_save_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("nested");
        let bag = ConfigBag::<Settings>::new("settings.json");
        bag.load(&nested).await.unwrap();

        bag.update(|s| s.channel = Some("c-1".into())).unwrap();
        bag.save().await.unwrap();

        let text = std::fs::read_to_string(nested.join("settings.json")).unwrap();
        assert!(text.contains("\n    \"channel\": \"c-1\""));

        let reloaded = ConfigBag::<Settings>::new("settings.json");
        reloaded.load(&nested).await.unwrap();
        assert_eq!(reloaded.get().unwrap().channel.as_deref(), Some("c-1"));
    }

    #[tokio::test]
    async fn test_initializer_loads_bag() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("settings.json"), r#"{"count": 3}"#).unwrap();
        let bag = Arc::new(ConfigBag::<Settings>::new("settings.json"));

        let init = bag.initializer();
        assert_eq!(init.name(), "config:settings.json");
        init.run(Arc::new(crate::initializer::InitContext::new(dir.path())))
            .await
            .unwrap();
        assert_eq!(bag.get().unwrap().count, 3);
    }
}
