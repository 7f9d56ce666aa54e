//! Template persistence.
//!
//! Frame configurations can be saved under a name and restored later. The
//! backing store is a tiny string key-value abstraction so the same template
//! logic runs against an in-memory quota-limited store (tests) or a
//! file-per-key directory store.

use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::{
    config::FrameConfig,
    foundation::error::{SquarepostError, SquarepostResult},
};

/// Store key holding the saved template list.
pub const TEMPLATES_KEY: &str = "watermarkTemplates";
/// Store key holding the active frame configuration.
pub const ACTIVE_CONFIG_KEY: &str = "watermarkConfig";
/// Suggested filename for a settings export.
pub const DEFAULT_EXPORT_NAME: &str = "watermark-configurations.json";

/// Minimal string key-value storage. `set` may fail with
/// [`SquarepostError::StorageFull`] when a quota is exhausted.
pub trait KvStore {
    fn get(&self, key: &str) -> SquarepostResult<Option<String>>;
    fn set(&mut self, key: &str, value: &str) -> SquarepostResult<()>;
    fn remove(&mut self, key: &str) -> SquarepostResult<()>;
}

/// In-memory store with an optional byte quota over keys plus values.
#[derive(Debug, Default)]
pub struct MemoryKvStore {
    entries: HashMap<String, String>,
    quota_bytes: Option<usize>,
}

impl MemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_quota(quota_bytes: usize) -> Self {
        Self {
            entries: HashMap::new(),
            quota_bytes: Some(quota_bytes),
        }
    }

    fn used_bytes_excluding(&self, key: &str) -> usize {
        self.entries
            .iter()
            .filter(|(k, _)| k.as_str() != key)
            .map(|(k, v)| k.len() + v.len())
            .sum()
    }
}

impl KvStore for MemoryKvStore {
    fn get(&self, key: &str) -> SquarepostResult<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> SquarepostResult<()> {
        if let Some(quota) = self.quota_bytes {
            let needed = self.used_bytes_excluding(key) + key.len() + value.len();
            if needed > quota {
                return Err(SquarepostError::storage_full(format!(
                    "{needed} bytes needed, quota is {quota}"
                )));
            }
        }
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> SquarepostResult<()> {
        self.entries.remove(key);
        Ok(())
    }
}

/// File-per-key store rooted at a directory.
#[derive(Debug)]
pub struct FsKvStore {
    root: PathBuf,
}

impl FsKvStore {
    pub fn new(root: impl Into<PathBuf>) -> SquarepostResult<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)
            .map_err(|e| SquarepostError::Other(anyhow::Error::new(e)))?;
        Ok(Self { root })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(format!("{key}.json"))
    }
}

impl KvStore for FsKvStore {
    fn get(&self, key: &str) -> SquarepostResult<Option<String>> {
        match std::fs::read_to_string(self.path_for(key)) {
            Ok(s) => Ok(Some(s)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(SquarepostError::Other(anyhow::Error::new(e))),
        }
    }

    fn set(&mut self, key: &str, value: &str) -> SquarepostResult<()> {
        match std::fs::write(self.path_for(key), value) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::StorageFull => Err(
                SquarepostError::storage_full(format!("writing key {key:?}")),
            ),
            Err(e) => Err(SquarepostError::Other(anyhow::Error::new(e))),
        }
    }

    fn remove(&mut self, key: &str) -> SquarepostResult<()> {
        match std::fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(SquarepostError::Other(anyhow::Error::new(e))),
        }
    }
}

/// One saved template. The list is kept oldest-first so quota eviction can
/// drop the front.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct TemplateEntry {
    pub name: String,
    pub config: FrameConfig,
}

/// Serialized shape of a full settings export.
#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
struct SettingsExport {
    templates: BTreeMap<String, FrameConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    current_config: Option<FrameConfig>,
}

/// Named-template CRUD over any [`KvStore`].
pub struct TemplateStore<S: KvStore> {
    store: S,
}

impl<S: KvStore> TemplateStore<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn into_inner(self) -> S {
        self.store
    }

    /// Saved templates, oldest first.
    pub fn templates(&self) -> SquarepostResult<Vec<TemplateEntry>> {
        match self.store.get(TEMPLATES_KEY)? {
            Some(raw) => serde_json::from_str(&raw)
                .map_err(|e| SquarepostError::Other(anyhow::Error::new(e))),
            None => Ok(Vec::new()),
        }
    }

    pub fn get_template(&self, name: &str) -> SquarepostResult<Option<FrameConfig>> {
        Ok(self
            .templates()?
            .into_iter()
            .find(|t| t.name == name)
            .map(|t| t.config))
    }

    /// Save `config` under `name`, replacing any template with the same name.
    ///
    /// When the backing store reports it is full, the oldest template is
    /// evicted and the write retried once before the error surfaces.
    pub fn save_template(&mut self, name: &str, config: &FrameConfig) -> SquarepostResult<()> {
        if name.trim().is_empty() {
            return Err(SquarepostError::validation("template name must not be empty"));
        }

        let mut entries = self.templates()?;
        entries.retain(|t| t.name != name);
        entries.push(TemplateEntry {
            name: name.to_string(),
            config: config.clone(),
        });

        match self.write_templates(&entries) {
            Err(SquarepostError::StorageFull(_)) if entries.len() > 1 => {
                let evicted = entries.remove(0);
                tracing::warn!(name = %evicted.name, "storage full, evicting oldest template");
                self.write_templates(&entries)
            }
            other => other,
        }
    }

    /// Drop the oldest saved template. Returns false when none are saved.
    fn evict_oldest(&mut self) -> SquarepostResult<bool> {
        let mut entries = self.templates()?;
        if entries.is_empty() {
            return Ok(false);
        }
        let evicted = entries.remove(0);
        tracing::warn!(name = %evicted.name, "storage full, evicting oldest template");
        self.write_templates(&entries)?;
        Ok(true)
    }

    pub fn delete_template(&mut self, name: &str) -> SquarepostResult<()> {
        let mut entries = self.templates()?;
        let before = entries.len();
        entries.retain(|t| t.name != name);
        if entries.len() == before {
            return Ok(());
        }
        self.write_templates(&entries)
    }

    pub fn active_config(&self) -> SquarepostResult<Option<FrameConfig>> {
        match self.store.get(ACTIVE_CONFIG_KEY)? {
            Some(raw) => serde_json::from_str(&raw)
                .map(Some)
                .map_err(|e| SquarepostError::Other(anyhow::Error::new(e))),
            None => Ok(None),
        }
    }

    /// Persist `config` as the active configuration.
    ///
    /// Storage pressure gets the same recovery as
    /// [`save_template`](Self::save_template): evict the oldest template and
    /// retry once.
    pub fn set_active_config(&mut self, config: &FrameConfig) -> SquarepostResult<()> {
        let raw = serde_json::to_string(config)
            .map_err(|e| SquarepostError::Other(anyhow::Error::new(e)))?;
        match self.store.set(ACTIVE_CONFIG_KEY, &raw) {
            Err(SquarepostError::StorageFull(reason)) => {
                if self.evict_oldest()? {
                    self.store.set(ACTIVE_CONFIG_KEY, &raw)
                } else {
                    Err(SquarepostError::StorageFull(reason))
                }
            }
            other => other,
        }
    }

    /// Export every template plus the active configuration as JSON.
    pub fn export_json(&self) -> SquarepostResult<String> {
        let export = SettingsExport {
            templates: self
                .templates()?
                .into_iter()
                .map(|t| (t.name, t.config))
                .collect(),
            current_config: self.active_config()?,
        };
        serde_json::to_string_pretty(&export)
            .map_err(|e| SquarepostError::Other(anyhow::Error::new(e)))
    }

    /// Import templates from an [`export_json`](Self::export_json) payload.
    ///
    /// Imported templates merge over existing ones by name; an imported
    /// active configuration replaces the current one.
    pub fn import_json(&mut self, json: &str) -> SquarepostResult<usize> {
        let export: SettingsExport = serde_json::from_str(json)
            .map_err(|e| SquarepostError::decode(format!("invalid settings export: {e}")))?;

        let count = export.templates.len();
        for (name, config) in export.templates {
            self.save_template(&name, &config)?;
        }
        if let Some(config) = export.current_config {
            self.set_active_config(&config)?;
        }
        Ok(count)
    }

    fn write_templates(&mut self, entries: &[TemplateEntry]) -> SquarepostResult<()> {
        let raw = serde_json::to_string(entries)
            .map_err(|e| SquarepostError::Other(anyhow::Error::new(e)))?;
        self.store.set(TEMPLATES_KEY, &raw)
    }
}
