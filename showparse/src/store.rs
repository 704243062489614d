//! Template resource stores.
//!
//! The classifier never touches the filesystem directly; it reads the index
//! descriptor and template files through a [`TemplateStore`]. The default
//! is [`FsTemplateStore`], rooted at a template directory.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use std::time::SystemTime;

use indexmap::IndexMap;
use log::debug;

use crate::error::StoreError;
use crate::template::Template;

/// Read-only access to index and template resources by relative name.
pub trait TemplateStore: Send + Sync {
    /// Read a resource as text.
    fn read(&self, name: &str) -> Result<String, StoreError>;

    /// Last modification time, if the store can tell.
    ///
    /// Only resources with a modification time are cached.
    fn modified(&self, _name: &str) -> Option<SystemTime> {
        None
    }
}

/// Store backed by a directory.
#[derive(Debug, Clone)]
pub struct FsTemplateStore {
    root: PathBuf,
}

impl FsTemplateStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The template directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }
}

impl TemplateStore for FsTemplateStore {
    fn read(&self, name: &str) -> Result<String, StoreError> {
        let path = self.path(name);
        fs::read_to_string(&path).map_err(|source| match source.kind() {
            io::ErrorKind::NotFound => StoreError::NotFound(name.to_string()),
            _ => StoreError::Io { path, source },
        })
    }

    fn modified(&self, name: &str) -> Option<SystemTime> {
        fs::metadata(self.path(name)).and_then(|m| m.modified()).ok()
    }
}

/// Store holding resources in memory, for tests and embedded templates.
#[derive(Debug, Clone, Default)]
pub struct MemoryTemplateStore {
    resources: IndexMap<String, String>,
}

impl MemoryTemplateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a resource.
    pub fn with(mut self, name: impl Into<String>, text: impl Into<String>) -> Self {
        self.insert(name, text);
        self
    }

    /// Add or replace a resource.
    pub fn insert(&mut self, name: impl Into<String>, text: impl Into<String>) {
        self.resources.insert(name.into(), text.into());
    }
}

impl TemplateStore for MemoryTemplateStore {
    fn read(&self, name: &str) -> Result<String, StoreError> {
        self.resources
            .get(name)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(name.to_string()))
    }
}

impl<S: TemplateStore + ?Sized> TemplateStore for Arc<S> {
    fn read(&self, name: &str) -> Result<String, StoreError> {
        (**self).read(name)
    }

    fn modified(&self, name: &str) -> Option<SystemTime> {
        (**self).modified(name)
    }
}

#[derive(Debug)]
struct CachedTemplate {
    modified: SystemTime,
    template: Arc<Template>,
}

/// Compiled templates keyed by store name and modification time.
#[derive(Debug, Default)]
pub struct TemplateCache {
    entries: RwLock<HashMap<String, CachedTemplate>>,
}

impl TemplateCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a cached template if it is still current.
    pub fn get(&self, name: &str, modified: SystemTime) -> Option<Arc<Template>> {
        let entries = self.entries.read().ok()?;
        entries
            .get(name)
            .filter(|cached| cached.modified == modified)
            .map(|cached| Arc::clone(&cached.template))
    }

    /// Remember a compiled template.
    pub fn insert(&self, name: &str, modified: SystemTime, template: Arc<Template>) {
        if let Ok(mut entries) = self.entries.write() {
            debug!("caching template {name}");
            entries.insert(name.to_string(), CachedTemplate { modified, template });
        }
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::time::Duration;

    #[test]
    fn test_memory_store() {
        let store = MemoryTemplateStore::new().with("index", "a, b, c\n");
        assert_eq!(store.read("index").unwrap(), "a, b, c\n");
        assert!(matches!(store.read("nope"), Err(StoreError::NotFound(name)) if name == "nope"));
        assert!(store.modified("index").is_none());
    }

    #[test]
    fn test_fs_store() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("show_vlan.textfsm"), "Value A (x)\n").unwrap();

        let store = FsTemplateStore::new(dir.path());
        assert_eq!(store.root(), dir.path());
        assert_eq!(store.read("show_vlan.textfsm").unwrap(), "Value A (x)\n");
        assert!(store.modified("show_vlan.textfsm").is_some());
        assert!(matches!(
            store.read("missing.textfsm"),
            Err(StoreError::NotFound(_))
        ));
        assert!(store.modified("missing.textfsm").is_none());
    }

    #[test]
    fn test_cache_respects_modification_time() {
        let template =
            Arc::new(Template::parse_str("Value A (x)\n\nStart\n  ^${A} -> Record\n").unwrap());
        let cache = TemplateCache::new();
        let t0 = SystemTime::UNIX_EPOCH + Duration::from_secs(100);
        let t1 = t0 + Duration::from_secs(1);

        assert!(cache.is_empty());
        cache.insert("a.textfsm", t0, Arc::clone(&template));
        assert_eq!(cache.len(), 1);
        assert!(cache.get("a.textfsm", t0).is_some());
        assert!(cache.get("a.textfsm", t1).is_none());
        assert!(cache.get("b.textfsm", t0).is_none());
    }
}
