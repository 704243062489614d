//! Builder for creating classifiers.

use std::path::PathBuf;
use std::sync::Arc;

use log::debug;

use super::Classifier;
use crate::engine::NoiseFilter;
use crate::error::Result;
use crate::index::TemplateIndex;
use crate::store::{FsTemplateStore, TemplateCache, TemplateStore};

/// Template directory used when none is given on the command line.
pub const DEFAULT_TEMPLATE_DIR: &str = "templates/textfsm_templates";

/// Name of the index descriptor inside the template directory.
pub const DEFAULT_INDEX_FILE: &str = "index";

/// Builder for constructing a [`Classifier`].
///
/// # Example
///
/// ```rust,no_run
/// use showparse::ClassifierBuilder;
///
/// # fn example() -> Result<(), showparse::Error> {
/// let classifier = ClassifierBuilder::new("templates/textfsm_templates")
///     .index_file("index")
///     .build()?;
///
/// let result = classifier.classify("cisco_ios", "show vlan", Some("..."))?;
/// # Ok(())
/// # }
/// ```
pub struct ClassifierBuilder {
    template_dir: PathBuf,
    index_file: String,
    use_templates: bool,
    store: Option<Arc<dyn TemplateStore>>,
    noise: NoiseFilter,
    fallback_on_empty: bool,
    cache_templates: bool,
}

impl ClassifierBuilder {
    /// Create a new builder reading templates from the given directory.
    pub fn new(template_dir: impl Into<PathBuf>) -> Self {
        Self {
            template_dir: template_dir.into(),
            index_file: DEFAULT_INDEX_FILE.to_string(),
            use_templates: true,
            store: None,
            noise: NoiseFilter::default(),
            fallback_on_empty: true,
            cache_templates: true,
        }
    }

    /// Set the index descriptor name (default: "index").
    pub fn index_file(mut self, name: impl Into<String>) -> Self {
        self.index_file = name.into();
        self
    }

    /// Enable or disable template processing (default: enabled).
    ///
    /// When disabled every classification returns the raw text and no
    /// index is loaded.
    pub fn use_templates(mut self, enabled: bool) -> Self {
        self.use_templates = enabled;
        self
    }

    /// Read the index and templates from a custom store instead of the
    /// template directory.
    pub fn store(mut self, store: impl TemplateStore + 'static) -> Self {
        self.store = Some(Arc::new(store));
        self
    }

    /// Set the filter for lines the engine skips.
    pub fn noise(mut self, noise: NoiseFilter) -> Self {
        self.noise = noise;
        self
    }

    /// Return raw text when the templates produce no records from
    /// non-empty output (default: true).
    pub fn fallback_on_empty(mut self, enabled: bool) -> Self {
        self.fallback_on_empty = enabled;
        self
    }

    /// Keep compiled templates between calls (default: true).
    pub fn cache_templates(mut self, enabled: bool) -> Self {
        self.cache_templates = enabled;
        self
    }

    /// Build the classifier.
    ///
    /// Loads the index once. A missing or malformed index is an error
    /// while templates are enabled.
    pub fn build(self) -> Result<Classifier> {
        let store: Arc<dyn TemplateStore> = match self.store {
            Some(store) => store,
            None => Arc::new(FsTemplateStore::new(self.template_dir)),
        };

        let index = if self.use_templates {
            let text = store.read(&self.index_file)?;
            let index = TemplateIndex::parse_str(&text)?;
            debug!("index {} has {} entries", self.index_file, index.len());
            Some(index)
        } else {
            None
        };

        Ok(Classifier {
            index,
            store,
            noise: self.noise,
            fallback_on_empty: self.fallback_on_empty,
            cache: self.cache_templates.then(TemplateCache::new),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::error::{Error, IndexError, StoreError};
    use crate::store::MemoryTemplateStore;

    #[test]
    fn test_missing_index_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = ClassifierBuilder::new(dir.path()).build().unwrap_err();
        assert!(matches!(err, Error::Store(StoreError::NotFound(name)) if name == "index"));
    }

    #[test]
    fn test_malformed_index_is_an_error() {
        let store = MemoryTemplateStore::new().with("index", "only, two\n");
        let err = ClassifierBuilder::new("unused")
            .store(store)
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::Index(IndexError::Malformed { .. })));
    }

    #[test]
    fn test_loads_from_template_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("ntc_index"),
            "Template, Platform, Command\nvlan.textfsm, cisco_ios, show vlan\n",
        )
        .unwrap();
        std::fs::write(
            dir.path().join("vlan.textfsm"),
            "Value VLAN (\\d+)\n\nStart\n  ^${VLAN}\\s -> Record\n",
        )
        .unwrap();

        let classifier = ClassifierBuilder::new(dir.path())
            .index_file("ntc_index")
            .build()
            .unwrap();
        assert_eq!(classifier.index().map(TemplateIndex::len), Some(1));

        let result = classifier
            .classify("cisco_ios", "show vlan", Some("10 users\n20 guests\n"))
            .unwrap();
        let records = result.records().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1]["vlan"], "20");
        assert_eq!(classifier.cached_templates(), 1);
    }

    #[test]
    fn test_noise_filter_applies() {
        let store = MemoryTemplateStore::new()
            .with("index", "linux, uptime, uptime.textfsm\n")
            .with(
                "uptime.textfsm",
                "Value LINE (.+)\n\nStart\n  ^${LINE} -> Record\n",
            );
        let noise = NoiseFilter::default().with_banner(r"^\*\*\*").unwrap();
        let classifier = ClassifierBuilder::new("unused")
            .store(store)
            .noise(noise)
            .build()
            .unwrap();

        let result = classifier
            .classify("linux", "uptime", Some("*** authorized use only ***\n\n up 3 days\n"))
            .unwrap();
        let records = result.records().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0]["line"], " up 3 days");
    }
}
