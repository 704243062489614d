//! Classification of raw command output.
//!
//! A [`Classifier`] looks the (platform, command) pair up in the template
//! index, runs the matching templates over the text and normalizes the
//! rows into records. Anything that goes wrong on the parsing side
//! degrades to returning the raw text unchanged, so observed device output
//! is never lost. Only caller mistakes surface as errors.

mod builder;

pub use builder::{ClassifierBuilder, DEFAULT_INDEX_FILE, DEFAULT_TEMPLATE_DIR};

use std::fmt;
use std::sync::Arc;

use log::{debug, trace, warn};
use serde::{Deserialize, Serialize};

use crate::engine::{NoiseFilter, ParsedTable};
use crate::error::{ClassifyError, Error, Result};
use crate::index::{TemplateIndex, TemplateIndexEntry};
use crate::normalize::{Record, merge_tables, normalize_table};
use crate::session::CommandOutput;
use crate::store::{TemplateCache, TemplateStore};
use crate::template::Template;

/// Outcome of classifying one command output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParseResult {
    /// Records produced by the templates.
    Structured(Vec<Record>),

    /// The unmodified input text.
    Raw(String),
}

impl ParseResult {
    pub fn is_structured(&self) -> bool {
        matches!(self, Self::Structured(_))
    }

    pub fn is_raw(&self) -> bool {
        matches!(self, Self::Raw(_))
    }

    /// The records, if structuring succeeded.
    pub fn records(&self) -> Option<&[Record]> {
        match self {
            Self::Structured(records) => Some(records),
            Self::Raw(_) => None,
        }
    }

    /// The raw text, if classification fell back.
    pub fn raw(&self) -> Option<&str> {
        match self {
            Self::Raw(text) => Some(text),
            Self::Structured(_) => None,
        }
    }
}

/// Why a classification returned raw text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum FallbackReason {
    /// Template processing is switched off.
    TemplatesDisabled,

    /// No index entry matches the platform and command.
    NoIndexEntry,

    /// A template named by the index could not be read.
    TemplateUnavailable { template: String, message: String },

    /// A template failed to compile.
    TemplateInvalid { template: String, message: String },

    /// A template raised an error while scanning the text.
    ParseFailed { template: String, message: String },

    /// The templates matched nothing in non-empty text.
    NoRecords,
}

impl fmt::Display for FallbackReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TemplatesDisabled => write!(f, "templates disabled"),
            Self::NoIndexEntry => write!(f, "no index entry"),
            Self::TemplateUnavailable { template, message } => {
                write!(f, "template {template} unavailable: {message}")
            }
            Self::TemplateInvalid { template, message } => {
                write!(f, "template {template} invalid: {message}")
            }
            Self::ParseFailed { template, message } => {
                write!(f, "template {template} failed: {message}")
            }
            Self::NoRecords => write!(f, "no records produced"),
        }
    }
}

/// A [`ParseResult`] together with the reason for a fallback, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub result: ParseResult,
    pub fallback: Option<FallbackReason>,
}

impl Classification {
    fn structured(records: Vec<Record>) -> Self {
        Self {
            result: ParseResult::Structured(records),
            fallback: None,
        }
    }

    fn raw(text: &str, reason: FallbackReason) -> Self {
        Self {
            result: ParseResult::Raw(text.to_string()),
            fallback: Some(reason),
        }
    }

    /// Check if the result is the raw fallback.
    pub fn is_fallback(&self) -> bool {
        self.fallback.is_some()
    }
}

/// Maps command output to records using an index and a template store.
///
/// The index and compiled templates are read-only after construction, so a
/// classifier can be shared across tasks behind an `Arc`.
pub struct Classifier {
    index: Option<TemplateIndex>,
    store: Arc<dyn TemplateStore>,
    noise: NoiseFilter,
    fallback_on_empty: bool,
    cache: Option<TemplateCache>,
}

impl fmt::Debug for Classifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Classifier")
            .field("index_entries", &self.index.as_ref().map(TemplateIndex::len))
            .field("noise", &self.noise)
            .field("fallback_on_empty", &self.fallback_on_empty)
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}

impl Classifier {
    /// Start building a classifier over a template directory.
    pub fn builder(template_dir: impl Into<std::path::PathBuf>) -> ClassifierBuilder {
        ClassifierBuilder::new(template_dir)
    }

    /// The loaded index, `None` when templates are disabled.
    pub fn index(&self) -> Option<&TemplateIndex> {
        self.index.as_ref()
    }

    /// Number of compiled templates held in the cache.
    pub fn cached_templates(&self) -> usize {
        self.cache.as_ref().map_or(0, TemplateCache::len)
    }

    /// Classify raw command output.
    ///
    /// `raw_text` of `None` means the session produced nothing at all, which
    /// is an error since there is nothing to fall back to.
    pub fn classify(
        &self,
        platform: &str,
        command: &str,
        raw_text: Option<&str>,
    ) -> Result<ParseResult> {
        self.classify_detailed(platform, command, raw_text)
            .map(|c| c.result)
    }

    /// Classify a session's command output.
    pub fn classify_output(&self, platform: &str, output: &CommandOutput) -> Result<ParseResult> {
        self.classify(platform, &output.command, Some(&output.result))
    }

    /// Classify raw command output and report why it fell back, if it did.
    pub fn classify_detailed(
        &self,
        platform: &str,
        command: &str,
        raw_text: Option<&str>,
    ) -> Result<Classification> {
        if platform.trim().is_empty() {
            return Err(ClassifyError::InvalidRequest {
                message: "platform is empty".to_string(),
            }
            .into());
        }
        if command.trim().is_empty() {
            return Err(ClassifyError::InvalidRequest {
                message: "command is empty".to_string(),
            }
            .into());
        }
        let raw = raw_text.ok_or_else(|| ClassifyError::InputUnavailable {
            command: command.to_string(),
        })?;

        let Some(index) = &self.index else {
            return Ok(Classification::raw(raw, FallbackReason::TemplatesDisabled));
        };
        let Some(entry) = index.lookup(platform, command) else {
            return Ok(Classification::raw(raw, FallbackReason::NoIndexEntry));
        };

        let table = match self.structure(entry, raw) {
            Ok(table) => table,
            Err(reason) => {
                warn!("{command:?} on {platform}: {reason}, returning raw output");
                return Ok(Classification::raw(raw, reason));
            }
        };

        let records = normalize_table(&table);
        if records.is_empty() && self.fallback_on_empty && !raw.is_empty() {
            debug!("{command:?} on {platform}: templates matched nothing, returning raw output");
            return Ok(Classification::raw(raw, FallbackReason::NoRecords));
        }

        debug!(
            "{command:?} on {platform}: {} records from {}",
            records.len(),
            entry.template_path()
        );
        Ok(Classification::structured(records))
    }

    /// Run every template of an entry and merge the tables.
    fn structure(
        &self,
        entry: &TemplateIndexEntry,
        raw: &str,
    ) -> std::result::Result<ParsedTable, FallbackReason> {
        let mut merged: Option<ParsedTable> = None;
        let mut keys: Vec<String> = Vec::new();

        for name in entry.templates() {
            let template = self.load_template(name).map_err(|err| match err {
                Error::Template(err) => FallbackReason::TemplateInvalid {
                    template: name.clone(),
                    message: err.to_string(),
                },
                other => FallbackReason::TemplateUnavailable {
                    template: name.clone(),
                    message: other.to_string(),
                },
            })?;

            let table = template
                .parser_with(self.noise.clone())
                .parse_text(raw)
                .map_err(|err| FallbackReason::ParseFailed {
                    template: name.clone(),
                    message: err.to_string(),
                })?;

            if keys.is_empty() {
                keys = table.keys.clone();
            }
            if let Some(base) = merged.as_mut() {
                merge_tables(base, &table, &keys);
            } else {
                merged = Some(table);
            }
        }

        Ok(merged.unwrap_or_default())
    }

    fn load_template(&self, name: &str) -> Result<Arc<Template>> {
        let modified = self
            .cache
            .as_ref()
            .and_then(|cache| Some((cache, self.store.modified(name)?)));

        if let Some((cache, modified)) = modified
            && let Some(template) = cache.get(name, modified)
        {
            trace!("template {name} served from cache");
            return Ok(template);
        }

        let text = self.store.read(name)?;
        let template = Arc::new(Template::parse_str(&text)?);

        if let Some((cache, modified)) = modified {
            cache.insert(name, modified, Arc::clone(&template));
        }
        Ok(template)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::{Duration, SystemTime};

    use crate::error::StoreError;
    use crate::store::MemoryTemplateStore;

    const VLAN_TEMPLATE: &str = r"Value VLAN (\S+)
Value STATUS (\S+)
Value PORTS (.*)

Start
  ^${VLAN}\s+${STATUS}\s+${PORTS}$$ -> Record
";

    const VLAN_OUTPUT: &str = "Vlan1   active    Gi0/1, Gi0/2";

    fn classifier(index: &str, templates: &[(&str, &str)]) -> Classifier {
        let mut store = MemoryTemplateStore::new().with("index", index);
        for (name, text) in templates {
            store.insert(*name, *text);
        }
        Classifier::builder("unused").store(store).build().unwrap()
    }

    fn vlan_classifier() -> Classifier {
        classifier(
            "cisco_ios, sh[[ow]] vl[[an]], vlan.textfsm\n",
            &[("vlan.textfsm", VLAN_TEMPLATE)],
        )
    }

    #[test]
    fn test_structured_vlan_record() {
        let result = vlan_classifier()
            .classify("cisco_ios", "show vlan", Some(VLAN_OUTPUT))
            .unwrap();

        let records = result.records().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0]["vlan"], "Vlan1");
        assert_eq!(records[0]["status"], "active");
        assert_eq!(records[0]["ports"], "Gi0/1, Gi0/2");
    }

    #[test]
    fn test_lookup_miss_returns_exact_input() {
        let raw = "  weird\r\n output \t\n\n";
        let classification = vlan_classifier()
            .classify_detailed("juniper_junos", "show vlan", Some(raw))
            .unwrap();

        assert_eq!(classification.result, ParseResult::Raw(raw.to_string()));
        assert_eq!(classification.fallback, Some(FallbackReason::NoIndexEntry));
    }

    #[test]
    fn test_no_matching_rules_falls_back() {
        let raw = "nothing here looks like a vlan";
        let classification = classifier(
            "cisco_ios, show vlan, vlan.textfsm\n",
            &[(
                "vlan.textfsm",
                "Value VLAN (\\d+)\n\nStart\n  ^VLAN ${VLAN} -> Record\n",
            )],
        )
        .classify_detailed("cisco_ios", "show vlan", Some(raw))
        .unwrap();

        assert_eq!(classification.result.raw(), Some(raw));
        assert_eq!(classification.fallback, Some(FallbackReason::NoRecords));
    }

    #[test]
    fn test_empty_text_is_empty_structured() {
        let result = vlan_classifier()
            .classify("cisco_ios", "show vlan", Some(""))
            .unwrap();
        assert_eq!(result, ParseResult::Structured(vec![]));
    }

    #[test]
    fn test_whitespace_only_text_falls_back() {
        let raw = "   \n\t\n";
        let classification = vlan_classifier()
            .classify_detailed("cisco_ios", "show vlan", Some(raw))
            .unwrap();

        assert_eq!(classification.result, ParseResult::Raw(raw.to_string()));
        assert_eq!(classification.fallback, Some(FallbackReason::NoRecords));
    }

    #[test]
    fn test_zero_records_kept_when_fallback_disabled() {
        let store = MemoryTemplateStore::new()
            .with("index", "cisco_ios, show vlan, vlan.textfsm\n")
            .with("vlan.textfsm", VLAN_TEMPLATE);
        let classifier = Classifier::builder("unused")
            .store(store)
            .fallback_on_empty(false)
            .build()
            .unwrap();

        let result = classifier
            .classify("cisco_ios", "show vlan", Some("garbage"))
            .unwrap();
        assert_eq!(result, ParseResult::Structured(vec![]));
    }

    #[test]
    fn test_invalid_template_falls_back() {
        let classification = classifier(
            "cisco_ios, show vlan, broken.textfsm\n",
            &[("broken.textfsm", "Value VLAN (\\S+)\n\nStart\n  ^${NAME} -> Record\n")],
        )
        .classify_detailed("cisco_ios", "show vlan", Some(VLAN_OUTPUT))
        .unwrap();

        assert_eq!(classification.result.raw(), Some(VLAN_OUTPUT));
        assert!(matches!(
            classification.fallback,
            Some(FallbackReason::TemplateInvalid { ref template, .. }) if template == "broken.textfsm"
        ));
    }

    #[test]
    fn test_missing_template_falls_back() {
        let classification = classifier("cisco_ios, show vlan, gone.textfsm\n", &[])
            .classify_detailed("cisco_ios", "show vlan", Some(VLAN_OUTPUT))
            .unwrap();

        assert!(classification.result.is_raw());
        assert!(matches!(
            classification.fallback,
            Some(FallbackReason::TemplateUnavailable { .. })
        ));
    }

    #[test]
    fn test_error_action_falls_back() {
        let template = "Value VLAN (\\S+)\n\nStart\n  ^% -> Error \"invalid input\"\n  ^${VLAN} -> Record\n";
        let raw = "% Invalid input detected at '^' marker.";
        let classification = classifier(
            "cisco_ios, show vlan, vlan.textfsm\n",
            &[("vlan.textfsm", template)],
        )
        .classify_detailed("cisco_ios", "show vlan", Some(raw))
        .unwrap();

        assert_eq!(classification.result.raw(), Some(raw));
        assert!(matches!(
            classification.fallback,
            Some(FallbackReason::ParseFailed { .. })
        ));
    }

    #[test]
    fn test_first_entry_wins() {
        let generic = "Value LINE (.+)\n\nStart\n  ^${LINE} -> Record\n";
        let classifier = classifier(
            "cisco_.*, show .*, generic.textfsm\ncisco_ios, show vlan, vlan.textfsm\n",
            &[("generic.textfsm", generic), ("vlan.textfsm", VLAN_TEMPLATE)],
        );

        let result = classifier
            .classify("cisco_ios", "show vlan", Some(VLAN_OUTPUT))
            .unwrap();
        let records = result.records().unwrap();
        let keys: Vec<_> = records[0].keys().cloned().collect();
        assert_eq!(keys, vec!["line"]);
    }

    #[test]
    fn test_multiple_templates_merge_on_key() {
        let status = "Value Key INTERFACE (\\S+)\nValue STATUS (up|down)\n\nStart\n  ^${INTERFACE}\\s+${STATUS} -> Record\n";
        let mtu = "Value INTERFACE (\\S+)\nValue MTU (\\d+)\n\nStart\n  ^${INTERFACE}\\s+mtu\\s+${MTU} -> Record\n";
        let classifier = classifier(
            "Template, Platform, Command\nstatus.textfsm:mtu.textfsm, linux, show interfaces\n",
            &[("status.textfsm", status), ("mtu.textfsm", mtu)],
        );
        let raw = "eth0 up\neth1 down\neth1 mtu 9000\neth0 mtu 1500\n";

        let result = classifier
            .classify("linux", "show interfaces", Some(raw))
            .unwrap();
        let records = result.records().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["interface"], "eth0");
        assert_eq!(records[0]["mtu"], "1500");
        assert_eq!(records[1]["interface"], "eth1");
        assert_eq!(records[1]["mtu"], "9000");
    }

    #[test]
    fn test_templates_disabled() {
        let classifier = Classifier::builder("does/not/exist")
            .use_templates(false)
            .build()
            .unwrap();
        assert!(classifier.index().is_none());

        let classification = classifier
            .classify_detailed("cisco_ios", "show vlan", Some(VLAN_OUTPUT))
            .unwrap();
        assert_eq!(classification.result.raw(), Some(VLAN_OUTPUT));
        assert_eq!(
            classification.fallback,
            Some(FallbackReason::TemplatesDisabled)
        );
    }

    #[test]
    fn test_missing_input_is_an_error() {
        let err = vlan_classifier()
            .classify("cisco_ios", "show vlan", None)
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Classify(ClassifyError::InputUnavailable { .. })
        ));
    }

    #[test]
    fn test_malformed_request_is_an_error() {
        let classifier = vlan_classifier();
        assert!(matches!(
            classifier.classify("", "show vlan", Some("x")),
            Err(Error::Classify(ClassifyError::InvalidRequest { .. }))
        ));
        assert!(matches!(
            classifier.classify("cisco_ios", "  ", Some("x")),
            Err(Error::Classify(ClassifyError::InvalidRequest { .. }))
        ));
    }

    #[test]
    fn test_classify_output() {
        let output = CommandOutput::new("r1", "show vlan", VLAN_OUTPUT, Duration::ZERO);
        let result = vlan_classifier()
            .classify_output("cisco_ios", &output)
            .unwrap();
        assert!(result.is_structured());
    }

    #[test]
    fn test_serialized_shape() {
        let result = vlan_classifier()
            .classify("cisco_ios", "show vlan", Some(VLAN_OUTPUT))
            .unwrap();
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["structured"][0]["vlan"], "Vlan1");

        let raw = ParseResult::Raw("text".to_string());
        assert_eq!(
            serde_json::to_value(&raw).unwrap(),
            serde_json::json!({"raw": "text"})
        );

        let reason = serde_json::to_value(FallbackReason::NoRecords).unwrap();
        assert_eq!(reason, serde_json::json!({"reason": "no_records"}));
    }

    /// Counts reads and reports a settable modification time.
    struct CountingStore {
        inner: MemoryTemplateStore,
        reads: AtomicUsize,
        modified: std::sync::Mutex<SystemTime>,
    }

    impl TemplateStore for CountingStore {
        fn read(&self, name: &str) -> std::result::Result<String, StoreError> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            self.inner.read(name)
        }

        fn modified(&self, _name: &str) -> Option<SystemTime> {
            self.modified.lock().ok().map(|m| *m)
        }
    }

    #[test]
    fn test_template_cache_reloads_on_change() {
        let t0 = SystemTime::UNIX_EPOCH + Duration::from_secs(1_000);
        let store = Arc::new(CountingStore {
            inner: MemoryTemplateStore::new()
                .with("index", "cisco_ios, show vlan, vlan.textfsm\n")
                .with("vlan.textfsm", VLAN_TEMPLATE),
            reads: AtomicUsize::new(0),
            modified: std::sync::Mutex::new(t0),
        });
        let classifier = Classifier::builder("unused")
            .store(Arc::clone(&store))
            .build()
            .unwrap();
        let after_index = store.reads.load(Ordering::SeqCst);

        for _ in 0..3 {
            classifier
                .classify("cisco_ios", "show vlan", Some(VLAN_OUTPUT))
                .unwrap();
        }
        assert_eq!(store.reads.load(Ordering::SeqCst), after_index + 1);
        assert_eq!(classifier.cached_templates(), 1);

        *store.modified.lock().unwrap() = t0 + Duration::from_secs(1);
        classifier
            .classify("cisco_ios", "show vlan", Some(VLAN_OUTPUT))
            .unwrap();
        assert_eq!(store.reads.load(Ordering::SeqCst), after_index + 2);
    }

    #[test]
    fn test_lookup_miss_never_reads_templates() {
        let store = Arc::new(CountingStore {
            inner: MemoryTemplateStore::new()
                .with("index", "cisco_ios, show vlan, vlan.textfsm\n")
                .with("vlan.textfsm", VLAN_TEMPLATE),
            reads: AtomicUsize::new(0),
            modified: std::sync::Mutex::new(SystemTime::UNIX_EPOCH),
        });
        let classifier = Classifier::builder("unused")
            .store(Arc::clone(&store))
            .build()
            .unwrap();
        let after_index = store.reads.load(Ordering::SeqCst);

        let classification = classifier
            .classify_detailed("cisco_ios", "show version", Some(VLAN_OUTPUT))
            .unwrap();

        assert_eq!(classification.fallback, Some(FallbackReason::NoIndexEntry));
        assert_eq!(store.reads.load(Ordering::SeqCst), after_index);
        assert_eq!(classifier.cached_templates(), 0);
    }

    #[test]
    fn test_cache_disabled_reads_every_time() {
        let store = Arc::new(CountingStore {
            inner: MemoryTemplateStore::new()
                .with("index", "cisco_ios, show vlan, vlan.textfsm\n")
                .with("vlan.textfsm", VLAN_TEMPLATE),
            reads: AtomicUsize::new(0),
            modified: std::sync::Mutex::new(SystemTime::UNIX_EPOCH),
        });
        let classifier = Classifier::builder("unused")
            .store(Arc::clone(&store))
            .cache_templates(false)
            .build()
            .unwrap();

        classifier
            .classify("cisco_ios", "show vlan", Some(VLAN_OUTPUT))
            .unwrap();
        classifier
            .classify("cisco_ios", "show vlan", Some(VLAN_OUTPUT))
            .unwrap();
        assert_eq!(store.reads.load(Ordering::SeqCst), 3);
        assert_eq!(classifier.cached_templates(), 0);
    }
}
