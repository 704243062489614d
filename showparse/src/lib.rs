//! # showparse
//!
//! Turns raw network device command output into structured records.
//!
//! A template index maps a (platform, command) pair to one or more
//! TextFSM-style templates. Each template is a small state machine of
//! regex rules that walks the output line by line and emits records.
//! When no template applies, or a template is broken, the raw text is
//! returned unchanged instead.
//!
//! ## Features
//!
//! - Full TextFSM template language (Key, Required, List, Filldown, Fillup,
//!   Continue, Clearall, Error, EOF)
//! - CliTable-compatible index with `sh[[ow]]` command completion
//! - Degrade-to-raw fallback with a diagnostic reason
//! - Compiled template cache keyed by modification time
//! - Async session layer with concurrent fan-out across devices
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use showparse::{ClassifierBuilder, ParseResult};
//!
//! fn main() -> Result<(), showparse::Error> {
//!     let classifier = ClassifierBuilder::new("templates/textfsm_templates").build()?;
//!
//!     let raw = "Vlan1   active    Gi0/1, Gi0/2";
//!     match classifier.classify("cisco_ios", "show vlan", Some(raw))? {
//!         ParseResult::Structured(records) => println!("{records:?}"),
//!         ParseResult::Raw(text) => println!("{text}"),
//!     }
//!     Ok(())
//! }
//! ```
//!
//! Templates can also be used directly:
//!
//! ```rust
//! use showparse::Template;
//!
//! let template = Template::parse_str(
//!     "Value INTERFACE (\\S+)\nValue STATUS (up|down)\n\nStart\n  ^${INTERFACE}\\s+${STATUS} -> Record\n",
//! ).unwrap();
//!
//! let records = template.parser().parse_text_to_dicts("eth0 up\neth1 down\n").unwrap();
//! assert_eq!(records.len(), 2);
//! assert_eq!(records[1]["status"], "down");
//! ```

pub mod classify;
pub mod engine;
pub mod error;
pub mod index;
pub mod normalize;
pub mod session;
pub mod store;
pub mod template;

// Re-export main types for convenience
pub use classify::{Classification, Classifier, ClassifierBuilder, FallbackReason, ParseResult};
pub use engine::{FieldValue, NoiseFilter, ParsedTable, Parser};
pub use error::Error;
pub use index::{TemplateIndex, TemplateIndexEntry};
pub use normalize::Record;
pub use session::{CommandOutput, DeviceResponse, OfflineSession, Session, fan_out};
pub use store::{FsTemplateStore, MemoryTemplateStore, TemplateStore};
pub use template::Template;
