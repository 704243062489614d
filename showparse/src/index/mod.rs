//! Template index: maps a (platform, command) pair to template files.
//!
//! The descriptor is a comma separated table. Blank lines and lines
//! starting with `#` are ignored. A first row naming a `Template` column is
//! a header, in which case columns are identified by name:
//!
//! ```text
//! Template, Hostname, Platform, Command
//!
//! cisco_ios_show_vlan.textfsm, .*, cisco_ios, sh[[ow]] vl[[an]]
//! ```
//!
//! Without a header every row is `platform, command, template`.
//!
//! Entries are kept in file order and the first entry whose patterns both
//! match wins, however specific later entries are.

mod pattern;

pub use pattern::{compile_column_pattern, expand_completion};

use std::fs;
use std::path::Path;

use log::{debug, trace};
use regex::Regex;

use crate::error::IndexError;

const TEMPLATE: &str = "Template";
const PLATFORM: &str = "Platform";
const COMMAND: &str = "Command";

/// One row of the index.
#[derive(Debug, Clone)]
pub struct TemplateIndexEntry {
    /// Matched against the platform; `None` matches anything.
    pub platform_pattern: Option<Regex>,

    /// Matched against the command text; `None` matches anything.
    pub command_pattern: Option<Regex>,

    /// Template paths relative to the store, in merge order. Never empty.
    templates: Vec<String>,

    /// 1-based line of the descriptor this entry came from.
    pub line: usize,
}

impl TemplateIndexEntry {
    /// The first (primary) template path.
    pub fn template_path(&self) -> &str {
        self.templates.first().map_or("", String::as_str)
    }

    /// Template paths relative to the store, in merge order.
    pub fn templates(&self) -> &[String] {
        &self.templates
    }

    /// Check whether both patterns match.
    pub fn matches(&self, platform: &str, command: &str) -> bool {
        self.platform_pattern
            .as_ref()
            .is_none_or(|re| re.is_match(platform))
            && self
                .command_pattern
                .as_ref()
                .is_none_or(|re| re.is_match(command))
    }
}

/// Column positions of a descriptor.
#[derive(Debug, Clone, Copy)]
struct Columns {
    count: usize,
    template: usize,
    platform: Option<usize>,
    command: Option<usize>,
}

impl Columns {
    fn positional() -> Self {
        Self {
            count: 3,
            platform: Some(0),
            command: Some(1),
            template: 2,
        }
    }

    fn from_header(fields: &[&str], line: usize) -> Result<Self, IndexError> {
        let find = |name: &str| fields.iter().position(|f| *f == name);
        Ok(Self {
            count: fields.len(),
            template: find(TEMPLATE).ok_or_else(|| IndexError::Malformed {
                line,
                message: "header has no Template column".to_string(),
            })?,
            platform: find(PLATFORM),
            command: find(COMMAND),
        })
    }
}

/// Ordered list of index entries.
#[derive(Debug, Clone, Default)]
pub struct TemplateIndex {
    entries: Vec<TemplateIndexEntry>,
}

impl TemplateIndex {
    /// Parse a descriptor.
    pub fn parse_str(text: &str) -> Result<Self, IndexError> {
        let mut columns: Option<Columns> = None;
        let mut entries = Vec::new();

        for (i, raw) in text.lines().enumerate() {
            let line = i + 1;
            let trimmed = raw.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }

            let fields: Vec<&str> = trimmed.split(',').map(str::trim).collect();

            let cols = match columns {
                Some(cols) => cols,
                None if fields.contains(&TEMPLATE) => {
                    columns = Some(Columns::from_header(&fields, line)?);
                    continue;
                }
                None => *columns.insert(Columns::positional()),
            };

            if fields.len() != cols.count {
                return Err(IndexError::Malformed {
                    line,
                    message: format!("expected {} columns, found {}", cols.count, fields.len()),
                });
            }

            let templates: Vec<String> = fields[cols.template]
                .split(':')
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(String::from)
                .collect();
            if templates.is_empty() {
                return Err(IndexError::Malformed {
                    line,
                    message: "empty template column".to_string(),
                });
            }

            let platform_pattern = cols
                .platform
                .map(|c| compile(fields[c], line, PLATFORM))
                .transpose()?
                .flatten();
            let command_pattern = cols
                .command
                .map(|c| compile(&expand_completion(fields[c]), line, COMMAND))
                .transpose()?
                .flatten();

            entries.push(TemplateIndexEntry {
                platform_pattern,
                command_pattern,
                templates,
                line,
            });
        }

        debug!("loaded template index with {} entries", entries.len());
        Ok(Self { entries })
    }

    /// Read and parse a descriptor file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, IndexError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| IndexError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse_str(&text)
    }

    /// Find the first entry matching both the platform and the command.
    pub fn lookup(&self, platform: &str, command: &str) -> Option<&TemplateIndexEntry> {
        let found = self.entries.iter().find(|e| e.matches(platform, command));
        match found {
            Some(entry) => trace!(
                "index line {} matched platform={platform:?} command={command:?}",
                entry.line
            ),
            None => debug!("no index entry for platform={platform:?} command={command:?}"),
        }
        found
    }

    /// All entries in file order.
    pub fn entries(&self) -> &[TemplateIndexEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Compile one column; an empty column matches anything.
fn compile(pattern: &str, line: usize, column: &str) -> Result<Option<Regex>, IndexError> {
    if pattern.is_empty() {
        return Ok(None);
    }
    compile_column_pattern(pattern)
        .map(Some)
        .map_err(|source| IndexError::InvalidPattern {
            line,
            column: column.to_string(),
            source,
        })
}
