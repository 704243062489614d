//! Template engine: runs a compiled [`Template`] over raw text.
//!
//! Each input line is tried against the rules of the current state in
//! order. The first matching rule captures its values, performs its record
//! operation, then either moves on to the next line (optionally changing
//! state) or, for `Continue`, keeps trying the remaining rules on the same
//! line. Lines that match no rule are skipped.

mod noise;

pub use noise::NoiseFilter;

use std::fmt;

use log::{debug, trace};
use serde::{Deserialize, Serialize};

use crate::error::ParseError;
use crate::normalize::{Record, normalize};
use crate::template::{Action, RecordOp, Target, Template};

/// A single cell of a parsed row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// A plain captured string.
    Text(String),
    /// Every capture of a `List` value, in input order.
    List(Vec<String>),
}

impl FieldValue {
    /// Empty string or empty list.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Text(s) => s.is_empty(),
            Self::List(items) => items.is_empty(),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            Self::List(_) => None,
        }
    }

    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            Self::Text(_) => None,
            Self::List(items) => Some(items),
        }
    }
}

impl Default for FieldValue {
    fn default() -> Self {
        Self::Text(String::new())
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<Vec<String>> for FieldValue {
    fn from(items: Vec<String>) -> Self {
        Self::List(items)
    }
}

impl PartialEq<str> for FieldValue {
    fn eq(&self, other: &str) -> bool {
        self.as_text() == Some(other)
    }
}

impl PartialEq<&str> for FieldValue {
    fn eq(&self, other: &&str) -> bool {
        self.as_text() == Some(*other)
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) => f.write_str(s),
            Self::List(items) => write!(f, "[{}]", items.join(", ")),
        }
    }
}

/// Rows produced by one template, with the template's column headers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ParsedTable {
    /// Value names in declaration order.
    pub header: Vec<String>,

    /// One entry per emitted record, positionally aligned with `header`.
    pub rows: Vec<Vec<FieldValue>>,

    /// Names of the `Key` values.
    pub keys: Vec<String>,
}

impl ParsedTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of a column by name.
    pub fn column(&self, name: &str) -> Option<usize> {
        self.header.iter().position(|h| h == name)
    }
}

/// Pending state of one value between records.
#[derive(Debug, Clone, Default)]
struct Slot {
    value: Option<String>,
    list: Vec<String>,
    filldown: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Position {
    State(usize),
    End,
    Eof,
}

/// Runs one template over text. Reusable; every parse starts fresh.
#[derive(Debug)]
pub struct Parser<'t> {
    template: &'t Template,
    noise: NoiseFilter,
    slots: Vec<Slot>,
    rows: Vec<Vec<FieldValue>>,
    position: Position,
}

impl<'t> Parser<'t> {
    /// Create a parser with the default noise filter.
    pub fn new(template: &'t Template) -> Self {
        Self::with_noise(template, NoiseFilter::default())
    }

    /// Create a parser with a custom noise filter.
    pub fn with_noise(template: &'t Template, noise: NoiseFilter) -> Self {
        Self {
            template,
            noise,
            slots: vec![Slot::default(); template.values().len()],
            rows: Vec::new(),
            position: Position::State(template.start()),
        }
    }

    /// Discard all pending values, emitted rows and Filldown memory.
    pub fn reset(&mut self) {
        self.slots = vec![Slot::default(); self.template.values().len()];
        self.rows.clear();
        self.position = Position::State(self.template.start());
    }

    /// Name of the state the machine is in, if it is still running.
    pub fn current_state(&self) -> Option<&str> {
        match self.position {
            Position::State(idx) => self.template.state_at(idx).map(|s| s.name.as_str()),
            Position::End | Position::Eof => None,
        }
    }

    /// Parse text into a table of rows.
    ///
    /// Text that matches nothing yields an empty table, not an error.
    pub fn parse_text(&mut self, text: &str) -> Result<ParsedTable, ParseError> {
        self.reset();
        let template = self.template;

        for (n, line) in text.lines().enumerate() {
            if self.noise.is_noise(line) {
                trace!("line {}: skipped as noise", n + 1);
                continue;
            }
            self.check_line(line)?;
            if !matches!(self.position, Position::State(_)) {
                debug!("line {}: parsing stopped by {:?}", n + 1, self.position);
                break;
            }
        }

        if self.position != Position::End && !template.declares_eof() {
            self.append_record(true);
        }

        let rows = std::mem::take(&mut self.rows);
        debug!("parsed {} records", rows.len());

        Ok(ParsedTable {
            header: template.header(),
            rows,
            keys: template.keys(),
        })
    }

    /// Parse text straight into records keyed by lower-cased value name.
    pub fn parse_text_to_dicts(&mut self, text: &str) -> Result<Vec<Record>, ParseError> {
        let table = self.parse_text(text)?;
        Ok(normalize(&table.rows, &table.header))
    }

    fn check_line(&mut self, line: &str) -> Result<(), ParseError> {
        let Position::State(idx) = self.position else {
            return Ok(());
        };
        let template = self.template;
        let state = template
            .state_at(idx)
            .ok_or_else(|| ParseError::UnknownState(format!("#{idx}")))?;

        for rule in &state.rules {
            let Some(caps) = rule.regex.captures(line) else {
                continue;
            };
            trace!("state {} rule line {} matched {:?}", state.name, rule.line, line);

            for &vi in &rule.captures {
                if let Some(m) = caps.name(&template.values()[vi].name) {
                    self.assign(vi, m.as_str());
                }
            }

            match rule.action.record_op() {
                RecordOp::NoRecord => {}
                RecordOp::Record => self.append_record(false),
                RecordOp::Clear => self.clear_record(),
                RecordOp::Clearall => self.clear_all(),
            }

            match &rule.action {
                Action::Continue { .. } => continue,
                Action::Error { message, .. } => {
                    return Err(ParseError::ErrorAction {
                        message: message.clone(),
                        rule_line: rule.line,
                        input: line.to_string(),
                    });
                }
                Action::Next { target, .. } => {
                    match *target {
                        Target::Stay => {}
                        Target::State(next) => {
                            let name = template
                                .state_at(next)
                                .map(|s| s.name.as_str())
                                .ok_or_else(|| ParseError::UnknownState(format!("#{next}")))?;
                            debug!("state {} -> {}", state.name, name);
                            self.position = Position::State(next);
                        }
                        Target::End => self.position = Position::End,
                        Target::Eof => self.position = Position::Eof,
                    }
                    return Ok(());
                }
            }
        }

        Ok(())
    }

    fn assign(&mut self, vi: usize, text: &str) {
        let def = &self.template.values()[vi];
        let slot = &mut self.slots[vi];

        slot.value = Some(text.to_string());
        if def.is_list() {
            slot.list.push(text.to_string());
        }
        if def.is_filldown() {
            slot.filldown = Some(text.to_string());
        }

        if def.is_fillup() && !text.is_empty() {
            for row in self.rows.iter_mut().rev() {
                if !row[vi].is_empty() {
                    break;
                }
                row[vi] = FieldValue::Text(text.to_string());
            }
        }
    }

    /// Emit the pending values as a row.
    ///
    /// The row is dropped (and the values cleared) when a `Required` value
    /// is empty. A row with every value empty is never emitted, and at end
    /// of input neither is a row holding only Filldown values.
    fn append_record(&mut self, at_eof: bool) {
        let template = self.template;
        let values = template.values();
        if values.is_empty() {
            return;
        }

        let row: Vec<FieldValue> = values
            .iter()
            .zip(&self.slots)
            .map(|(def, slot)| {
                if def.is_list() {
                    FieldValue::List(slot.list.clone())
                } else {
                    FieldValue::Text(slot.value.clone().unwrap_or_default())
                }
            })
            .collect();

        if let Some(def) = values
            .iter()
            .zip(&row)
            .find(|(def, field)| def.is_required() && field.is_empty())
            .map(|(def, _)| def)
        {
            trace!("record dropped: required value {} is empty", def.name);
            self.clear_record();
            return;
        }

        if row.iter().all(FieldValue::is_empty) {
            return;
        }

        if at_eof
            && values
                .iter()
                .zip(&row)
                .all(|(def, field)| field.is_empty() || def.is_filldown())
        {
            trace!("end of input: only Filldown values pending, no record");
            return;
        }

        self.rows.push(row);
        self.clear_record();
    }

    /// Reset pending values, restoring Filldown values.
    fn clear_record(&mut self) {
        for (def, slot) in self.template.values().iter().zip(self.slots.iter_mut()) {
            if def.is_filldown() {
                slot.value = slot.filldown.clone();
            } else {
                slot.value = None;
                slot.list.clear();
            }
        }
    }

    /// Reset every pending value, forgetting Filldown values too.
    fn clear_all(&mut self) {
        for slot in &mut self.slots {
            *slot = Slot::default();
        }
    }
}
