//! Template definitions for line-oriented text parsing.
//!
//! A template declares named capture values and a set of states, each an
//! ordered list of regex rules. It is parsed once into the types in this
//! module and then interpreted by the [`engine`](crate::engine).
//!
//! ```text
//! Value Required VLAN (\d+)
//! Value STATUS (\S+)
//!
//! Start
//!   ^${VLAN}\s+${STATUS} -> Record
//! ```

mod parser;
mod rule;
mod value;

pub use parser::MAX_STATE_NAME_LEN;
pub use rule::{Action, RecordOp, Rule, State, Target};
pub use value::{MAX_NAME_LEN, ValueDefinition, ValueOption};

use std::str::FromStr;

use indexmap::IndexMap;

use crate::engine::{NoiseFilter, Parser};
use crate::error::TemplateError;

/// A compiled template.
#[derive(Debug, Clone)]
pub struct Template {
    values: Vec<ValueDefinition>,
    states: IndexMap<String, State>,
    start: usize,
    eof_declared: bool,
}

impl Template {
    /// Parse and validate template text.
    pub fn parse_str(text: &str) -> Result<Self, TemplateError> {
        parser::parse(text)
    }

    /// Declared values in template order.
    pub fn values(&self) -> &[ValueDefinition] {
        &self.values
    }

    /// Column headers: the value names in declaration order.
    pub fn header(&self) -> Vec<String> {
        self.values.iter().map(|v| v.name.clone()).collect()
    }

    /// Names of the values flagged `Key`.
    pub fn keys(&self) -> Vec<String> {
        self.values
            .iter()
            .filter(|v| v.is_key())
            .map(|v| v.name.clone())
            .collect()
    }

    /// Look up a state by name. `End` and `EOF` are never stored.
    pub fn state(&self, name: &str) -> Option<&State> {
        self.states.get(name)
    }

    /// Look up a state by its position.
    pub fn state_at(&self, index: usize) -> Option<&State> {
        self.states.get_index(index).map(|(_, state)| state)
    }

    /// Position of the `Start` state.
    pub fn start(&self) -> usize {
        self.start
    }

    /// Whether the template declares an (empty) `EOF` state, which
    /// suppresses the implicit end-of-input record.
    pub fn declares_eof(&self) -> bool {
        self.eof_declared
    }

    /// Create a parser with the default noise filter.
    pub fn parser(&self) -> Parser<'_> {
        Parser::new(self)
    }

    /// Create a parser with a custom noise filter.
    pub fn parser_with(&self, noise: NoiseFilter) -> Parser<'_> {
        Parser::with_noise(self, noise)
    }
}

impl FromStr for Template {
    type Err = TemplateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_str(s)
    }
}
