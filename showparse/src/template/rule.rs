//! State rules and the actions they carry.

use regex::Regex;

/// What happens to the pending record when a rule matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecordOp {
    /// Leave the pending values alone.
    #[default]
    NoRecord,
    /// Emit the pending values as a record, then clear them.
    Record,
    /// Clear the pending values, keeping Filldown values.
    Clear,
    /// Clear every pending value, Filldown included.
    Clearall,
}

impl RecordOp {
    pub(crate) fn parse(s: &str) -> Option<Self> {
        match s {
            "NoRecord" => Some(Self::NoRecord),
            "Record" => Some(Self::Record),
            "Clear" => Some(Self::Clear),
            "Clearall" => Some(Self::Clearall),
            _ => None,
        }
    }
}

/// Where the state machine goes after a `Next` rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    /// Remain in the current state.
    Stay,
    /// Move to the state at this position in the template.
    State(usize),
    /// Stop processing; no implicit final record.
    End,
    /// Stop processing; the end-of-input record still applies.
    Eof,
}

/// The action attached to a rule, as a sum over line operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Take the next input line, possibly in a new state.
    Next { record: RecordOp, target: Target },
    /// Keep trying the remaining rules of this state on the same line.
    Continue { record: RecordOp },
    /// Abort the parse.
    Error {
        record: RecordOp,
        message: Option<String>,
    },
}

impl Action {
    pub fn record_op(&self) -> RecordOp {
        match self {
            Self::Next { record, .. } | Self::Continue { record } | Self::Error { record, .. } => {
                *record
            }
        }
    }
}

impl Default for Action {
    fn default() -> Self {
        Self::Next {
            record: RecordOp::NoRecord,
            target: Target::Stay,
        }
    }
}

/// One line-matching rule inside a state.
#[derive(Debug, Clone)]
pub struct Rule {
    /// The compiled regex with values expanded into named groups,
    /// anchored at the start of the line.
    pub regex: Regex,

    /// Indices of the values this rule captures, in template order.
    pub captures: Vec<usize>,

    /// What to do on a match.
    pub action: Action,

    /// 1-based template line of the rule.
    pub line: usize,
}

/// A named state and its ordered rules.
#[derive(Debug, Clone)]
pub struct State {
    pub name: String,
    pub rules: Vec<Rule>,
}
