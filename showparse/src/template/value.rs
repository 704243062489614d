//! Value definitions: the named capture variables of a template.

use std::fmt;
use std::str::FromStr;

/// Longest value name a template may declare.
pub const MAX_NAME_LEN: usize = 48;

/// Options that change how a value behaves across records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueOption {
    /// Identifies the row when tables from several templates are merged.
    Key,
    /// A record is dropped unless this value is non-empty.
    Required,
    /// Every match appends to a list instead of overwriting.
    List,
    /// The value survives record boundaries until it is matched again.
    Filldown,
    /// On assignment the value is copied upward into earlier records.
    Fillup,
}

impl ValueOption {
    /// The option's spelling in template text.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Key => "Key",
            Self::Required => "Required",
            Self::List => "List",
            Self::Filldown => "Filldown",
            Self::Fillup => "Fillup",
        }
    }
}

impl FromStr for ValueOption {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Key" => Ok(Self::Key),
            "Required" => Ok(Self::Required),
            "List" => Ok(Self::List),
            "Filldown" => Ok(Self::Filldown),
            "Fillup" => Ok(Self::Fillup),
            _ => Err(()),
        }
    }
}

impl fmt::Display for ValueOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A declared capture variable.
#[derive(Debug, Clone)]
pub struct ValueDefinition {
    /// Name as written in the template.
    pub name: String,

    /// The pattern including its outer parentheses, e.g. `(\S+)`.
    pub pattern: String,

    /// Options in declaration order.
    pub options: Vec<ValueOption>,
}

impl ValueDefinition {
    /// Check whether the value carries an option.
    pub fn has(&self, option: ValueOption) -> bool {
        self.options.contains(&option)
    }

    pub fn is_list(&self) -> bool {
        self.has(ValueOption::List)
    }

    pub fn is_filldown(&self) -> bool {
        self.has(ValueOption::Filldown)
    }

    pub fn is_required(&self) -> bool {
        self.has(ValueOption::Required)
    }

    pub fn is_fillup(&self) -> bool {
        self.has(ValueOption::Fillup)
    }

    pub fn is_key(&self) -> bool {
        self.has(ValueOption::Key)
    }

    /// The pattern with its outer group turned into a named group.
    ///
    /// This is what `${Name}` expands to inside a rule.
    pub fn named_group(&self) -> String {
        format!("(?P<{}>{}", self.name, &self.pattern[1..])
    }
}

/// Check that a name can be used both in templates and as a regex group name.
pub(crate) fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    name.len() <= MAX_NAME_LEN && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
