//! Error types for showparse.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Main error type for showparse operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Template definition errors
    #[error("Template error: {0}")]
    Template(#[from] TemplateError),

    /// Errors raised while running a template over text
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    /// Template index errors
    #[error("Index error: {0}")]
    Index(#[from] IndexError),

    /// Template resource store errors
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Caller contract violations
    #[error("Classify error: {0}")]
    Classify(#[from] ClassifyError),

    /// Session layer errors
    #[error("Session error: {0}")]
    Session(#[from] SessionError),
}

/// Structural errors in a template definition.
///
/// Every variant carries the 1-based line of the template it was found on.
#[derive(Error, Debug)]
pub enum TemplateError {
    /// A `Value` line could not be understood
    #[error("line {line}: invalid value definition: {message}")]
    InvalidValue { line: usize, message: String },

    /// The same value name was declared twice
    #[error("line {line}: duplicate value '{name}'")]
    DuplicateValue { line: usize, name: String },

    /// An option other than Key, Required, List, Filldown, Fillup
    #[error("line {line}: unknown option '{option}'")]
    UnknownOption { line: usize, option: String },

    /// The same option appears twice on one value
    #[error("line {line}: duplicate option '{option}'")]
    DuplicateOption { line: usize, option: String },

    /// The template declares no values at all
    #[error("line {line}: no value definitions found")]
    NoValues { line: usize },

    /// A state header line is malformed or reserved
    #[error("line {line}: invalid state '{name}': {message}")]
    InvalidState {
        line: usize,
        name: String,
        message: String,
    },

    /// The same state was declared twice
    #[error("line {line}: duplicate state '{name}'")]
    DuplicateState { line: usize, name: String },

    /// The mandatory `Start` state is missing
    #[error("missing 'Start' state")]
    MissingStart,

    /// A rule line is malformed
    #[error("line {line}: invalid rule: {message}")]
    InvalidRule { line: usize, message: String },

    /// A rule substitutes a value that was never declared
    #[error("line {line}: undeclared value '{name}'")]
    UndeclaredValue { line: usize, name: String },

    /// A rule transitions to a state that was never declared
    #[error("line {line}: unknown state '{name}'")]
    UnknownState { line: usize, name: String },

    /// A value or rule regex failed to compile
    #[error("line {line}: invalid regex: {source}")]
    InvalidRegex {
        line: usize,
        #[source]
        source: regex::Error,
    },
}

/// Runtime errors raised while scanning text with a compiled template.
#[derive(Error, Debug)]
pub enum ParseError {
    /// A rule with the `Error` action matched
    #[error("{}rule line {rule_line}, input line: {input:?}", message.as_deref().map(|m| format!("{m}: ")).unwrap_or_default())]
    ErrorAction {
        message: Option<String>,
        rule_line: usize,
        input: String,
    },

    /// The state machine reached a state the template does not define
    #[error("transition to unknown state '{0}'")]
    UnknownState(String),
}

/// Template index errors.
#[derive(Error, Debug)]
pub enum IndexError {
    /// The index descriptor could not be read
    #[error("could not read index file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A row has the wrong shape
    #[error("line {line}: {message}")]
    Malformed { line: usize, message: String },

    /// A pattern column failed to compile
    #[error("line {line}: invalid {column} pattern: {source}")]
    InvalidPattern {
        line: usize,
        column: String,
        #[source]
        source: regex::Error,
    },
}

/// Template resource store errors.
#[derive(Error, Debug)]
pub enum StoreError {
    /// No resource exists under the name
    #[error("resource '{0}' not found")]
    NotFound(String),

    /// The resource exists but could not be read
    #[error("could not read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Errors in how the classifier was called.
#[derive(Error, Debug)]
pub enum ClassifyError {
    /// No raw text was supplied, so there is nothing to fall back to
    #[error("no raw text supplied for command '{command}'")]
    InputUnavailable { command: String },

    /// The request itself is malformed
    #[error("invalid request: {message}")]
    InvalidRequest { message: String },
}

/// Session layer errors.
#[derive(Error, Debug)]
pub enum SessionError {
    /// Session not opened
    #[error("Session not open - call open() first")]
    NotOpen,

    /// Session already opened
    #[error("Session already open")]
    AlreadyOpen,

    /// Captured output could not be read
    #[error("could not read capture {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A fan-out worker task failed to complete
    #[error("worker for device '{device}' failed: {message}")]
    Worker { device: String, message: String },
}

/// Result type alias using showparse's Error.
pub type Result<T> = std::result::Result<T, Error>;
