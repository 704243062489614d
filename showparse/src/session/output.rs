//! Output type for command execution results.

use std::fmt;
use std::time::Duration;

/// Output of one command on one device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    /// The device the command ran on.
    pub device: String,

    /// The command that was executed.
    pub command: String,

    /// The raw command output.
    pub result: String,

    /// Time taken to execute the command.
    pub elapsed: Duration,
}

impl CommandOutput {
    pub fn new(
        device: impl Into<String>,
        command: impl Into<String>,
        result: impl Into<String>,
        elapsed: Duration,
    ) -> Self {
        Self {
            device: device.into(),
            command: command.into(),
            result: result.into(),
            elapsed,
        }
    }

    /// Get the result lines as an iterator.
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.result.lines()
    }

    /// Check if the device returned no text.
    pub fn is_empty(&self) -> bool {
        self.result.is_empty()
    }
}

impl fmt::Display for CommandOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.result)
    }
}
