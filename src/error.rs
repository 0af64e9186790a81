//! Execution errors

use std::fmt;

/// The kind of execution error
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The shell could not be started
    Spawn,
    /// Waiting on a command failed
    Wait,
}

/// An error raised while running a block, with the block it came from
#[derive(Debug)]
pub struct RunError {
    pub kind: ErrorKind,
    pub message: String,
    pub description: Option<String>,
    pub command: Option<String>,
}

impl RunError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            description: None,
            command: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_command(mut self, command: impl Into<String>) -> Self {
        self.command = Some(command.into());
        self
    }

    pub fn spawn(command: &str, err: std::io::Error) -> Self {
        Self::new(ErrorKind::Spawn, format!("failed to start shell: {}", err))
            .with_command(command)
    }
}

impl fmt::Display for RunError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(ref description) = self.description {
            write!(f, "{}: ", description)?;
        }
        if let Some(ref command) = self.command {
            write!(f, "{}: ", command)?;
        }
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for RunError {}
