//! Shell execution context
//!
//! Runs block commands one line at a time through a shell, in a fixed
//! working directory, and keeps a textual log of what happened.

use std::path::PathBuf;
use std::process::{Command, Stdio};

use crate::ast::{Context, Expression};
use crate::error::{ErrorKind, RunError};

/// Default shell used to run command lines
pub const DEFAULT_SHELL: &str = "sh";

/// Executes expressions by running their commands with `<shell> -c <line>`.
pub struct ShellContext {
    /// Directory every command runs in
    pub workdir: PathBuf,
    shell: String,
    /// Extra environment on top of the inherited one
    env: Vec<(String, String)>,
    /// Execution log
    pub log: String,
}

impl ShellContext {
    pub fn new(workdir: PathBuf) -> Self {
        let mut ctx = Self {
            workdir,
            shell: DEFAULT_SHELL.to_string(),
            env: Vec::new(),
            log: String::new(),
        };
        let work = ctx.workdir.to_string_lossy().to_string();
        ctx.setenv("GOURD_WORK", work);
        ctx
    }

    pub fn with_shell(mut self, shell: impl Into<String>) -> Self {
        self.shell = shell.into();
        self
    }

    /// Set an environment variable for subsequent commands.
    pub fn setenv(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.env.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.env.push((key, value)),
        }
    }

    pub fn getenv(&self, key: &str) -> Option<&str> {
        self.env
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Write a log entry
    pub fn logf(&mut self, msg: &str) {
        self.log.push_str(msg);
        if !msg.ends_with('\n') {
            self.log.push('\n');
        }
    }

    /// Run a single command line. Returns whether it exited successfully.
    fn exec(&mut self, line: &str) -> Result<bool, RunError> {
        self.logf(&format!("> {}", line));
        log::debug!("exec: {}", line);

        let child = Command::new(&self.shell)
            .arg("-c")
            .arg(line)
            .current_dir(&self.workdir)
            .envs(self.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| RunError::spawn(line, e))?;

        let output = child.wait_with_output().map_err(|e| {
            RunError::new(ErrorKind::Wait, e.to_string()).with_command(line)
        })?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        if !stdout.is_empty() {
            self.logf(&format!("[stdout]\n{}", stdout));
        }
        if !stderr.is_empty() {
            self.logf(&format!("[stderr]\n{}", stderr));
        }

        if output.status.success() {
            return Ok(true);
        }
        match output.status.code() {
            Some(code) => self.logf(&format!("[exit code {}]", code)),
            None => self.logf("[killed by signal]"),
        }
        Ok(false)
    }
}

impl Context for ShellContext {
    type Error = RunError;

    fn run(&mut self, description: &str, commands: &[String]) -> Result<bool, RunError> {
        if !description.is_empty() {
            self.logf(&format!("# {}", description));
        }
        for line in commands {
            let ok = self
                .exec(line)
                .map_err(|e| e.with_description(description))?;
            if !ok {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn and(&mut self, children: &[Expression]) -> Result<bool, RunError> {
        for child in children {
            if !child.eval(self)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn or(&mut self, children: &[Expression]) -> Result<bool, RunError> {
        for child in children {
            if child.eval(self)? {
                return Ok(true);
            }
        }
        Ok(false)
    }
}
