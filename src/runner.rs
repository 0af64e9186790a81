//! Scenario runner
//!
//! Runs parsed scenarios through a [`ShellContext`]: prepares a working
//! directory, checks the `Given` precondition, evaluates each behavior and
//! always runs the `(finally)` cleanup. Reports one result per scenario.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use regex::Regex;

use crate::ast::{Expression, Scenario};
use crate::context::{ShellContext, DEFAULT_SHELL};
use crate::error::RunError;

/// Configuration for the runner
pub struct RunConfig {
    /// Working directory for scenarios when not sandboxed
    pub dir: PathBuf,
    /// Run each scenario in a fresh temporary directory
    pub sandbox: bool,
    /// Root directory for sandbox directories
    pub workdir_root: Option<PathBuf>,
    /// Preserve sandbox directories after the run (for debugging)
    pub preserve_work: bool,
    /// Only run scenarios whose `Given` description matches
    pub filter: Option<Regex>,
    /// Shell used to run command lines
    pub shell: String,
    /// Environment variables to set for every command
    pub env: Vec<(String, String)>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("."),
            sandbox: false,
            workdir_root: None,
            preserve_work: false,
            filter: None,
            shell: DEFAULT_SHELL.into(),
            env: Vec::new(),
        }
    }
}

/// Result of running all scenarios
#[derive(Debug)]
pub struct RunResult {
    /// Individual scenario results
    pub cases: Vec<ScenarioResult>,
    /// Total duration
    pub duration: Duration,
}

impl RunResult {
    /// Check if all scenarios passed
    pub fn all_passed(&self) -> bool {
        self.cases.iter().all(|c| c.passed || c.skipped)
    }

    pub fn passed_count(&self) -> usize {
        self.cases.iter().filter(|c| c.passed && !c.skipped).count()
    }

    pub fn failed_count(&self) -> usize {
        self.cases.iter().filter(|c| !c.passed && !c.skipped).count()
    }

    pub fn skipped_count(&self) -> usize {
        self.cases.iter().filter(|c| c.skipped).count()
    }

    /// Format a summary line
    pub fn summary(&self) -> String {
        format!(
            "{} passed, {} failed, {} skipped ({}ms)",
            self.passed_count(),
            self.failed_count(),
            self.skipped_count(),
            self.duration.as_millis(),
        )
    }
}

/// Result of a single scenario
#[derive(Debug)]
pub struct ScenarioResult {
    /// Description of the scenario's `Given`
    pub name: String,
    pub passed: bool,
    pub skipped: bool,
    /// Failure reason
    pub error: Option<String>,
    /// Execution log
    pub log: String,
    pub duration: Duration,
    /// Sandbox directory (if preserved)
    pub workdir: Option<PathBuf>,
}

impl ScenarioResult {
    fn skipped(name: String) -> Self {
        Self {
            name,
            passed: true,
            skipped: true,
            error: None,
            log: String::new(),
            duration: Duration::ZERO,
            workdir: None,
        }
    }

    fn failed(name: String, error: String, start: Instant) -> Self {
        Self {
            name,
            passed: false,
            skipped: false,
            error: Some(error),
            log: String::new(),
            duration: start.elapsed(),
            workdir: None,
        }
    }
}

/// The scenario runner
pub struct Runner {
    config: RunConfig,
}

impl Runner {
    pub fn new(config: RunConfig) -> Self {
        Self { config }
    }

    /// Parse a spec file and run its scenarios.
    pub fn run_file(&self, path: &Path) -> Result<RunResult, std::io::Error> {
        let file = std::fs::File::open(path)?;
        let scenarios = crate::parser::parse_reader(file)?;
        Ok(self.run_all(&scenarios))
    }

    /// Run every scenario in order
    pub fn run_all(&self, scenarios: &[Scenario]) -> RunResult {
        let start = Instant::now();
        let cases = scenarios
            .iter()
            .enumerate()
            .map(|(i, s)| self.run_one(i + 1, s))
            .collect();
        RunResult {
            cases,
            duration: start.elapsed(),
        }
    }

    /// Run a single scenario; `index` is its 1-based position in the spec.
    pub fn run_one(&self, index: usize, scenario: &Scenario) -> ScenarioResult {
        let start = Instant::now();
        let name = scenario_name(index, scenario);

        if let Some(ref filter) = self.config.filter {
            if !filter.is_match(&name) {
                log::debug!("skipping {:?}: does not match {}", name, filter);
                return ScenarioResult::skipped(name);
            }
        }

        let sandbox = if self.config.sandbox {
            match self.create_workdir(index) {
                Ok(dir) => Some(dir),
                Err(e) => {
                    return ScenarioResult::failed(
                        name,
                        format!("failed to create workdir: {}", e),
                        start,
                    )
                }
            }
        } else {
            None
        };
        let workdir = sandbox
            .as_ref()
            .map_or_else(|| self.config.dir.clone(), |d| d.path().to_path_buf());

        let mut ctx = ShellContext::new(workdir).with_shell(self.config.shell.as_str());
        for (k, v) in &self.config.env {
            ctx.setenv(k.as_str(), v.as_str());
        }

        let mut error = match execute(&mut ctx, scenario) {
            Ok(failure) => failure,
            Err(e) => Some(e.to_string()),
        };

        if let Some(ref finally) = scenario.finally {
            ctx.logf("(finally)");
            let cleanup = match finally.eval(&mut ctx) {
                Ok(true) => None,
                Ok(false) => Some(format!("cleanup failed: {}", describe(finally))),
                Err(e) => Some(e.to_string()),
            };
            if let Some(msg) = cleanup {
                ctx.logf(&format!("[{}]", msg));
                error = error.or(Some(msg));
            }
        }

        let passed = error.is_none();
        log::debug!("scenario {:?}: {}", name, if passed { "passed" } else { "failed" });

        // Preserve the sandbox on failure or if configured
        let workdir = match sandbox {
            Some(dir) if self.config.preserve_work || !passed => {
                let path = dir.path().to_path_buf();
                std::mem::forget(dir);
                Some(path)
            }
            _ => None,
        };

        ScenarioResult {
            name,
            passed,
            skipped: false,
            error,
            log: ctx.log,
            duration: start.elapsed(),
            workdir,
        }
    }

    fn create_workdir(&self, index: usize) -> Result<tempfile::TempDir, std::io::Error> {
        let prefix = format!("gourd-{}-", index);
        if let Some(ref root) = self.config.workdir_root {
            std::fs::create_dir_all(root)?;
            tempfile::Builder::new().prefix(&prefix).tempdir_in(root)
        } else {
            tempfile::Builder::new().prefix(&prefix).tempdir()
        }
    }
}

/// Evaluate the precondition and behaviors. `Ok(Some(reason))` is a failure.
fn execute(ctx: &mut ShellContext, scenario: &Scenario) -> Result<Option<String>, RunError> {
    if !scenario.given.eval(ctx)? {
        return Ok(Some(format!("precondition failed: {}", describe(&scenario.given))));
    }
    for behavior in &scenario.behaviors {
        if let Some(ref when) = behavior.when {
            if !when.eval(ctx)? {
                return Ok(Some(format!("action failed: {}", describe(when))));
            }
        }
        if let Some(ref then) = behavior.then {
            if !then.eval(ctx)? {
                return Ok(Some(format!("expectation failed: {}", describe(then))));
            }
        }
    }
    Ok(None)
}

fn describe(expr: &Expression) -> String {
    match expr.description() {
        "" => "(no description)".to_string(),
        d => d.to_string(),
    }
}

fn scenario_name(index: usize, scenario: &Scenario) -> String {
    match scenario.given.description() {
        "" => format!("scenario {}", index),
        d => d.to_string(),
    }
}

/// Builder API for convenient runner construction
pub struct RunnerBuilder {
    config: RunConfig,
}

impl RunnerBuilder {
    pub fn new() -> Self {
        Self {
            config: RunConfig::default(),
        }
    }

    /// Set the working directory used when not sandboxed
    pub fn dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.dir = dir.into();
        self
    }

    pub fn sandbox(mut self, sandbox: bool) -> Self {
        self.config.sandbox = sandbox;
        self
    }

    pub fn workdir_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.config.workdir_root = Some(root.into());
        self
    }

    pub fn preserve_work(mut self, preserve: bool) -> Self {
        self.config.preserve_work = preserve;
        self
    }

    pub fn filter(mut self, filter: Regex) -> Self {
        self.config.filter = Some(filter);
        self
    }

    pub fn shell(mut self, shell: impl Into<String>) -> Self {
        self.config.shell = shell.into();
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.config.env.push((key.into(), value.into()));
        self
    }

    pub fn build(self) -> Runner {
        Runner::new(self.config)
    }
}

impl Default for RunnerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
