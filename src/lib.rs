//! gourd: Given/When/Then specs for CLI E2E testing
//!
//! # Overview
//!
//! A spec file describes scenarios as directives, each followed by indented
//! shell command lines. Parsing produces a tree of [`Scenario`]s that can be
//! evaluated against any [`Context`]; [`ShellContext`] runs the commands
//! through a shell and [`Runner`] reports a result per scenario.
//!
//! # Spec Syntax
//!
//! ```text
//! A bank account is a financial account maintained by a financial
//! institution for a customer.
//!
//! Given: I have a bank account
//!     ls ./account.csv
//! And: The balance is 0
//!     ! bank check-balance ./account.csv
//! When: I try to withdraw some money
//!     bank withdraw 1000 ./account.csv > out || true
//! Then: nothing will happen
//!     ! grep '.*' out
//! (finally)
//!     rm -rf out
//! ```
//!
//! # Directives
//!
//! | Directive | Meaning |
//! |-----------|---------|
//! | `Given:` | Starts a scenario with its precondition |
//! | `When:` | Action of a behavior |
//! | `Then:` | Expected outcome of a behavior |
//! | `And:` | All chained chunks must hold |
//! | `Or:` | At least one chained chunk must hold |
//! | `(finally)` | Cleanup, always run after the scenario |
//!
//! Unindented lines that are not directives are free text and ignored.
//! A line indented less than the command line before it is ignored as
//! well; indented lines after it keep adding commands to the same
//! directive. A block ends at the next directive.

mod ast;
mod context;
mod error;
mod lexer;
mod parser;
mod runner;
mod scan;

pub use ast::{Behavior, Context, Expression, Scenario};
pub use context::{ShellContext, DEFAULT_SHELL};
pub use error::{ErrorKind, RunError};
pub use lexer::{Lexer, Token, TokenKind};
pub use parser::{parse_reader, parse_str, Parser};
pub use runner::{RunConfig, RunResult, Runner, RunnerBuilder, ScenarioResult};
pub use scan::{is_not_blank, Filtered, IterScan, Line, Lines, Scan, Unscan};
