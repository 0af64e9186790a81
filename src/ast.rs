//! Syntax tree of a parsed spec
//!
//! The tree only describes what to run. Evaluation is dispatched into a
//! [`Context`], which decides how blocks are executed and how `And`/`Or`
//! combine their children.

use std::fmt;

/// Executes expressions on behalf of the tree.
pub trait Context {
    type Error;

    /// Run the commands of a single block.
    fn run(&mut self, description: &str, commands: &[String]) -> Result<bool, Self::Error>;

    /// Evaluate children that must all hold.
    fn and(&mut self, children: &[Expression]) -> Result<bool, Self::Error>;

    /// Evaluate children of which at least one must hold.
    fn or(&mut self, children: &[Expression]) -> Result<bool, Self::Error>;
}

/// A chunk of a spec: a single block or an `And`/`Or` chain of blocks
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expression {
    Block {
        description: String,
        commands: Vec<String>,
    },
    And(Vec<Expression>),
    Or(Vec<Expression>),
}

impl Expression {
    pub fn block(description: impl Into<String>, commands: Vec<String>) -> Self {
        Expression::Block {
            description: description.into(),
            commands,
        }
    }

    pub fn eval<C: Context + ?Sized>(&self, ctx: &mut C) -> Result<bool, C::Error> {
        match self {
            Expression::Block { description, commands } => ctx.run(description, commands),
            Expression::And(children) => ctx.and(children),
            Expression::Or(children) => ctx.or(children),
        }
    }

    /// Description of the first block in the expression.
    pub fn description(&self) -> &str {
        match self {
            Expression::Block { description, .. } => description,
            Expression::And(children) | Expression::Or(children) => {
                children.first().map_or("", |c| c.description())
            }
        }
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Block { description, commands } => {
                write!(f, "Block{{{} {:?}}}", description, commands)
            }
            Expression::And(children) => write!(f, "And{{{}}}", join(children)),
            Expression::Or(children) => write!(f, "Or{{{}}}", join(children)),
        }
    }
}

fn join(children: &[Expression]) -> String {
    children.iter().map(|c| c.to_string()).collect::<Vec<_>>().join(" ")
}

fn optional(expr: &Option<Expression>) -> String {
    expr.as_ref().map_or_else(|| "<none>".to_string(), |e| e.to_string())
}

/// One `When`/`Then` pair. At least one side is present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Behavior {
    pub when: Option<Expression>,
    pub then: Option<Expression>,
}

impl fmt::Display for Behavior {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Behavior{{When: {} Then: {}}}", optional(&self.when), optional(&self.then))
    }
}

/// A `Given` precondition, its behaviors and an optional `(finally)` cleanup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scenario {
    pub given: Expression,
    pub behaviors: Vec<Behavior>,
    pub finally: Option<Expression>,
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let behaviors = self.behaviors.iter().map(|b| b.to_string()).collect::<Vec<_>>();
        write!(f, "Scenario{{{} [{}]", self.given, behaviors.join(" "))?;
        if let Some(ref finally) = self.finally {
            write!(f, " Finally: {}", finally)?;
        }
        write!(f, "}}")
    }
}
