//! Spec tokenizer
//!
//! Turns filtered input lines into tokens:
//! - an unindented line starting with `Given:`, `When:`, `Then:`, `And:`,
//!   `Or:` or `(finally)` is a directive token carrying the rest of the line
//! - an indented line is a `Block` token as long as its indentation does not
//!   drop below the previous block line's indentation
//! - anything else is a `Text` token
//!
//! Blank and whitespace-only lines never reach the tokenizer.

use std::fmt;
use std::io::{self, BufRead};

use crate::scan::{is_not_blank, Filtered, Line, Lines, Scan};

/// The kind of a lexical token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    /// An unrecognized, unindented line
    Text,
    /// An indented command line
    Block,
    Given,
    And,
    Or,
    When,
    Then,
    Finally,
}

/// Directives in match order. The first matching prefix wins.
const DIRECTIVES: [TokenKind; 6] = [
    TokenKind::Given,
    TokenKind::When,
    TokenKind::Then,
    TokenKind::And,
    TokenKind::Or,
    TokenKind::Finally,
];

impl TokenKind {
    /// The literal that introduces this directive, if it is one.
    pub fn directive(self) -> Option<&'static str> {
        match self {
            TokenKind::Given => Some("Given:"),
            TokenKind::And => Some("And:"),
            TokenKind::Or => Some("Or:"),
            TokenKind::When => Some("When:"),
            TokenKind::Then => Some("Then:"),
            TokenKind::Finally => Some("(finally)"),
            TokenKind::Text | TokenKind::Block => None,
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Text => f.write_str("<Text>"),
            TokenKind::Block => f.write_str("<Block>"),
            other => f.write_str(other.directive().unwrap_or_default()),
        }
    }
}

/// A token and its trimmed value
#[derive(Debug, Clone)]
pub struct Token {
    pub kind: TokenKind,
    pub value: String,
    /// Source line the token came from (0 when not read from a source)
    pub line: usize,
}

impl Token {
    pub fn new(kind: TokenKind, value: impl Into<String>) -> Self {
        Self { kind, value: value.into(), line: 0 }
    }

    fn at(kind: TokenKind, value: &str, line: usize) -> Self {
        Self { kind, value: trim(value).to_string(), line }
    }
}

/// Tokens compare by kind and value; the source line is informational.
impl PartialEq for Token {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind && self.value == other.value
    }
}

impl Eq for Token {}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}){:?}", self.kind, self.value)
    }
}

type BlankFilter<R> = Filtered<Lines<R>, fn(&Line) -> bool>;

/// Tokenizer over a line source
pub struct Lexer<S> {
    lines: S,
    last_indent: usize,
}

impl<R: BufRead> Lexer<BlankFilter<R>> {
    /// Tokenize text read from `reader`, ignoring blank lines.
    pub fn new(reader: R) -> Self {
        let filter: fn(&Line) -> bool = is_not_blank;
        Self::from_scan(Filtered::new(Lines::new(reader), filter))
    }
}

impl<S> Lexer<S>
where
    S: Scan<Item = Line, Error = io::Error>,
{
    /// Tokenize an already prepared line source.
    pub fn from_scan(lines: S) -> Self {
        Self { lines, last_indent: 0 }
    }

    /// Produce the next token, `Ok(None)` at end of input.
    pub fn next_token(&mut self) -> io::Result<Option<Token>> {
        let Some(line) = self.lines.scan()? else {
            return Ok(None);
        };
        let token = self.classify(&line);
        log::trace!("line {}: {}", line.number, token);
        Ok(Some(token))
    }

    fn classify(&mut self, line: &Line) -> Token {
        let indent = indent_width(&line.text);
        if indent > 0 && indent >= self.last_indent {
            self.last_indent = indent;
            return Token::at(TokenKind::Block, &line.text, line.number);
        }
        self.last_indent = 0;
        match parse_directive(&line.text) {
            Some((kind, rest)) => Token::at(kind, rest, line.number),
            None => Token::at(TokenKind::Text, &line.text, line.number),
        }
    }
}

impl<S> Scan for Lexer<S>
where
    S: Scan<Item = Line, Error = io::Error>,
{
    type Item = Token;
    type Error = io::Error;

    fn scan(&mut self) -> io::Result<Option<Token>> {
        self.next_token()
    }
}

impl<S> Iterator for Lexer<S>
where
    S: Scan<Item = Line, Error = io::Error>,
{
    type Item = io::Result<Token>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_token().transpose()
    }
}

fn parse_directive(line: &str) -> Option<(TokenKind, &str)> {
    DIRECTIVES.iter().find_map(|&kind| {
        let prefix = kind.directive()?;
        line.strip_prefix(prefix).map(|rest| (kind, rest))
    })
}

/// Number of leading space and tab characters.
fn indent_width(line: &str) -> usize {
    line.bytes().take_while(|&b| b == b' ' || b == b'\t').count()
}

fn trim(s: &str) -> &str {
    s.trim_matches(|c| c == ' ' || c == '\t')
}
