//! Spec parser
//!
//! Recursive descent over the token stream:
//!
//! ```text
//! program  := scenario*
//! scenario := chunk(Given) behavior* chunk(Finally)?
//! behavior := chunk(When)? chunk(Then)?     (at least one of them)
//! chunk(T) := T block ((And block)+ | (Or block)+)?
//! block    := Block*
//! ```
//!
//! `Text` tokens are skipped wherever they appear. A structure that does not
//! fit the grammar is not an error: parsing simply stops at the first token
//! that cannot start the next expected element.

use std::io::{self, Read};

use crate::ast::{Behavior, Expression, Scenario};
use crate::lexer::{Lexer, Token, TokenKind};
use crate::scan::{Scan, Unscan};

/// Parses scenarios from a token source
pub struct Parser<S: Scan<Item = Token>> {
    tokens: Unscan<S>,
}

impl<S: Scan<Item = Token>> Parser<S> {
    pub fn new(tokens: S) -> Self {
        Self {
            tokens: Unscan::new(tokens),
        }
    }

    /// Parse all scenarios.
    ///
    /// The first error from the token source aborts parsing; scenarios
    /// parsed before it are dropped.
    pub fn parse(&mut self) -> Result<Vec<Scenario>, S::Error> {
        let mut out = Vec::new();
        while let Some(scenario) = self.parse_scenario()? {
            log::debug!(
                "parsed scenario {:?} with {} behavior(s)",
                scenario.given.description(),
                scenario.behaviors.len()
            );
            out.push(scenario);
        }
        Ok(out)
    }

    fn parse_scenario(&mut self) -> Result<Option<Scenario>, S::Error> {
        let Some(given) = self.parse_chunk(TokenKind::Given)? else {
            return Ok(None);
        };
        let mut behaviors = Vec::new();
        while let Some(behavior) = self.parse_behavior()? {
            behaviors.push(behavior);
        }
        let finally = self.parse_chunk(TokenKind::Finally)?;
        Ok(Some(Scenario {
            given,
            behaviors,
            finally,
        }))
    }

    fn parse_behavior(&mut self) -> Result<Option<Behavior>, S::Error> {
        let when = self.parse_chunk(TokenKind::When)?;
        let then = self.parse_chunk(TokenKind::Then)?;
        if when.is_none() && then.is_none() {
            return Ok(None);
        }
        Ok(Some(Behavior { when, then }))
    }

    fn parse_chunk(&mut self, expected: TokenKind) -> Result<Option<Expression>, S::Error> {
        let Some(head) = self.scan_ignore_text()? else {
            return Ok(None);
        };
        if head.kind != expected {
            self.tokens.unscan();
            return Ok(None);
        }
        let first = self.parse_block(head)?;
        let Some(next) = self.scan_ignore_text()? else {
            return Ok(Some(first));
        };
        let chain = match next.kind {
            TokenKind::And => Expression::And(self.parse_trailing_chunks(first, next)?),
            TokenKind::Or => Expression::Or(self.parse_trailing_chunks(first, next)?),
            _ => {
                self.tokens.unscan();
                first
            }
        };
        Ok(Some(chain))
    }

    /// Collect `head` and every following chunk of the same kind as `next`.
    fn parse_trailing_chunks(
        &mut self,
        head: Expression,
        next: Token,
    ) -> Result<Vec<Expression>, S::Error> {
        let kind = next.kind;
        let mut out = vec![head, self.parse_block(next)?];
        while let Some(tok) = self.scan_ignore_text()? {
            if tok.kind != kind {
                self.tokens.unscan();
                break;
            }
            out.push(self.parse_block(tok)?);
        }
        Ok(out)
    }

    /// Gather the `Block` tokens following a directive.
    fn parse_block(&mut self, head: Token) -> Result<Expression, S::Error> {
        let mut commands = Vec::new();
        while let Some(tok) = self.scan_ignore_text()? {
            if tok.kind != TokenKind::Block {
                self.tokens.unscan();
                break;
            }
            commands.push(tok.value);
        }
        Ok(Expression::block(head.value, commands))
    }

    fn scan_ignore_text(&mut self) -> Result<Option<Token>, S::Error> {
        while let Some(tok) = self.tokens.scan()? {
            if tok.kind != TokenKind::Text {
                return Ok(Some(tok));
            }
        }
        Ok(None)
    }
}

/// Parse scenarios from a reader.
pub fn parse_reader<R: Read>(reader: R) -> io::Result<Vec<Scenario>> {
    Parser::new(Lexer::new(io::BufReader::new(reader))).parse()
}

/// Parse scenarios from a string.
pub fn parse_str(input: &str) -> Vec<Scenario> {
    // reading from memory cannot fail
    Parser::new(Lexer::new(input.as_bytes()))
        .parse()
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scan::IterScan;

    fn tok(kind: TokenKind, value: &str) -> Token {
        Token::new(kind, value)
    }

    fn parse_tokens(tokens: Vec<Token>) -> Vec<Scenario> {
        let source = IterScan::new(tokens.into_iter().map(Ok::<_, io::Error>));
        Parser::new(source).parse().unwrap()
    }

    fn block(descr: &str, commands: &[&str]) -> Expression {
        Expression::block(descr, commands.iter().map(|c| c.to_string()).collect())
    }

    fn bank_tokens() -> Vec<Token> {
        use TokenKind::*;
        vec![
            tok(Given, "I have a bank account"),
            tok(Block, "ls ./account.csv"),
            tok(And, "The balance is 0"),
            tok(Block, "! bank check-balance ./account.csv"),
            tok(When, "I try to withdraw some money"),
            tok(Block, "bank withdraw 1000 ./account.csv > out || true"),
            tok(Then, "nothing will happen"),
            tok(Block, "! grep '.*' out"),
            tok(Finally, ""),
            tok(Block, "rm -rf out"),
        ]
    }

    #[test]
    fn test_parse_bank_example() {
        let scenarios = parse_tokens(bank_tokens());
        assert_eq!(scenarios.len(), 1);
        let scenario = &scenarios[0];
        assert_eq!(
            scenario.given,
            Expression::And(vec![
                block("I have a bank account", &["ls ./account.csv"]),
                block("The balance is 0", &["! bank check-balance ./account.csv"]),
            ])
        );
        assert_eq!(
            scenario.behaviors,
            vec![Behavior {
                when: Some(block(
                    "I try to withdraw some money",
                    &["bank withdraw 1000 ./account.csv > out || true"]
                )),
                then: Some(block("nothing will happen", &["! grep '.*' out"])),
            }]
        );
        assert_eq!(scenario.finally, Some(block("", &["rm -rf out"])));
    }

    #[test]
    fn test_parse_empty_input() {
        assert!(parse_tokens(Vec::new()).is_empty());
        assert!(parse_str("").is_empty());
        assert!(parse_str("only prose\n  and an indented line\n").is_empty());
    }

    #[test]
    fn test_given_without_behaviors() {
        let scenarios = parse_str("Given: one\n  a\nGiven: two\n  b\n");
        assert_eq!(scenarios.len(), 2);
        assert!(scenarios[0].behaviors.is_empty());
        assert_eq!(scenarios[0].given, block("one", &["a"]));
        assert_eq!(scenarios[1].given, block("two", &["b"]));
    }

    #[test]
    fn test_and_chain_in_source_order() {
        let scenarios = parse_str("Given: A\n  a\nAnd: B\n  b\nAnd: C\n  c\n");
        assert_eq!(
            scenarios[0].given,
            Expression::And(vec![block("A", &["a"]), block("B", &["b"]), block("C", &["c"])])
        );
    }

    #[test]
    fn test_or_chain_stops_at_and() {
        let scenarios = parse_str("Given: A\nOr: B\nOr: C\nAnd: D\nWhen: w\n");
        let scenario = &scenarios[0];
        assert_eq!(
            scenario.given,
            Expression::Or(vec![block("A", &[]), block("B", &[]), block("C", &[])])
        );
        // a stray And after an Or chain cannot start a behavior
        assert!(scenario.behaviors.is_empty());
        assert_eq!(scenarios.len(), 1);
    }

    #[test]
    fn test_chains_on_when_and_then() {
        let input = "Given: g\nWhen: w1\nOr: w2\nThen: t1\nAnd: t2\n";
        let behavior = &parse_str(input)[0].behaviors[0];
        assert_eq!(
            behavior.when,
            Some(Expression::Or(vec![block("w1", &[]), block("w2", &[])]))
        );
        assert_eq!(
            behavior.then,
            Some(Expression::And(vec![block("t1", &[]), block("t2", &[])]))
        );
    }

    #[test]
    fn test_behaviors_with_one_side() {
        let input = "Given: g\nThen: t\nWhen: w\nWhen: w2\n  x\nThen: t2\n";
        let behaviors = &parse_str(input)[0].behaviors;
        assert_eq!(behaviors.len(), 3);
        assert_eq!(behaviors[0], Behavior { when: None, then: Some(block("t", &[])) });
        assert_eq!(behaviors[1], Behavior { when: Some(block("w", &[])), then: None });
        assert_eq!(
            behaviors[2],
            Behavior { when: Some(block("w2", &["x"])), then: Some(block("t2", &[])) }
        );
    }

    #[test]
    fn test_dedent_terminates_block() {
        let input = "Given: g\n    a\n    b\n  c\nWhen: w\n  d\n";
        let scenario = &parse_str(input)[0];
        // `c` is dedented and lexes as text, which the parser drops
        assert_eq!(scenario.given, block("g", &["a", "b"]));
        assert_eq!(scenario.behaviors[0].when, Some(block("w", &["d"])));
    }

    #[test]
    fn test_indented_lines_after_dedent_rejoin_block() {
        let scenarios = parse_str("Given: g\n    a\n  b\n    c\nWhen: w\n");
        assert_eq!(scenarios[0].given, block("g", &["a", "c"]));
        assert_eq!(scenarios[0].behaviors[0].when, Some(block("w", &[])));
    }

    #[test]
    fn test_text_between_blocks_is_skipped() {
        let scenarios = parse_tokens(vec![
            tok(TokenKind::Given, "g"),
            tok(TokenKind::Block, "a"),
            tok(TokenKind::Text, "noise"),
            tok(TokenKind::Block, "b"),
            tok(TokenKind::Text, "more noise"),
            tok(TokenKind::When, "w"),
        ]);
        assert_eq!(scenarios[0].given, block("g", &["a", "b"]));
        assert_eq!(scenarios[0].behaviors[0].when, Some(block("w", &[])));
    }

    #[test]
    fn test_scenario_count() {
        let group = "Given: g\n  true\nWhen: w\n  true\nThen: t\n  true\n";
        let input = group.repeat(5);
        assert_eq!(parse_str(&input).len(), 5);
    }

    #[test]
    fn test_finally_continues_to_next_scenario() {
        let input = "Given: a\nWhen: w\n(finally)\n  cleanup\nGiven: b\nThen: t\n";
        let scenarios = parse_str(input);
        assert_eq!(scenarios.len(), 2);
        assert_eq!(scenarios[0].finally, Some(block("", &["cleanup"])));
        assert_eq!(scenarios[1].given, block("b", &[]));
        assert_eq!(scenarios[1].finally, None);
    }

    #[test]
    fn test_leading_block_stops_parse() {
        let scenarios = parse_str("  orphan\nGiven: g\n");
        assert!(scenarios.is_empty());
    }

    #[test]
    fn test_source_error_aborts_parse() {
        let items = vec![
            Ok(tok(TokenKind::Given, "g")),
            Ok(tok(TokenKind::Block, "a")),
            Ok(tok(TokenKind::Given, "h")),
            Err(io::Error::new(io::ErrorKind::UnexpectedEof, "truncated")),
        ];
        let err = Parser::new(IterScan::new(items.into_iter())).parse().unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    /// A reader that yields its data and then fails
    struct FailingReader {
        data: io::Cursor<Vec<u8>>,
    }

    impl Read for FailingReader {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let n = self.data.read(buf)?;
            if n == 0 {
                return Err(io::Error::new(io::ErrorKind::ConnectionReset, "peer went away"));
            }
            Ok(n)
        }
    }

    #[test]
    fn test_read_error_reaches_parser_unchanged() {
        let reader = io::BufReader::new(FailingReader {
            data: io::Cursor::new(b"Given: g\n  a\nWhen: w\n  b\n".to_vec()),
        });
        let result = Parser::new(Lexer::new(reader)).parse();
        let err = result.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::ConnectionReset);
        assert_eq!(err.to_string(), "peer went away");
    }

    #[test]
    fn test_parse_reader_accepts_invalid_utf8() {
        let input: &[u8] = b"Caf\xe9 notes\nGiven: g\n  printf '\xff' > f\n";
        let scenarios = parse_reader(input).unwrap();
        assert_eq!(scenarios.len(), 1);
        assert_eq!(scenarios[0].given, block("g", &["printf '\u{FFFD}' > f"]));
    }

    #[test]
    fn test_trailing_carriage_return_is_dropped() {
        let scenarios = parse_str("Given: g\r\n  a\r\nWhen: w\r");
        assert_eq!(scenarios[0].given, block("g", &["a"]));
        assert_eq!(scenarios[0].behaviors[0].when, Some(block("w", &[])));
    }

    #[test]
    fn test_lexer_and_parser_agree_on_bank_example() {
        let input = "\
Intro prose.

Given: I have a bank account
\tls ./account.csv
And: The balance is 0
\t! bank check-balance ./account.csv
When: I try to withdraw some money
\tbank withdraw 1000 ./account.csv > out || true
Then: nothing will happen
\t! grep '.*' out
(finally)
\trm -rf out
";
        assert_eq!(parse_str(input), parse_tokens(bank_tokens()));
    }
}
