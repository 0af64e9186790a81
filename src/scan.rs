//! Line scanning
//!
//! Every layer of the front end pulls items one at a time through the
//! [`Scan`] trait: raw lines from a reader, filtered lines, and tokens.
//! [`Unscan`] adds a one-slot rewind on top of any of them.

use std::io::{self, BufRead};

/// A pull-based source of items.
///
/// `Ok(Some(item))` is the next item, `Ok(None)` is ordinary end of input,
/// and `Err` is a read failure of the underlying source.
pub trait Scan {
    type Item;
    type Error;

    fn scan(&mut self) -> Result<Option<Self::Item>, Self::Error>;
}

/// A single line of input
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    /// 1-based line number in the source
    pub number: usize,
    /// Line text without its terminator
    pub text: String,
}

/// Reads lines from a buffered reader.
///
/// Lines end at `\n`; a `\r` before it, or at the very end of input, is
/// dropped too. Bytes that are not valid UTF-8 become U+FFFD.
pub struct Lines<R> {
    reader: R,
    number: usize,
    done: bool,
}

impl<R: BufRead> Lines<R> {
    pub fn new(reader: R) -> Self {
        Self { reader, number: 0, done: false }
    }
}

impl<R: BufRead> Scan for Lines<R> {
    type Item = Line;
    type Error = io::Error;

    fn scan(&mut self) -> Result<Option<Line>, io::Error> {
        if self.done {
            return Ok(None);
        }
        let mut buf = Vec::new();
        let n = match self.reader.read_until(b'\n', &mut buf) {
            Ok(n) => n,
            Err(e) => {
                self.done = true;
                return Err(e);
            }
        };
        if n == 0 {
            self.done = true;
            return Ok(None);
        }
        if buf.last() == Some(&b'\n') {
            buf.pop();
        }
        if buf.last() == Some(&b'\r') {
            buf.pop();
        }
        self.number += 1;
        // invalid UTF-8 is replaced, never an error
        let text = String::from_utf8_lossy(&buf).into_owned();
        Ok(Some(Line { number: self.number, text }))
    }
}

/// Skips every item the predicate rejects.
///
/// Skipped items are consumed from the inner source, so an [`Unscan`]
/// stacked on top only ever rewinds to an accepted item.
pub struct Filtered<S, F> {
    inner: S,
    filter: F,
}

impl<S, F> Filtered<S, F>
where
    S: Scan,
    F: FnMut(&S::Item) -> bool,
{
    pub fn new(inner: S, filter: F) -> Self {
        Self { inner, filter }
    }
}

impl<S, F> Scan for Filtered<S, F>
where
    S: Scan,
    F: FnMut(&S::Item) -> bool,
{
    type Item = S::Item;
    type Error = S::Error;

    fn scan(&mut self) -> Result<Option<S::Item>, S::Error> {
        while let Some(item) = self.inner.scan()? {
            if (self.filter)(&item) {
                return Ok(Some(item));
            }
        }
        Ok(None)
    }
}

/// Line filter accepting anything but blank or whitespace-only lines.
pub fn is_not_blank(line: &Line) -> bool {
    line.text.bytes().any(|b| b != b' ' && b != b'\t')
}

/// One-slot rewind over any [`Scan`].
///
/// After [`Unscan::unscan`], the next call to `scan` returns the most
/// recently scanned item again instead of pulling a new one.
pub struct Unscan<S: Scan> {
    inner: S,
    last: Option<S::Item>,
    replay: bool,
}

impl<S: Scan> Unscan<S>
where
    S::Item: Clone,
{
    pub fn new(inner: S) -> Self {
        Self { inner, last: None, replay: false }
    }

    /// Push the last scanned item back.
    ///
    /// Only one level is kept: repeated calls before the next `scan` are
    /// no-ops, as is a call made before anything was scanned.
    pub fn unscan(&mut self) {
        if self.last.is_some() {
            self.replay = true;
        }
    }
}

impl<S: Scan> Scan for Unscan<S>
where
    S::Item: Clone,
{
    type Item = S::Item;
    type Error = S::Error;

    fn scan(&mut self) -> Result<Option<S::Item>, S::Error> {
        if self.replay {
            self.replay = false;
            return Ok(self.last.clone());
        }
        let item = self.inner.scan()?;
        self.last = item.clone();
        Ok(item)
    }
}

/// Adapts an iterator of results into a [`Scan`].
pub struct IterScan<I>(I);

impl<I> IterScan<I> {
    pub fn new(iter: I) -> Self {
        Self(iter)
    }
}

impl<I, T, E> Scan for IterScan<I>
where
    I: Iterator<Item = Result<T, E>>,
{
    type Item = T;
    type Error = E;

    fn scan(&mut self) -> Result<Option<T>, E> {
        self.0.next().transpose()
    }
}
