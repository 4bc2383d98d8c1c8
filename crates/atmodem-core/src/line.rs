//! The [`Line`] value: one complete unit of modem output.

use std::fmt;
use std::ops::Deref;

/// One complete, terminator-stripped line of modem output.
///
/// Lines are immutable once framed. They move by value from the framer
/// through the classifier into exactly one channel, and are dropped when
/// the consumer is done with them.
///
/// CR and LF never appear inside a `Line`. A prompt character, when prompt
/// mode is active, is kept as the last character.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Line(String);

impl Line {
    /// Build a line from raw modem bytes. Invalid UTF-8 is replaced with
    /// U+FFFD rather than rejected; modems occasionally emit line noise.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Line(String::from_utf8_lossy(bytes).into_owned())
    }

    /// Borrow the line text.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume the line, returning the owned text.
    pub fn into_string(self) -> String {
        self.0
    }
}

impl Deref for Line {
    type Target = str;

    fn deref(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for Line {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Line {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Line {
    fn from(s: &str) -> Self {
        Line(s.to_string())
    }
}

impl From<String> for Line {
    fn from(s: String) -> Self {
        Line(s)
    }
}

impl From<Line> for String {
    fn from(line: Line) -> Self {
        line.0
    }
}

impl PartialEq<str> for Line {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for Line {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}
