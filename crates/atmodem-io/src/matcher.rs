//! End-of-response detection.
//!
//! An AT exchange ends with a final result code (`OK`, `ERROR`,
//! `+CME ERROR: <n>`, ...) or, for data-entry commands, with the prompt
//! character. Criteria are written as strings: a plain string must match a
//! line exactly, a string containing `*` matches any line starting with the
//! text before the first `*`.

use std::fmt;

/// One end-of-response criterion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EndCriterion {
    /// The line must equal this text exactly.
    Exact(String),
    /// The line must start with this text.
    Prefix(String),
}

impl EndCriterion {
    /// Parse a criterion string.
    ///
    /// Only the text before the first `*` is kept, so `"+CME*ERROR*"`
    /// becomes `Prefix("+CME")`.
    pub fn parse(pattern: &str) -> Self {
        match pattern.find('*') {
            Some(star) => EndCriterion::Prefix(pattern[..star].to_string()),
            None => EndCriterion::Exact(pattern.to_string()),
        }
    }

    pub fn matches(&self, line: &str) -> bool {
        match self {
            EndCriterion::Exact(text) => line == text,
            EndCriterion::Prefix(prefix) => line.starts_with(prefix.as_str()),
        }
    }
}

impl From<&str> for EndCriterion {
    fn from(pattern: &str) -> Self {
        EndCriterion::parse(pattern)
    }
}

impl fmt::Display for EndCriterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EndCriterion::Exact(text) => f.write_str(text),
            EndCriterion::Prefix(prefix) => write!(f, "{prefix}*"),
        }
    }
}

/// What ended a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndMatch {
    /// The line contained the prompt character.
    Prompt,
    /// The criterion at this index matched.
    Criterion(usize),
}

/// Ordered end-of-response criteria.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EndCriteria {
    criteria: Vec<EndCriterion>,
}

impl EndCriteria {
    pub fn new() -> Self {
        Self::default()
    }

    /// The final result codes of 3GPP TS 27.007 / 27.005 in verbose mode.
    pub fn standard() -> Self {
        Self::from_patterns(["OK", "ERROR", "+CME ERROR:*", "+CMS ERROR:*"])
    }

    pub fn from_patterns<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        EndCriteria {
            criteria: patterns
                .into_iter()
                .map(|p| EndCriterion::parse(p.as_ref()))
                .collect(),
        }
    }

    pub fn push(&mut self, criterion: EndCriterion) {
        self.criteria.push(criterion);
    }

    pub fn iter(&self) -> impl Iterator<Item = &EndCriterion> {
        self.criteria.iter()
    }

    pub fn len(&self) -> usize {
        self.criteria.len()
    }

    pub fn is_empty(&self) -> bool {
        self.criteria.is_empty()
    }

    /// Find what, if anything, marks `line` as the end of a response.
    ///
    /// The prompt is checked first and wins over every criterion. Criteria
    /// are then tried in order; the first match short-circuits.
    pub fn find_end(&self, line: &str, prompt: Option<char>) -> Option<EndMatch> {
        if let Some(p) = prompt {
            if line.contains(p) {
                return Some(EndMatch::Prompt);
            }
        }
        self.criteria
            .iter()
            .position(|c| c.matches(line))
            .map(EndMatch::Criterion)
    }

    /// Whether `line` ends a response.
    pub fn is_end(&self, line: &str, prompt: Option<char>) -> bool {
        self.find_end(line, prompt).is_some()
    }
}

impl<S: AsRef<str>> FromIterator<S> for EndCriteria {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        EndCriteria::from_patterns(iter)
    }
}
