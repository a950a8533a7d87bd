//! Value matchers for [`Model::test`](super::Model::test).

use regex::Regex;

use crate::value::Value;

/// Either a literal to compare against or a pattern run over the
/// stringified value.
#[derive(Debug, Clone)]
pub enum Matcher {
    Equals(Value),
    Pattern(Regex),
}

impl Matcher {
    pub fn equals(value: impl Into<Value>) -> Self {
        Matcher::Equals(value.into())
    }

    /// Compile a pattern matcher.
    pub fn pattern(pattern: &str) -> Result<Self, regex::Error> {
        Ok(Matcher::Pattern(Regex::new(pattern)?))
    }

    /// Test a possibly absent value. Absent values never match.
    pub fn matches(&self, value: Option<&Value>) -> bool {
        let Some(value) = value else {
            return false;
        };
        match self {
            Matcher::Equals(expected) => value == expected,
            Matcher::Pattern(pattern) => pattern.is_match(&value.to_string()),
        }
    }
}

impl From<Value> for Matcher {
    fn from(value: Value) -> Self {
        Matcher::Equals(value)
    }
}

impl From<Regex> for Matcher {
    fn from(pattern: Regex) -> Self {
        Matcher::Pattern(pattern)
    }
}
