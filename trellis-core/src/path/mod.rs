//! Dotted key paths.
//!
//! A [`Path`] addresses a location inside a model's nested store, e.g.
//! `"user.address.city"`. Paths are parsed once into segments; the
//! [`accessor`] functions are the only code that walks raw nested values.
//!
//! Segments are plain strings. A segment that parses as an unsigned integer
//! also addresses an array element when the container at that point is an
//! array.

mod accessor;

pub use accessor::{exists, nested_model, read, remove, write};

use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use smallvec::SmallVec;

/// A parsed, dot-delimited path.
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Path(SmallVec<[String; 4]>);

impl Path {
    /// The empty path, addressing the store root.
    #[inline]
    pub fn root() -> Self {
        Self(SmallVec::new())
    }

    /// Parse a dotted path. Empty segments are dropped, so `"a..b"` is `a.b`
    /// and `""` is the root.
    pub fn parse(path: &str) -> Self {
        Self(
            path.split('.')
                .filter(|segment| !segment.is_empty())
                .map(str::to_owned)
                .collect(),
        )
    }

    /// Build a path from already-split segments.
    pub fn from_segments<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(segments.into_iter().map(Into::into).collect())
    }

    #[inline]
    pub fn segments(&self) -> &[String] {
        &self.0
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[inline]
    pub fn first(&self) -> Option<&str> {
        self.0.first().map(String::as_str)
    }

    #[inline]
    pub fn last(&self) -> Option<&str> {
        self.0.last().map(String::as_str)
    }

    /// Append a segment (mutating).
    pub fn push(&mut self, segment: impl Into<String>) {
        self.0.push(segment.into());
    }

    /// A new path with `segment` appended.
    pub fn child(&self, segment: impl Into<String>) -> Path {
        let mut result = self.clone();
        result.push(segment);
        result
    }

    /// The path without its last segment, or `None` at the root.
    pub fn parent(&self) -> Option<Path> {
        if self.0.is_empty() {
            None
        } else {
            Some(Path(self.0[..self.0.len() - 1].iter().cloned().collect()))
        }
    }

    /// The segments from `start` onward.
    pub fn tail(&self, start: usize) -> Path {
        Path(self.0.iter().skip(start).cloned().collect())
    }

    /// True if every segment of `self` matches the start of `other`.
    /// A path is a prefix of itself.
    pub fn is_prefix_of(&self, other: &Path) -> bool {
        other.0.starts_with(&self.0)
    }

    /// Like [`is_prefix_of`](Self::is_prefix_of), excluding equality.
    pub fn is_ancestor_of(&self, other: &Path) -> bool {
        self.len() < other.len() && self.is_prefix_of(other)
    }

    /// Proper ancestors, nearest first (`a.b.c` yields `a.b`, then `a`).
    pub fn ancestors(&self) -> impl Iterator<Item = Path> + '_ {
        (1..self.0.len())
            .rev()
            .map(move |end| Path(self.0[..end].iter().cloned().collect()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            f.write_str(segment)?;
        }
        Ok(())
    }
}

impl FromStr for Path {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Path::parse(s))
    }
}

impl From<&str> for Path {
    fn from(s: &str) -> Self {
        Path::parse(s)
    }
}

impl From<String> for Path {
    fn from(s: String) -> Self {
        Path::parse(&s)
    }
}

impl From<&String> for Path {
    fn from(s: &String) -> Self {
        Path::parse(s)
    }
}

impl From<&Path> for Path {
    fn from(path: &Path) -> Self {
        path.clone()
    }
}
