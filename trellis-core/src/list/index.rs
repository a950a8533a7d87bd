//! Index resolution for List keys.

use std::fmt;

/// What a List `get`/`set` key addresses: a position, or an ordinary
/// attribute of the owned model.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ListKey {
    /// A position; negative values count from the end.
    Index(isize),
    /// A non-numeric attribute path, handled by the owned model.
    Name(String),
}

impl ListKey {
    pub fn is_index(&self) -> bool {
        matches!(self, ListKey::Index(_))
    }
}

impl From<isize> for ListKey {
    fn from(index: isize) -> Self {
        ListKey::Index(index)
    }
}

impl From<i32> for ListKey {
    fn from(index: i32) -> Self {
        ListKey::Index(index as isize)
    }
}

// Integers outside `isize` saturate, so they stay out of range rather than
// wrapping around to a valid position.
impl From<i64> for ListKey {
    fn from(index: i64) -> Self {
        let saturated = if index < 0 { isize::MIN } else { isize::MAX };
        ListKey::Index(isize::try_from(index).unwrap_or(saturated))
    }
}

impl From<usize> for ListKey {
    fn from(index: usize) -> Self {
        ListKey::Index(isize::try_from(index).unwrap_or(isize::MAX))
    }
}

impl From<&str> for ListKey {
    fn from(key: &str) -> Self {
        match key.trim().parse::<isize>() {
            Ok(index) => ListKey::Index(index),
            Err(_) => ListKey::Name(key.to_owned()),
        }
    }
}

impl From<String> for ListKey {
    fn from(key: String) -> Self {
        match key.trim().parse::<isize>() {
            Ok(index) => ListKey::Index(index),
            Err(_) => ListKey::Name(key),
        }
    }
}

impl fmt::Display for ListKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ListKey::Index(index) => write!(f, "{}", index),
            ListKey::Name(name) => f.write_str(name),
        }
    }
}

/// Resolve `index` against a list of `len` items.
///
/// Negative indices count from the end. Returns `None` when the result
/// falls outside `0..len`.
pub fn normalize_index(index: isize, len: usize) -> Option<usize> {
    let resolved = if index < 0 {
        (len as isize).saturating_add(index)
    } else {
        index
    };
    (0..len as isize)
        .contains(&resolved)
        .then_some(resolved as usize)
}

/// Where an insertion at `index` lands: negative indices count from the end,
/// then the result is clamped to `0..=len`.
pub fn insertion_point(index: isize, len: usize) -> usize {
    let resolved = if index < 0 {
        (len as isize).saturating_add(index)
    } else {
        index
    };
    resolved.clamp(0, len as isize) as usize
}
