//! Change records and change sets.
//!
//! Every notifiable mutation produces one [`Change`]. A delivery cycle
//! collects the changes it processed, appends the version bump, and hands
//! the whole ordered batch to each interested observer as a [`ChangeSet`].
//! Observers pick out what they care about with the query helpers.

mod record;
mod set;

pub use record::{Change, ChangeKind};
pub use set::{ChangeQuery, ChangeSet};
