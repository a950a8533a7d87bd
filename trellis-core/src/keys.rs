//! Reserved keys.
//!
//! These names carry engine bookkeeping and are treated specially by
//! `set`, `reset` and the observer registry.

/// Version counter, bumped as the last record of every non-empty batch.
pub const VERSION: &str = "version";

/// Wildcard observation key. Observers registered here see every batch.
pub const WILDCARD: &str = "*";

/// Whole-collection key of a List.
pub const ITEMS: &str = "items";

/// Pseudo-key carried by index-level List records (`item:add`, `item:delete`, `reorder`).
pub const ITEMS_INDEX: &str = "items*";

/// Length of a List, kept in sync with its items.
pub const LENGTH: &str = "length";

/// Written once, on the first tracked change, when timestamps are enabled.
pub const CREATED_AT: &str = "created_at";

/// Rewritten on every tracked change when timestamps are enabled.
pub const UPDATED_AT: &str = "updated_at";

/// Keys that never trigger timestamp tracking themselves.
pub(crate) fn is_untracked(key: &str) -> bool {
    matches!(key, VERSION | CREATED_AT | UPDATED_AT)
}
