//! Page Status Bitmask
//!
//! A node's lifecycle state is a single integer column so that predicate
//! filters ("only live pages") stay cheap bitwise tests in the store.

use serde::{Deserialize, Serialize};

/// Bitmask of page lifecycle flags.
///
/// Stored as one integer column (`status_flags`). Flags are independently
/// mutable; structural mutations never touch them except through the
/// explicit publish/unpublish operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StatusFlags(pub u32);

impl StatusFlags {
    /// Page is live and routable.
    pub const PUBLISHED: StatusFlags = StatusFlags(1 << 0);
    /// Page is excluded from menus and listings but still routable.
    pub const HIDDEN: StatusFlags = StatusFlags(1 << 1);
    /// Page is soft-deleted pending cleanup.
    pub const DELETED: StatusFlags = StatusFlags(1 << 2);

    /// Empty flag set.
    pub const fn empty() -> Self {
        StatusFlags(0)
    }

    /// True if every bit in `other` is set in `self`.
    pub const fn contains(self, other: StatusFlags) -> bool {
        self.0 & other.0 == other.0
    }

    /// True if any bit in `other` is set in `self`.
    pub const fn intersects(self, other: StatusFlags) -> bool {
        self.0 & other.0 != 0
    }

    /// Set the bits in `other`.
    pub fn insert(&mut self, other: StatusFlags) {
        self.0 |= other.0;
    }

    /// Clear the bits in `other`.
    pub fn remove(&mut self, other: StatusFlags) {
        self.0 &= !other.0;
    }

    /// Union of two flag sets.
    pub const fn union(self, other: StatusFlags) -> StatusFlags {
        StatusFlags(self.0 | other.0)
    }

    /// Convenience check for the common "is live" predicate.
    pub const fn is_published(self) -> bool {
        self.contains(StatusFlags::PUBLISHED)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_remove_contains() {
        let mut flags = StatusFlags::empty();
        assert!(!flags.is_published());

        flags.insert(StatusFlags::PUBLISHED);
        flags.insert(StatusFlags::HIDDEN);
        assert!(flags.contains(StatusFlags::PUBLISHED));
        assert!(flags.contains(StatusFlags::HIDDEN));
        assert!(flags.contains(StatusFlags::PUBLISHED.union(StatusFlags::HIDDEN)));

        flags.remove(StatusFlags::PUBLISHED);
        assert!(!flags.is_published());
        assert!(flags.contains(StatusFlags::HIDDEN));
    }

    #[test]
    fn test_intersects() {
        let flags = StatusFlags::PUBLISHED;
        assert!(flags.intersects(StatusFlags::PUBLISHED.union(StatusFlags::DELETED)));
        assert!(!flags.intersects(StatusFlags::DELETED));
    }

    #[test]
    fn test_serde_transparent() {
        let flags = StatusFlags::PUBLISHED.union(StatusFlags::DELETED);
        let json = serde_json::to_string(&flags).unwrap();
        assert_eq!(json, "5");
        let back: StatusFlags = serde_json::from_str(&json).unwrap();
        assert_eq!(back, flags);
    }
}
