//! Identifier types shared across crates

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of one autogroup within a waterfall layout
///
/// Ids are dense (`0..group_count`) and assigned while walking the tree in
/// preorder, so the same trace always yields the same ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GroupId(u32);

impl GroupId {
    /// Create a group id from its index
    #[inline]
    pub const fn new(index: u32) -> Self {
        GroupId(index)
    }

    /// Index into the layout's group table
    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "group-{}", self.0)
    }
}
