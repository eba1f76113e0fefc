use slotmap::new_key_type;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

new_key_type! {
    pub struct AtomId;
}

static NEXT_STRUCTURE_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of one `Structure` instance.
///
/// Every structure (clones included) receives a fresh id, so atom handles
/// collected from one structure can never be mistaken for handles of another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StructureId(u64);

impl StructureId {
    pub(crate) fn next() -> Self {
        Self(NEXT_STRUCTURE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for StructureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "structure#{}", self.0)
    }
}
