//! Newtypes for the two address spaces the pipeline moves between.
//!
//! A `VirtualAddr` is a runtime address as captured in a sample; a
//! `FileOffset` is an address relative to the start of the binary's
//! executable section. Mixing the two is the classic symbolization bug,
//! so they are distinct types.

use std::fmt;

/// Runtime virtual address from a captured stack frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VirtualAddr(pub u64);

/// Address relative to the start of the binary's executable section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FileOffset(pub u64);

impl VirtualAddr {
    #[must_use]
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl FileOffset {
    #[must_use]
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for VirtualAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

impl fmt::Display for FileOffset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}
