//! Per-direction behaviour flags for a pipe.

use std::fmt;
use std::ops::{BitAnd, BitAndAssign, BitOr, BitOrAssign};

/// Bitfield selecting optional behaviours for one direction of a pipe.
///
/// Each pipe carries two independent flag sets, one for the write
/// direction and one for the read direction. Flags combine with the
/// standard bit operators:
///
/// ```
/// use pipe::PipeFlags;
///
/// let flags = PipeFlags::NO_COPY | PipeFlags::INVISIBLE;
/// assert!(flags.contains(PipeFlags::NO_COPY));
/// assert!(!flags.contains(PipeFlags::SYNC));
/// ```
#[derive(Clone, Copy, Default, Eq, Hash, PartialEq)]
pub struct PipeFlags {
    bits: u8,
}

impl PipeFlags {
    const fn new(bits: u8) -> Self {
        Self { bits }
    }

    /// No special behaviour.
    pub const EMPTY: Self = Self::new(0);
    /// Zero-copy appends: shared buffers are aliased rather than copied.
    /// The producer must not expect the bytes back until they drain.
    pub const NO_COPY: Self = Self::new(0x01);
    /// Synchronous appends: each append blocks until the buffer drains
    /// to empty.
    pub const SYNC: Self = Self::new(0x02);
    /// Hides the owning pipe from the half's accessor, turning the half
    /// into an opaque handle. Once set, flag assignment preserves it.
    pub const INVISIBLE: Self = Self::new(0x80);

    /// Returns a bitfield constructed from the raw `bits` without masking.
    #[must_use]
    pub const fn from_bits(bits: u8) -> Self {
        Self { bits }
    }

    /// Returns the raw bit representation.
    #[must_use]
    pub const fn bits(self) -> u8 {
        self.bits
    }

    /// Returns `true` when no flags are set.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.bits == 0
    }

    /// Checks whether all flags in `other` are set in `self`.
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        (self.bits & other.bits) == other.bits
    }

    /// Returns the union of both operands.
    #[must_use]
    pub const fn union(self, other: Self) -> Self {
        Self::new(self.bits | other.bits)
    }

    /// Returns the intersection of both operands.
    #[must_use]
    pub const fn intersection(self, other: Self) -> Self {
        Self::new(self.bits & other.bits)
    }
}

impl BitOr for PipeFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}

impl BitOrAssign for PipeFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        *self = self.union(rhs);
    }
}

impl BitAnd for PipeFlags {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self {
        self.intersection(rhs)
    }
}

impl BitAndAssign for PipeFlags {
    fn bitand_assign(&mut self, rhs: Self) {
        *self = self.intersection(rhs);
    }
}

impl fmt::Debug for PipeFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("PipeFlags(EMPTY)");
        }
        let mut names = Vec::new();
        if self.contains(Self::NO_COPY) {
            names.push("NO_COPY");
        }
        if self.contains(Self::SYNC) {
            names.push("SYNC");
        }
        if self.contains(Self::INVISIBLE) {
            names.push("INVISIBLE");
        }
        let known = Self::NO_COPY.bits | Self::SYNC.bits | Self::INVISIBLE.bits;
        let unknown = self.bits & !known;
        if unknown != 0 {
            return write!(f, "PipeFlags({} | {unknown:#04x})", names.join(" | "));
        }
        write!(f, "PipeFlags({})", names.join(" | "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_empty() {
        assert!(PipeFlags::default().is_empty());
        assert_eq!(PipeFlags::default(), PipeFlags::EMPTY);
    }

    #[test]
    fn union_combines_bits() {
        let flags = PipeFlags::NO_COPY | PipeFlags::SYNC;
        assert!(flags.contains(PipeFlags::NO_COPY));
        assert!(flags.contains(PipeFlags::SYNC));
        assert!(!flags.contains(PipeFlags::INVISIBLE));
    }

    #[test]
    fn contains_requires_all_bits() {
        let flags = PipeFlags::NO_COPY;
        assert!(!flags.contains(PipeFlags::NO_COPY | PipeFlags::SYNC));
    }

    #[test]
    fn intersection_keeps_common_bits() {
        let a = PipeFlags::NO_COPY | PipeFlags::INVISIBLE;
        let b = PipeFlags::INVISIBLE | PipeFlags::SYNC;
        assert_eq!(a & b, PipeFlags::INVISIBLE);
    }

    #[test]
    fn bits_roundtrip() {
        let flags = PipeFlags::from_bits(0x83);
        assert_eq!(flags.bits(), 0x83);
        assert!(flags.contains(PipeFlags::INVISIBLE));
    }

    #[test]
    fn debug_lists_flag_names() {
        let rendered = format!("{:?}", PipeFlags::NO_COPY | PipeFlags::INVISIBLE);
        assert!(rendered.contains("NO_COPY"));
        assert!(rendered.contains("INVISIBLE"));
    }
}
