//! The flags word passed to every clone call. Bit values match `<sys/clonefile.h>` on Darwin.

use std::fmt;
use std::ops::{BitOr, BitOrAssign};

use super::*;

#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct CloneFlags(u32);

impl CloneFlags {
    /// Don't follow the source if it's a symbolic link. The link itself is cloned.
    pub const NOFOLLOW: Self = Self(0x0001);
    /// Don't copy ownership information from the source.
    pub const NOOWNERCOPY: Self = Self(0x0002);
    /// Copy the source's access control list to the destination.
    pub const ACL: Self = Self(0x0004);
    /// Don't follow symbolic links anywhere in the source or destination paths.
    pub const NOFOLLOW_ANY: Self = Self(0x0008);

    const KNOWN: u32 = 0x000f;

    const NAMES: [(Self, &'static str); 4] = [
        (Self::NOFOLLOW, "NOFOLLOW"),
        (Self::NOOWNERCOPY, "NOOWNERCOPY"),
        (Self::ACL, "ACL"),
        (Self::NOFOLLOW_ANY, "NOFOLLOW_ANY"),
    ];

    pub const fn empty() -> Self {
        Self(0)
    }

    pub fn from_bits(bits: u32) -> PubResult<Self> {
        if bits & !Self::KNOWN != 0 {
            return Err(Error::InvalidFlags(bits));
        }
        Ok(Self(bits))
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// The flags in self that aren't in `allowed`.
    pub const fn difference(self, allowed: Self) -> Self {
        Self(self.0 & !allowed.0)
    }
}

impl BitOr for CloneFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for CloneFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl fmt::Debug for CloneFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("CloneFlags(empty)");
        }
        f.write_str("CloneFlags(")?;
        let mut first = true;
        for (flag, name) in Self::NAMES {
            if self.contains(flag) {
                if !first {
                    f.write_str(" | ")?;
                }
                f.write_str(name)?;
                first = false;
            }
        }
        f.write_str(")")
    }
}
