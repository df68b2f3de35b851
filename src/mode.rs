use crate::{FsError, FsResult, NodeKind};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Permission bits of a node: `rwx` for owner, group and other, plus the
/// setuid, setgid and sticky flags.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Mode(u16);

impl Mode {
    pub const SETUID: u16 = 0o4000;
    pub const SETGID: u16 = 0o2000;
    pub const STICKY: u16 = 0o1000;
    pub const MASK: u16 = 0o7777;

    pub const DIR_DEFAULT: Self = Self(0o755);
    pub const FILE_DEFAULT: Self = Self(0o644);

    pub fn new(bits: u16) -> Self {
        Self(bits & Self::MASK)
    }

    /// Parses an octal mode such as `755` or `1777`.
    pub fn parse(s: &str) -> FsResult<Self> {
        let bits = u16::from_str_radix(s, 8)
            .ok()
            .filter(|bits| *bits <= Self::MASK)
            .ok_or_else(|| FsError::InvalidArgument(format!("invalid mode: {:?}", s)))?;

        Ok(Self(bits))
    }

    pub fn bits(self) -> u16 {
        self.0
    }

    pub fn is_sticky(self) -> bool {
        self.0 & Self::STICKY != 0
    }

    /// The three `rwx` bits for one class, shifted down to `0..=7`.
    pub fn class_bits(self, class: Class) -> u16 {
        let shift = match class {
            Class::Owner => 6,
            Class::Group => 3,
            Class::Other => 0,
        };

        (self.0 >> shift) & 0o7
    }

    /// Renders the mode the way `ls -l` does, including the kind prefix.
    pub fn display(self, kind: NodeKind) -> String {
        let mut out = String::with_capacity(10);

        out.push(match kind {
            NodeKind::Directory => 'd',
            NodeKind::File => '-',
        });

        for (class, special, special_char) in [
            (Class::Owner, Self::SETUID, 's'),
            (Class::Group, Self::SETGID, 's'),
            (Class::Other, Self::STICKY, 't'),
        ] {
            let bits = self.class_bits(class);

            out.push(if bits & 0o4 != 0 { 'r' } else { '-' });
            out.push(if bits & 0o2 != 0 { 'w' } else { '-' });

            out.push(match (bits & 0o1 != 0, self.0 & special != 0) {
                (true, true) => special_char,
                (false, true) => special_char.to_ascii_uppercase(),
                (true, false) => 'x',
                (false, false) => '-',
            });
        }

        out
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04o}", self.0)
    }
}

/// Which triplet of the mode applies to a caller.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Class {
    Owner,
    Group,
    Other,
}
