use crate::{Attrs, Class, Identity};

/// Access right requested from a node.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Access {
    Read,
    Write,
    Execute,
}

impl Access {
    fn bit(self) -> u16 {
        match self {
            Access::Read => 0o4,
            Access::Write => 0o2,
            Access::Execute => 0o1,
        }
    }
}

/// Class of `who` relative to a node: owner wins over group, group over
/// other, with no fallthrough (an owner without `w` doesn't get it from the
/// group triplet).
pub fn class_of(attrs: &Attrs, who: &Identity) -> Class {
    if attrs.uid == who.uid {
        Class::Owner
    } else if who.in_group(attrs.gid) {
        Class::Group
    } else {
        Class::Other
    }
}

pub fn can(attrs: &Attrs, who: &Identity, access: Access) -> bool {
    if who.is_privileged() {
        return true;
    }

    attrs.mode.class_bits(class_of(attrs, who)) & access.bit() != 0
}

/// `chmod` is reserved for the owner and privileged principals.
pub fn can_chmod(attrs: &Attrs, who: &Identity) -> bool {
    who.is_privileged() || attrs.uid == who.uid
}

/// Ordinary owners can't give ownership away.
pub fn can_chown(who: &Identity) -> bool {
    who.is_privileged()
}

/// Extra restriction for removing or renaming `entry` out of `dir`: when the
/// directory is sticky, only the entry's owner, the directory's owner or a
/// privileged principal may do it.
pub fn can_unlink(dir: &Attrs, entry: &Attrs, who: &Identity) -> bool {
    !dir.mode.is_sticky() || who.is_privileged() || who.uid == dir.uid || who.uid == entry.uid
}
