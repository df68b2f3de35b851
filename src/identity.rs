use serde::{Deserialize, Serialize};

/// Effective identity a filesystem call is evaluated under.
///
/// Identities are handed in by the user/session layer; the filesystem never
/// authenticates them.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub uid: u32,
    pub gid: u32,

    /// Supplementary groups.
    #[serde(default)]
    pub groups: Vec<u32>,
}

impl Identity {
    pub const ROOT_UID: u32 = 0;

    pub fn new(uid: u32, gid: u32) -> Self {
        Self {
            uid,
            gid,
            groups: Vec::new(),
        }
    }

    pub fn root() -> Self {
        Self::new(Self::ROOT_UID, 0)
    }

    pub fn with_groups(mut self, groups: impl IntoIterator<Item = u32>) -> Self {
        self.groups.extend(groups);
        self
    }

    /// Privileged principals bypass rwx checks (but not the quota).
    pub fn is_privileged(&self) -> bool {
        self.uid == Self::ROOT_UID
    }

    pub fn in_group(&self, gid: u32) -> bool {
        self.gid == gid || self.groups.contains(&gid)
    }
}
