use super::{FsError, FsResult};
use crate::{permission, Filesystem, Identity, Mode, VfsPath};
use tracing::{debug, instrument};

impl Filesystem {
    /// Replaces the full mode of the node; owner or privileged only.
    #[instrument(skip(self))]
    pub fn chmod(&self, path: &VfsPath, mode: Mode, who: &Identity) -> FsResult<()> {
        debug!("op: chmod()");

        let _gate = self.gate.read();
        let (id, node) = self.walk(path, who)?;
        let mut attrs = node.attrs.write();

        self.ensure_alive(id, path)?;

        if !permission::can_chmod(&attrs, who) {
            return Err(FsError::PermissionDenied(path.to_string()));
        }

        attrs.mode = mode;
        attrs.touch();

        Ok(())
    }

    /// Hands the node over to `uid` (and `gid`, when given); privileged
    /// only.
    #[instrument(skip(self))]
    pub fn chown(
        &self,
        path: &VfsPath,
        uid: u32,
        gid: Option<u32>,
        who: &Identity,
    ) -> FsResult<()> {
        debug!("op: chown()");

        if !permission::can_chown(who) {
            return Err(FsError::PermissionDenied(path.to_string()));
        }

        let _gate = self.gate.read();
        let (id, node) = self.walk(path, who)?;
        let mut attrs = node.attrs.write();

        self.ensure_alive(id, path)?;

        attrs.uid = uid;

        if let Some(gid) = gid {
            attrs.gid = gid;
        }

        attrs.touch();

        Ok(())
    }
}
