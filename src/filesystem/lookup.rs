use super::FsResult;
use crate::{Access, Filesystem, Identity, Stat, VfsPath};
use tracing::{debug, instrument};

impl Filesystem {
    /// Read-only traversal to `path`.
    #[instrument(skip(self))]
    pub fn lookup(&self, path: &VfsPath, who: &Identity) -> FsResult<Stat> {
        debug!("op: lookup()");

        let (id, node) = self.walk(path, who)?;

        Ok(Stat::new(id, &node))
    }

    /// Checks whether `who` could `access` the node at `path`, without
    /// doing anything to it.
    #[instrument(skip(self))]
    pub fn access(&self, path: &VfsPath, access: Access, who: &Identity) -> FsResult<()> {
        debug!("op: access()");

        let (_, node) = self.walk(path, who)?;

        Self::check(&node, who, access, path)
    }
}
