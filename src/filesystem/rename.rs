use super::{FsError, FsResult};
use crate::{Access, Filesystem, Identity, Link, Node, NodeId, VfsPath};
use tracing::{debug, instrument};

/// One end of a rename: the directory, and the name within it.
struct End<'a> {
    dir_id: NodeId,
    dir: &'a Node,
    name: &'a str,
    path: &'a VfsPath,
}

impl Filesystem {
    /// Moves the node at `src` (with its whole subtree) to `dst`, keeping
    /// its content and attributes.
    #[instrument(skip(self))]
    pub fn rename(&self, src: &VfsPath, dst: &VfsPath, who: &Identity) -> FsResult<()> {
        debug!("op: rename()");

        if src.is_root() {
            return Err(FsError::InvalidArgument("cannot move the root".into()));
        }

        let _gate = self.gate.read();
        let (src_dir_id, src_dir, src_name) = self.walk_parent(src, who)?;

        if src == dst {
            let entries = Self::entries_of(&src_dir, src)?.read();

            self.nodes
                .child(&entries, src_name)?
                .ok_or_else(|| FsError::NotFound(src.to_string()))?;

            return Ok(());
        }

        let (dst_dir_id, dst_dir, dst_name) = self.walk_parent(dst, who)?;

        let src_end = End {
            dir_id: src_dir_id,
            dir: &src_dir,
            name: src_name,
            path: src,
        };

        let dst_end = End {
            dir_id: dst_dir_id,
            dir: &dst_dir,
            name: dst_name,
            path: dst,
        };

        let src_entries = Self::entries_of(&src_dir, src)?;

        if src_dir_id == dst_dir_id {
            return self.relink(src_end, &mut src_entries.write(), dst_end, None, who);
        }

        let _renames = self.renames.lock();
        let dst_entries = Self::entries_of(&dst_dir, dst)?;

        let src_first = self.is_ancestor(src_dir_id, dst_dir_id, src)?
            || (!self.is_ancestor(dst_dir_id, src_dir_id, src)? && src_dir_id < dst_dir_id);

        let (mut src_entries, mut dst_entries) = if src_first {
            let src_entries = src_entries.write();
            (src_entries, dst_entries.write())
        } else {
            let dst_entries = dst_entries.write();
            (src_entries.write(), dst_entries)
        };

        self.relink(src_end, &mut src_entries, dst_end, Some(&mut *dst_entries), who)
    }

    /// Does the move once the entries of both directories are locked;
    /// `dst_entries` is `None` when both ends share the directory.
    fn relink(
        &self,
        src: End<'_>,
        src_entries: &mut Vec<NodeId>,
        dst: End<'_>,
        dst_entries: Option<&mut Vec<NodeId>>,
        who: &Identity,
    ) -> FsResult<()> {
        self.ensure_alive(src.dir_id, src.path)?;
        self.ensure_alive(dst.dir_id, dst.path)?;

        let id = self
            .nodes
            .child(src_entries, src.name)?
            .ok_or_else(|| FsError::NotFound(src.path.to_string()))?;

        let taken = match dst_entries.as_deref() {
            Some(entries) => self.nodes.child(entries, dst.name)?,
            None => self.nodes.child(src_entries, dst.name)?,
        };

        if taken.is_some() {
            return Err(FsError::AlreadyExists(dst.path.to_string()));
        }

        if self.is_ancestor(id, dst.dir_id, src.path)? {
            return Err(FsError::InvalidArgument(format!(
                "cannot move {} into itself",
                src.path
            )));
        }

        let node = self.nodes.get(id)?;

        Self::check_unlink(src.dir, &node, who, src.path)?;
        Self::check(dst.dir, who, Access::Write, dst.path)?;

        src_entries.retain(|&child| child != id);

        match dst_entries {
            Some(entries) => entries.push(id),
            None => src_entries.push(id),
        }

        *node.link.write() = Link {
            name: dst.name.to_owned(),
            parent: Some(dst.dir_id),
        };

        src.dir.attrs.write().touch();

        if dst.dir_id != src.dir_id {
            dst.dir.attrs.write().touch();
        }

        Ok(())
    }
}
