use super::{FsError, FsResult};
use crate::{Access, Filesystem, Identity, NodeBody, VfsPath};
use std::sync::Arc;
use tracing::{debug, instrument};

impl Filesystem {
    /// Removes the node at `path`.
    ///
    /// A non-empty directory is only removed when `recursive` is set, and
    /// then the caller needs read, write and execute on every non-empty
    /// directory below it. All checks happen before anything is detached.
    #[instrument(skip(self))]
    pub fn remove(&self, path: &VfsPath, recursive: bool, who: &Identity) -> FsResult<()> {
        debug!("op: remove()");

        if path.is_root() {
            return Err(FsError::InvalidArgument("cannot remove the root".into()));
        }

        let _gate = self.gate.read();

        // a subtree is locked top-down, which mustn't interleave with a
        // rename locking two unrelated directories inside of it
        let _renames = recursive.then(|| self.renames.lock());

        let (parent_id, parent, name) = self.walk_parent(path, who)?;
        let mut entries = Self::entries_of(&parent, path)?.write();

        self.ensure_alive(parent_id, path)?;

        let id = self
            .nodes
            .child(&entries, name)?
            .ok_or_else(|| FsError::NotFound(path.to_string()))?;

        let node = self.nodes.get(id)?;

        Self::check_unlink(&parent, &node, who, path)?;

        // Every directory of the subtree stays write-locked (parents first)
        // until it's gone, so nothing can be created below it meanwhile.
        let mut dirs = Vec::new();
        let mut files = Vec::new();

        match &node.body {
            NodeBody::File(_) => files.push((id, Arc::clone(&node))),

            NodeBody::Directory(children) => {
                let children = children.write_arc();

                if !children.is_empty() && !recursive {
                    return Err(FsError::NotEmpty(path.to_string()));
                }

                let mut pending = vec![(id, Arc::clone(&node), children)];

                while let Some((dir_id, dir, children)) = pending.pop() {
                    if !children.is_empty() {
                        let dir_path = self.nodes.path_of(dir_id)?;

                        for access in [Access::Read, Access::Write, Access::Execute] {
                            Self::check(&dir, who, access, &dir_path)?;
                        }
                    }

                    for &child_id in children.iter() {
                        let child = self.nodes.get(child_id)?;

                        match &child.body {
                            NodeBody::File(_) => files.push((child_id, Arc::clone(&child))),

                            NodeBody::Directory(grandchildren) => {
                                let grandchildren = grandchildren.write_arc();

                                pending.push((child_id, Arc::clone(&child), grandchildren));
                            }
                        }
                    }

                    dirs.push((dir_id, children));
                }
            }
        }

        entries.retain(|&child| child != id);

        for (dir_id, _) in &dirs {
            self.nodes.remove(*dir_id);
        }

        for (file_id, file) in files {
            // writers check liveness under the same lock
            let _attrs = file.attrs.write();

            self.nodes.remove(file_id);

            if let NodeBody::File(content) = &file.body {
                self.disk.release(content.read().len() as u64);
                self.disk.forget(file_id);
            }
        }

        drop(dirs);
        parent.attrs.write().touch();

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::filesystem::tests::*;
    use crate::{FsError, Identity, Mode, VfsPath};

    #[test]
    fn removed_node_is_gone() {
        let fs = fs();
        let p = path("/home/alice/f");

        fs.touch(&p, Mode::FILE_DEFAULT, &alice()).unwrap();
        fs.write(&p, &[0; 42], &alice()).unwrap();
        fs.remove(&p, false, &alice()).unwrap();

        assert!(matches!(fs.lookup(&p, &alice()), Err(FsError::NotFound(_))));
        assert_eq!(fs.usage().0, 0);
    }

    #[test]
    fn non_empty_directory_needs_recursive() {
        let fs = fs();

        fs.mkdir(&path("/home/alice/d"), Mode::DIR_DEFAULT, &alice())
            .unwrap();
        fs.mkdir(&path("/home/alice/d/e"), Mode::DIR_DEFAULT, &alice())
            .unwrap();
        fs.touch(&path("/home/alice/d/e/f"), Mode::FILE_DEFAULT, &alice())
            .unwrap();
        fs.write(&path("/home/alice/d/e/f"), b"1234", &alice())
            .unwrap();

        assert!(matches!(
            fs.remove(&path("/home/alice/d"), false, &alice()),
            Err(FsError::NotEmpty(_))
        ));

        fs.remove(&path("/home/alice/d"), true, &alice()).unwrap();

        assert!(fs.lookup(&path("/home/alice/d"), &alice()).is_err());
        assert!(fs.list(&path("/home/alice"), &alice()).unwrap().is_empty());
        assert_eq!(fs.usage().0, 0);
    }

    #[test]
    fn recursive_removal_is_all_or_nothing() {
        let fs = fs();

        fs.mkdir(&path("/tmp/shared"), Mode::new(0o777), &alice())
            .unwrap();
        fs.mkdir(&path("/tmp/shared/locked"), Mode::new(0o755), &bob())
            .unwrap();
        fs.touch(&path("/tmp/shared/locked/f"), Mode::FILE_DEFAULT, &bob())
            .unwrap();

        assert!(matches!(
            fs.remove(&path("/tmp/shared"), true, &alice()),
            Err(FsError::PermissionDenied(_))
        ));
        assert!(fs.lookup(&path("/tmp/shared/locked/f"), &alice()).is_ok());
    }

    #[test]
    fn non_owner_without_write_on_parent_is_denied() {
        let fs = fs();
        let p = path("/home/alice/f");

        fs.touch(&p, Mode::new(0o666), &alice()).unwrap();

        assert!(matches!(
            fs.remove(&p, false, &bob()),
            Err(FsError::PermissionDenied(_))
        ));
        assert!(fs.lookup(&p, &alice()).is_ok());
    }

    #[test]
    fn sticky_tmp_protects_other_users_files() {
        let fs = fs();
        let p = path("/tmp/alices");

        fs.touch(&p, Mode::new(0o666), &alice()).unwrap();

        assert!(matches!(
            fs.remove(&p, false, &bob()),
            Err(FsError::PermissionDenied(_))
        ));

        fs.remove(&p, false, &alice()).unwrap();
    }

    #[test]
    fn root_and_missing_nodes() {
        let fs = fs();

        assert!(matches!(
            fs.remove(&VfsPath::root(), true, &Identity::root()),
            Err(FsError::InvalidArgument(_))
        ));
        assert!(matches!(
            fs.remove(&path("/home/alice/nope"), false, &alice()),
            Err(FsError::NotFound(_))
        ));
    }
}
