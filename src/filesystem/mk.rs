use super::{FsError, FsResult};
use crate::{Access, Attrs, Filesystem, Identity, Mode, Node, NodeKind, VfsPath};
use std::sync::Arc;
use tracing::{debug, instrument};

impl Filesystem {
    #[instrument(skip(self))]
    pub fn mkdir(&self, path: &VfsPath, mode: Mode, who: &Identity) -> FsResult<()> {
        debug!("op: mkdir()");

        self.mk(path, mode, who, NodeKind::Directory)
    }

    /// Creates an empty file.
    #[instrument(skip(self))]
    pub fn touch(&self, path: &VfsPath, mode: Mode, who: &Identity) -> FsResult<()> {
        debug!("op: touch()");

        self.mk(path, mode, who, NodeKind::File)
    }

    /// An existing name is reported before a missing write permission, the
    /// way `mkdir(2)` does; `mkdir -p` relies on that.
    fn mk(&self, path: &VfsPath, mode: Mode, who: &Identity, kind: NodeKind) -> FsResult<()> {
        let _gate = self.gate.read();
        let (parent_id, parent, name) = self.walk_parent(path, who)?;
        let mut entries = Self::entries_of(&parent, path)?.write();

        self.ensure_alive(parent_id, path)?;

        if self.nodes.child(&entries, name)?.is_some() {
            return Err(FsError::AlreadyExists(path.to_string()));
        }

        Self::check(&parent, who, Access::Write, path)?;

        let attrs = Attrs::new(who, mode);

        let node = match kind {
            NodeKind::Directory => Node::directory(name.to_owned(), Some(parent_id), attrs),
            NodeKind::File => {
                Node::file(name.to_owned(), parent_id, attrs, Arc::from(Vec::new()))
            }
        };

        entries.push(self.nodes.insert(node));
        parent.attrs.write().touch();

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::filesystem::tests::*;
    use crate::{FsError, Identity, Mode, NodeKind, VfsPath};

    #[test]
    fn mkdir_then_list_parent() {
        let fs = fs();

        fs.mkdir(&path("/home/alice/docs"), Mode::new(0o750), &alice())
            .unwrap();

        let stat = fs.lookup(&path("/home/alice/docs"), &alice()).unwrap();

        assert_eq!(stat.kind, NodeKind::Directory);
        assert_eq!(stat.mode, Mode::new(0o750));
        assert_eq!(stat.uid, 1000);
    }

    #[test]
    fn touch_creates_empty_file() {
        let fs = fs();

        fs.touch(&path("/home/alice/empty"), Mode::FILE_DEFAULT, &alice())
            .unwrap();

        let stat = fs.lookup(&path("/home/alice/empty"), &alice()).unwrap();

        assert_eq!(stat.kind, NodeKind::File);
        assert_eq!(stat.size, 0);
    }

    #[test]
    fn duplicate_name_already_exists() {
        let fs = fs();

        fs.mkdir(&path("/home/alice/x"), Mode::DIR_DEFAULT, &alice())
            .unwrap();

        assert!(matches!(
            fs.touch(&path("/home/alice/x"), Mode::FILE_DEFAULT, &alice()),
            Err(FsError::AlreadyExists(_))
        ));
        assert!(matches!(
            fs.mkdir(&VfsPath::root(), Mode::DIR_DEFAULT, &Identity::root()),
            Err(FsError::AlreadyExists(_))
        ));
    }

    #[test]
    fn existing_name_wins_over_missing_write_permission() {
        let fs = fs();

        assert!(matches!(
            fs.mkdir(&path("/home"), Mode::DIR_DEFAULT, &alice()),
            Err(FsError::AlreadyExists(_))
        ));
        assert!(matches!(
            fs.mkdir(&path("/home/alice"), Mode::DIR_DEFAULT, &bob()),
            Err(FsError::AlreadyExists(_))
        ));
    }

    #[test]
    fn missing_parent_is_not_found() {
        let fs = fs();

        assert!(matches!(
            fs.mkdir(&path("/home/alice/a/b"), Mode::DIR_DEFAULT, &alice()),
            Err(FsError::NotFound(_))
        ));
    }

    #[test]
    fn parent_must_be_writable() {
        let fs = fs();

        assert!(matches!(
            fs.mkdir(&path("/home/alice/intruder"), Mode::DIR_DEFAULT, &bob()),
            Err(FsError::PermissionDenied(_))
        ));
        assert!(matches!(
            fs.lookup(&path("/home/alice/intruder"), &alice()),
            Err(FsError::NotFound(_))
        ));
    }
}
