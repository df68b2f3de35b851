use super::FsResult;
use crate::{Access, Filesystem, Identity, Stat, VfsPath};
use tracing::{debug, instrument};

/// One entry of a directory listing.
pub type ChildSummary = Stat;

impl Filesystem {
    /// Immediate children of the directory at `path`, in insertion order.
    #[instrument(skip(self))]
    pub fn list(&self, path: &VfsPath, who: &Identity) -> FsResult<Vec<ChildSummary>> {
        debug!("op: list()");

        let (_, node) = self.walk(path, who)?;
        let entries = Self::entries_of(&node, path)?;

        Self::check(&node, who, Access::Read, path)?;

        let entries = entries.read();

        entries
            .iter()
            .map(|&child| -> FsResult<_> { Ok(Stat::new(child, &*self.nodes.get(child)?)) })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use crate::filesystem::tests::*;
    use crate::{FsError, Mode};

    fn names(fs: &crate::Filesystem, p: &str) -> Vec<String> {
        fs.list(&path(p), &alice())
            .unwrap()
            .into_iter()
            .map(|entry| entry.name)
            .collect()
    }

    #[test]
    fn lists_only_immediate_children() {
        let fs = fs();

        fs.mkdir(&path("/home/alice/docs"), Mode::DIR_DEFAULT, &alice())
            .unwrap();
        fs.touch(&path("/home/alice/docs/a.txt"), Mode::FILE_DEFAULT, &alice())
            .unwrap();
        fs.touch(&path("/home/alice/b.txt"), Mode::FILE_DEFAULT, &alice())
            .unwrap();

        assert_eq!(names(&fs, "/home"), ["alice"]);
        assert_eq!(names(&fs, "/home/alice"), ["docs", "b.txt"]);
        assert_eq!(names(&fs, "/home/alice/docs"), ["a.txt"]);
        assert!(names(&fs, "/tmp").is_empty());
    }

    #[test]
    fn listing_a_file_is_not_a_directory() {
        let fs = fs();

        fs.touch(&path("/home/alice/f"), Mode::FILE_DEFAULT, &alice())
            .unwrap();

        assert!(matches!(
            fs.list(&path("/home/alice/f"), &alice()),
            Err(FsError::NotADirectory(_))
        ));
    }

    #[test]
    fn listing_requires_read() {
        let fs = fs();

        fs.chmod(&path("/home/alice"), Mode::new(0o711), &alice())
            .unwrap();

        assert!(matches!(
            fs.list(&path("/home/alice"), &bob()),
            Err(FsError::PermissionDenied(_))
        ));
    }
}
