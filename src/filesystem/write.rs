use super::{FsError, FsResult};
use crate::{permission, Access, Filesystem, Identity, NodeBody, VfsPath};
use std::sync::Arc;
use tracing::{debug, instrument};

impl Filesystem {
    /// Replaces the content of the file at `path`.
    #[instrument(skip(self, data), fields(len = data.len()))]
    pub fn write(&self, path: &VfsPath, data: &[u8], who: &Identity) -> FsResult<()> {
        debug!("op: write()");

        self.write_with(path, who, |_| data.to_vec())
    }

    /// Appends `data` to the file at `path`.
    #[instrument(skip(self, data), fields(len = data.len()))]
    pub fn append(&self, path: &VfsPath, data: &[u8], who: &Identity) -> FsResult<()> {
        debug!("op: append()");

        self.write_with(path, who, |old| {
            let mut buf = Vec::with_capacity(old.len() + data.len());
            buf.extend_from_slice(old);
            buf.extend_from_slice(data);
            buf
        })
    }

    /// Computes the new content from the old one and commits it together
    /// with the quota change, `size` and `modified_at`.
    ///
    /// Both the attribute and content locks are held for the whole call, so
    /// readers observe either the old or the new state.
    fn write_with(
        &self,
        path: &VfsPath,
        who: &Identity,
        f: impl FnOnce(&[u8]) -> Vec<u8>,
    ) -> FsResult<()> {
        let _gate = self.gate.read();
        let (id, node) = self.walk(path, who)?;

        let NodeBody::File(content) = &node.body else {
            return Err(FsError::IsADirectory(path.to_string()));
        };

        let mut attrs = node.attrs.write();

        self.ensure_alive(id, path)?;

        if !permission::can(&attrs, who, Access::Write) {
            return Err(FsError::PermissionDenied(path.to_string()));
        }

        let mut content = content.write();
        let new: Arc<[u8]> = Arc::from(f(&content));
        let (old_len, new_len) = (content.len() as u64, new.len() as u64);

        if new_len > old_len {
            self.disk.reserve(new_len - old_len)?;
        } else {
            self.disk.release(old_len - new_len);
        }

        self.disk.commit(id, &new);
        *content = new;

        attrs.size = new_len;
        attrs.touch();

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::filesystem::tests::*;
    use crate::{FsError, Mode};

    #[test]
    fn write_updates_size_and_usage() {
        let fs = fs();
        let p = path("/home/alice/notes");

        fs.touch(&p, Mode::FILE_DEFAULT, &alice()).unwrap();
        let before = fs.lookup(&p, &alice()).unwrap();

        fs.write(&p, b"hello world", &alice()).unwrap();
        let after = fs.lookup(&p, &alice()).unwrap();

        assert_eq!(after.size, 11);
        assert!(after.modified_at >= before.modified_at);
        assert_eq!(fs.usage().0, 11);
        assert_eq!(fs.read(&p, &alice()).unwrap(), b"hello world");
    }

    #[test]
    fn shrinking_releases_space() {
        let fs = fs();
        let p = path("/home/alice/notes");

        fs.touch(&p, Mode::FILE_DEFAULT, &alice()).unwrap();
        fs.write(&p, &[0; 100], &alice()).unwrap();
        fs.write(&p, &[0; 10], &alice()).unwrap();

        assert_eq!(fs.usage().0, 10);
    }

    #[test]
    fn append_extends_content() {
        let fs = fs();
        let p = path("/home/alice/log");

        fs.touch(&p, Mode::FILE_DEFAULT, &alice()).unwrap();
        fs.append(&p, b"one\n", &alice()).unwrap();
        fs.append(&p, b"two\n", &alice()).unwrap();

        assert_eq!(fs.read(&p, &alice()).unwrap(), b"one\ntwo\n");
        assert_eq!(fs.usage().0, 8);
    }

    #[test]
    fn overwrite_only_charges_the_difference() {
        let fs = fs_with_capacity(100);
        let p = path("/home/alice/a.bin");

        fs.touch(&p, Mode::FILE_DEFAULT, &alice()).unwrap();
        fs.write(&p, &[1; 80], &alice()).unwrap();
        fs.write(&p, &[2; 90], &alice()).unwrap();

        assert_eq!(fs.usage().0, 90);
    }

    #[test]
    fn out_of_space_leaves_file_untouched() {
        let fs = fs_with_capacity(100);
        let p = path("/home/alice/a.bin");

        fs.touch(&p, Mode::FILE_DEFAULT, &alice()).unwrap();
        fs.write(&p, &[1; 60], &alice()).unwrap();

        assert!(matches!(
            fs.write(&p, &[2; 101], &alice()),
            Err(FsError::OutOfSpace { .. })
        ));
        assert_eq!(fs.usage().0, 60);
        assert_eq!(fs.read(&p, &alice()).unwrap(), vec![1; 60]);
    }

    #[test]
    fn writing_a_directory_fails() {
        let fs = fs();

        assert!(matches!(
            fs.write(&path("/home/alice"), b"x", &alice()),
            Err(FsError::IsADirectory(_))
        ));
    }

    #[test]
    fn non_owner_without_write_bit_is_denied() {
        let fs = fs();
        let p = path("/home/alice/notes");

        fs.touch(&p, Mode::FILE_DEFAULT, &alice()).unwrap();
        fs.write(&p, b"mine", &alice()).unwrap();

        assert!(matches!(
            fs.write(&p, b"yours", &bob()),
            Err(FsError::PermissionDenied(_))
        ));
        assert_eq!(fs.read(&p, &alice()).unwrap(), b"mine");
    }
}
