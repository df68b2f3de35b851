use super::{FsError, FsResult};
use crate::{permission, Access, Filesystem, Identity, NodeBody, VfsPath};
use tracing::{debug, instrument};

impl Filesystem {
    #[instrument(skip(self))]
    pub fn read(&self, path: &VfsPath, who: &Identity) -> FsResult<Vec<u8>> {
        debug!("op: read()");

        let (id, node) = self.walk(path, who)?;

        let NodeBody::File(content) = &node.body else {
            return Err(FsError::IsADirectory(path.to_string()));
        };

        let attrs = node.attrs.read();

        // a removed file mustn't find its way back into the cache
        self.ensure_alive(id, path)?;

        if !permission::can(&attrs, who, Access::Read) {
            return Err(FsError::PermissionDenied(path.to_string()));
        }

        let data = self.disk.read(id, || content.read().clone());

        Ok(data.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use crate::filesystem::tests::*;
    use crate::{FsError, Mode};

    #[test]
    fn repeated_reads_hit_the_cache() {
        let fs = fs();
        let p = path("/home/alice/f");

        fs.touch(&p, Mode::FILE_DEFAULT, &alice()).unwrap();
        fs.write(&p, b"cached", &alice()).unwrap();

        let before = fs.cache_stats().hits;

        assert_eq!(fs.read(&p, &alice()).unwrap(), b"cached");
        assert_eq!(fs.read(&p, &bob()).unwrap(), b"cached");
        assert_eq!(fs.cache_stats().hits, before + 2);
    }

    #[test]
    fn read_requires_read_bit() {
        let fs = fs();
        let p = path("/home/alice/secret");

        fs.touch(&p, Mode::new(0o600), &alice()).unwrap();

        assert!(matches!(
            fs.read(&p, &bob()),
            Err(FsError::PermissionDenied(_))
        ));
    }

    #[test]
    fn reading_a_directory_fails() {
        let fs = fs();

        assert!(matches!(
            fs.read(&path("/home"), &alice()),
            Err(FsError::IsADirectory(_))
        ));
    }
}
