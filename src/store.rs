use crate::{Filesystem, FsConfig, Snapshot, UserDb};
use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::{info, instrument, warn};

/// Durable home of the namespace snapshot and the credential store: a
/// directory holding `fs.json` and `users.json`.
#[derive(Clone, Debug)]
pub struct Store {
    dir: PathBuf,
}

impl Store {
    const SNAPSHOT: &'static str = "fs.json";
    const USERS: &'static str = "users.json";

    #[instrument]
    pub fn create(dir: &Path) -> Result<Self> {
        info!("creating store");

        fs::create_dir_all(dir).with_context(|| format!("couldn't create: {}", dir.display()))?;

        Ok(Self {
            dir: dir.to_owned(),
        })
    }

    #[instrument]
    pub fn open(dir: &Path) -> Result<Self> {
        info!("opening store");

        if !dir.is_dir() {
            anyhow::bail!("couldn't open: {} is not a directory", dir.display());
        }

        Ok(Self {
            dir: dir.to_owned(),
        })
    }

    /// Restores the last flushed namespace.
    ///
    /// A missing, unreadable or corrupted snapshot is never fatal: it's
    /// reported, moved aside to `fs.json.discarded` so the next flush can't
    /// destroy it, and a freshly bootstrapped namespace is returned instead.
    #[instrument(skip(self, config))]
    pub fn boot(&self, config: &FsConfig) -> Filesystem {
        let restored = self
            .load::<Snapshot>(Self::SNAPSHOT)
            .and_then(|snapshot| match snapshot {
                Some(snapshot) => Filesystem::restore(config, &snapshot).map(Some),
                None => Ok(None),
            });

        match restored {
            Ok(Some(fs)) => fs,

            Ok(None) => {
                info!("no snapshot found, starting from a fresh namespace");
                Filesystem::new(config)
            }

            Err(err) => {
                warn!("discarding snapshot: {:?}", err);
                self.set_aside(Self::SNAPSHOT);
                Filesystem::new(config)
            }
        }
    }

    /// Flushes `fs`; on failure the previous snapshot stays in place.
    #[instrument(skip(self, fs))]
    pub fn save(&self, fs: &Filesystem) -> Result<()> {
        let snapshot = fs.snapshot()?;

        self.store(Self::SNAPSHOT, &snapshot)
            .context("couldn't flush snapshot")
    }

    #[instrument(skip(self))]
    pub fn load_users(&self) -> UserDb {
        match self.load::<UserDb>(Self::USERS) {
            Ok(Some(users)) => users,
            Ok(None) => UserDb::default(),

            Err(err) => {
                warn!("discarding user database: {:?}", err);
                self.set_aside(Self::USERS);
                UserDb::default()
            }
        }
    }

    #[instrument(skip(self, users))]
    pub fn save_users(&self, users: &UserDb) -> Result<()> {
        self.store(Self::USERS, users)
            .context("couldn't flush user database")
    }

    fn load<T: DeserializeOwned>(&self, name: &str) -> Result<Option<T>> {
        let path = self.dir.join(name);

        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => {
                return Err(err).with_context(|| format!("couldn't read: {}", path.display()))
            }
        };

        serde_json::from_slice(&bytes)
            .map(Some)
            .with_context(|| format!("couldn't decode: {}", path.display()))
    }

    /// Renames `name` to `name.discarded`, replacing any earlier discarded
    /// copy.
    fn set_aside(&self, name: &str) {
        let path = self.dir.join(name);
        let aside = self.dir.join(format!("{}.discarded", name));

        match fs::rename(&path, &aside) {
            Ok(()) => warn!("kept the discarded file as {}", aside.display()),
            Err(err) if err.kind() == ErrorKind::NotFound => (),
            Err(err) => warn!("couldn't set aside {}: {}", path.display(), err),
        }
    }

    /// Writes to a temporary sibling first and renames it over `name`, so
    /// readers see either the old or the new file.
    fn store<T: Serialize>(&self, name: &str, value: &T) -> Result<()> {
        let path = self.dir.join(name);
        let tmp = self.dir.join(format!(".{}.tmp", name));

        let bytes = serde_json::to_vec(value).context("couldn't encode")?;

        let mut file =
            fs::File::create(&tmp).with_context(|| format!("couldn't create: {}", tmp.display()))?;

        file.write_all(&bytes)
            .and_then(|_| file.sync_all())
            .with_context(|| format!("write() failed: {}", tmp.display()))?;

        fs::rename(&tmp, &path)
            .with_context(|| format!("rename() failed: {}", path.display()))?;

        info!(bytes = bytes.len(), "flushed {}", name);

        Ok(())
    }
}
