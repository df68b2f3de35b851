use crate::{FsError, FsResult, Identity, VfsPath};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{info, instrument};

/// Persisted credential store consulted by the session layer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserDb {
    users: Vec<UserRecord>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub name: String,
    pub uid: u32,
    pub gid: u32,
    pub home: VfsPath,

    /// `salt$sha256(salt + password)`, hex-encoded; `None` means the
    /// account has no password and can't authenticate.
    pub password_hash: Option<String>,
}

impl UserRecord {
    pub fn identity(&self) -> Identity {
        Identity::new(self.uid, self.gid)
    }
}

impl UserDb {
    /// First uid handed out to ordinary users.
    pub const FIRST_UID: u32 = 1000;

    pub fn users(&self) -> &[UserRecord] {
        &self.users
    }

    pub fn by_name(&self, name: &str) -> Option<&UserRecord> {
        self.users.iter().find(|user| user.name == name)
    }

    pub fn by_uid(&self, uid: u32) -> Option<&UserRecord> {
        self.users.iter().find(|user| user.uid == uid)
    }

    /// Registers a new user with its own group (gid = uid).
    ///
    /// When `uid` is `None`, the next free uid from [`Self::FIRST_UID`] is
    /// used.
    #[instrument(skip(self, password))]
    pub fn add_user(
        &mut self,
        name: &str,
        uid: Option<u32>,
        password: Option<&str>,
    ) -> FsResult<&UserRecord> {
        let is_invalid = |c: char| matches!(c, '/' | ':' | '\0') || c.is_whitespace();

        if name.is_empty() || name.contains(is_invalid) {
            return Err(FsError::InvalidArgument(format!(
                "invalid user name: {:?}",
                name
            )));
        }

        if self.by_name(name).is_some() {
            return Err(FsError::AlreadyExists(format!("user {}", name)));
        }

        let uid = match uid {
            Some(uid) if self.by_uid(uid).is_some() => {
                return Err(FsError::AlreadyExists(format!("uid {}", uid)));
            }

            Some(uid) => uid,

            None => match self
                .users
                .iter()
                .map(|user| user.uid)
                .filter(|uid| *uid >= Self::FIRST_UID)
                .max()
            {
                Some(last) => last
                    .checked_add(1)
                    .ok_or_else(|| FsError::InvalidArgument("no uids left".into()))?,

                None => Self::FIRST_UID,
            },
        };

        info!(uid, "adding user");

        self.users.push(UserRecord {
            name: name.to_owned(),
            uid,
            gid: uid,
            home: VfsPath::root().join("home").join(name),
            password_hash: password.map(|pw| hash_password(&new_salt(name), pw)),
        });

        // Unwrap-safety: we've just pushed it
        Ok(self.users.last().unwrap())
    }

    /// Checks `password` against the stored hash.
    pub fn authenticate(&self, name: &str, password: &str) -> Option<&UserRecord> {
        let user = self.by_name(name)?;
        let stored = user.password_hash.as_deref()?;
        let (salt, _) = stored.split_once('$')?;

        (hash_password(salt, password) == stored).then_some(user)
    }
}

impl Default for UserDb {
    fn default() -> Self {
        Self {
            users: vec![UserRecord {
                name: "root".into(),
                uid: Identity::ROOT_UID,
                gid: 0,
                home: VfsPath::root(),
                password_hash: None,
            }],
        }
    }
}

fn new_salt(name: &str) -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();

    let digest = Sha256::digest(format!("{}:{}", name, nanos));

    format!("{:x}", digest)[..16].to_owned()
}

fn hash_password(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();

    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());

    format!("{}${:x}", salt, hasher.finalize())
}
