use crate::{Access, ChildSummary, Filesystem, FindPredicate, FsError, FsResult, Identity};
use crate::{Mode, NodeKind, UserDb, UserRecord, VfsPath};
use std::time::UNIX_EPOCH;
use tracing::{debug, instrument};

/// A logged-in user's view of the filesystem: who they are and where they
/// are.
///
/// This is the command surface the shell sits on; paths given to it are
/// resolved against the session's working directory.
#[derive(Debug)]
pub struct Session<'a> {
    fs: &'a Filesystem,
    users: &'a UserDb,
    user: String,
    identity: Identity,
    cwd: VfsPath,
}

impl<'a> Session<'a> {
    /// Opens a session for `name`, starting in their home directory when it
    /// exists (and in `/` otherwise).
    #[instrument(skip(fs, users))]
    pub fn login(fs: &'a Filesystem, users: &'a UserDb, name: &str) -> FsResult<Self> {
        let user = users
            .by_name(name)
            .ok_or_else(|| FsError::InvalidArgument(format!("unknown user: {}", name)))?;

        let identity = user.identity();

        let cwd = match fs.lookup(&user.home, &identity) {
            Ok(stat) if stat.is_dir() => user.home.clone(),
            _ => VfsPath::root(),
        };

        Ok(Self {
            fs,
            users,
            user: user.name.clone(),
            identity,
            cwd,
        })
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn resolve(&self, input: &str) -> FsResult<VfsPath> {
        VfsPath::resolve(&self.cwd, input)
    }

    pub fn pwd(&self) -> &VfsPath {
        &self.cwd
    }

    /// Changes the working directory; the target must be an existing
    /// directory the user may enter, otherwise the cwd stays as it was.
    pub fn cd(&mut self, input: Option<&str>) -> FsResult<()> {
        let path = match input {
            Some(input) => self.resolve(input)?,
            None => self.home()?.home.clone(),
        };

        let stat = self.fs.lookup(&path, &self.identity)?;

        if !stat.is_dir() {
            return Err(FsError::NotADirectory(path.to_string()));
        }

        self.fs.access(&path, Access::Execute, &self.identity)?;
        self.cwd = path;

        Ok(())
    }

    pub fn ls(&self, input: Option<&str>) -> FsResult<Vec<ChildSummary>> {
        let path = match input {
            Some(input) => self.resolve(input)?,
            None => self.cwd.clone(),
        };

        self.fs.list(&path, &self.identity)
    }

    pub fn mkdir(&self, input: &str, parents: bool) -> FsResult<()> {
        let path = self.resolve(input)?;

        if !parents {
            return self.fs.mkdir(&path, Mode::DIR_DEFAULT, &self.identity);
        }

        let mut current = VfsPath::root();

        for segment in path.segments() {
            current = current.join(segment);

            match self.fs.mkdir(&current, Mode::DIR_DEFAULT, &self.identity) {
                Err(FsError::AlreadyExists(_)) => {
                    if !self.fs.lookup(&current, &self.identity)?.is_dir() {
                        return Err(FsError::NotADirectory(current.to_string()));
                    }
                }

                result => result?,
            }
        }

        Ok(())
    }

    /// Creates an empty file; touching something that exists is not an
    /// error.
    pub fn touch(&self, input: &str) -> FsResult<()> {
        let path = self.resolve(input)?;

        match self.fs.touch(&path, Mode::FILE_DEFAULT, &self.identity) {
            Err(FsError::AlreadyExists(_)) => Ok(()),
            result => result,
        }
    }

    pub fn cat(&self, input: &str) -> FsResult<Vec<u8>> {
        self.fs.read(&self.resolve(input)?, &self.identity)
    }

    /// Replaces (or, with `append`, extends) a file's content, creating the
    /// file first when needed.
    ///
    /// A file created here is removed again when the content can't be
    /// stored.
    pub fn write(&self, input: &str, data: &[u8], append: bool) -> FsResult<()> {
        let path = self.resolve(input)?;

        let created = match self.fs.touch(&path, Mode::FILE_DEFAULT, &self.identity) {
            Ok(()) => true,
            Err(FsError::AlreadyExists(_)) => false,
            Err(err) => return Err(err),
        };

        let result = if append {
            self.fs.append(&path, data, &self.identity)
        } else {
            self.fs.write(&path, data, &self.identity)
        };

        if result.is_err() && created {
            if let Err(err) = self.fs.remove(&path, false, &self.identity) {
                debug!("couldn't roll back {}: {}", path, err);
            }
        }

        result
    }

    pub fn rm(&self, input: &str, recursive: bool) -> FsResult<()> {
        let path = self.resolve(input)?;

        if !recursive && self.fs.lookup(&path, &self.identity)?.is_dir() {
            return Err(FsError::IsADirectory(path.to_string()));
        }

        self.fs.remove(&path, recursive, &self.identity)
    }

    pub fn rmdir(&self, input: &str) -> FsResult<()> {
        let path = self.resolve(input)?;

        if !self.fs.lookup(&path, &self.identity)?.is_dir() {
            return Err(FsError::NotADirectory(path.to_string()));
        }

        self.fs.remove(&path, false, &self.identity)
    }

    pub fn cp(&self, src: &str, dst: &str) -> FsResult<()> {
        let (src, dst) = self.src_dst(src, dst)?;

        self.fs.copy(&src, &dst, &self.identity)
    }

    pub fn mv(&self, src: &str, dst: &str) -> FsResult<()> {
        let (src, dst) = self.src_dst(src, dst)?;

        self.fs.rename(&src, &dst, &self.identity)
    }

    /// `dst` naming an existing directory means "into that directory".
    fn src_dst(&self, src: &str, dst: &str) -> FsResult<(VfsPath, VfsPath)> {
        let src = self.resolve(src)?;
        let mut dst = self.resolve(dst)?;

        if let (Ok(stat), Some(name)) = (self.fs.lookup(&dst, &self.identity), src.file_name()) {
            if stat.is_dir() && src != dst {
                dst = dst.join(name);
            }
        }

        Ok((src, dst))
    }

    pub fn chmod(&self, mode: &str, input: &str) -> FsResult<()> {
        let mode = Mode::parse(mode)?;

        self.fs.chmod(&self.resolve(input)?, mode, &self.identity)
    }

    /// `owner` is `user` or `user:group`; either part may be numeric.
    pub fn chown(&self, owner: &str, input: &str) -> FsResult<()> {
        let (user, group) = match owner.split_once(':') {
            Some((user, group)) => (user, Some(group)),
            None => (owner, None),
        };

        let uid = self.lookup_user(user)?.uid;

        let gid = match group {
            Some(group) => {
                let gid = group
                    .parse()
                    .ok()
                    .or_else(|| self.users.by_name(group).map(|user| user.gid))
                    .ok_or_else(|| {
                        FsError::InvalidArgument(format!("unknown group: {}", group))
                    })?;

                Some(gid)
            }

            None => None,
        };

        self.fs.chown(&self.resolve(input)?, uid, gid, &self.identity)
    }

    pub fn find(
        &self,
        input: Option<&str>,
        predicate: FindPredicate,
    ) -> FsResult<Vec<VfsPath>> {
        let root = match input {
            Some(input) => self.resolve(input)?,
            None => self.cwd.clone(),
        };

        Ok(self.fs.find(&root, predicate, &self.identity)?.collect())
    }

    fn home(&self) -> FsResult<&'a UserRecord> {
        self.lookup_user(&self.user)
    }

    fn lookup_user(&self, name: &str) -> FsResult<&'a UserRecord> {
        let users: &'a UserDb = self.users;

        name.parse()
            .ok()
            .and_then(|uid| users.by_uid(uid))
            .or_else(|| users.by_name(name))
            .ok_or_else(|| FsError::InvalidArgument(format!("unknown user: {}", name)))
    }

    /// Runs a single, whitespace-separated command line and returns what it
    /// printed.
    ///
    /// Only `ls`, `mkdir` and `rm` take flags; for every other command a
    /// leading dash is part of the argument.
    #[instrument(skip(self))]
    pub fn exec(&mut self, line: &str) -> FsResult<String> {
        debug!(user = %self.user, "exec");

        let mut words = line.split_whitespace();

        let Some(cmd) = words.next() else {
            return Ok(String::new());
        };

        let args: Vec<&str> = words.collect();
        let (flags, args): (Vec<&str>, Vec<&str>) = args
            .into_iter()
            .partition(|arg| {
                matches!(cmd, "ls" | "mkdir" | "rm") && arg.starts_with('-') && arg.len() > 1
            });

        let has_flag = |flag: char| flags.iter().any(|f| f.contains(flag));
        let mut out = String::new();

        match (cmd, args.as_slice()) {
            ("pwd", []) => out = format!("{}\n", self.cwd),
            ("whoami", []) => out = format!("{}\n", self.user),
            ("cd", []) => self.cd(None)?,
            ("cd", [path]) => self.cd(Some(*path))?,

            ("ls", paths) if paths.len() <= 1 => {
                for entry in self.ls(paths.first().copied())? {
                    if has_flag('l') {
                        out += &self.format_long(&entry);
                    } else {
                        out += &entry.name;
                    }

                    out.push('\n');
                }
            }

            ("mkdir", paths) if !paths.is_empty() => {
                for path in paths {
                    self.mkdir(path, has_flag('p'))?;
                }
            }

            ("touch", paths) if !paths.is_empty() => {
                for path in paths {
                    self.touch(path)?;
                }
            }

            ("cat", paths) if !paths.is_empty() => {
                for path in paths {
                    out += &String::from_utf8_lossy(&self.cat(path)?);
                }
            }

            ("write" | "append", [path, text @ ..]) => {
                let mut data = text.join(" ");
                data.push('\n');

                self.write(path, data.as_bytes(), cmd == "append")?;
            }

            ("rm", paths) if !paths.is_empty() => {
                for path in paths {
                    self.rm(path, has_flag('r'))?;
                }
            }

            ("rmdir", paths) if !paths.is_empty() => {
                for path in paths {
                    self.rmdir(path)?;
                }
            }

            ("cp", [src, dst]) => self.cp(src, dst)?,
            ("mv", [src, dst]) => self.mv(src, dst)?,
            ("chmod", [mode, path]) => self.chmod(mode, path)?,
            ("chown", [owner, path]) => self.chown(owner, path)?,

            ("find", args) => {
                let (root, predicate) = Self::parse_find(args)?;

                for path in self.find(root, predicate)? {
                    out += &format!("{}\n", path);
                }
            }

            ("df", []) => {
                let (used, capacity) = self.fs.usage();

                out = format!(
                    "{} used, {} available, {} total\n",
                    used,
                    capacity - used,
                    capacity
                );
            }

            _ => {
                return Err(FsError::InvalidArgument(format!(
                    "unsupported command: {}",
                    line.trim()
                )));
            }
        }

        Ok(out)
    }

    fn parse_find<'l>(args: &[&'l str]) -> FsResult<(Option<&'l str>, FindPredicate)> {
        let mut root = None;
        let mut predicate = FindPredicate::default();
        let mut args = args.iter();

        while let Some(arg) = args.next() {
            match *arg {
                "-name" => {
                    let pattern = args.next().ok_or_else(|| {
                        FsError::InvalidArgument("-name needs a pattern".into())
                    })?;

                    predicate = predicate.name(*pattern);
                }

                "-type" => {
                    let kind = match args.next().copied() {
                        Some("f") => NodeKind::File,
                        Some("d") => NodeKind::Directory,
                        _ => return Err(FsError::InvalidArgument("-type needs f or d".into())),
                    };

                    predicate = predicate.kind(kind);
                }

                path if root.is_none() && !path.starts_with('-') => root = Some(path),

                other => {
                    return Err(FsError::InvalidArgument(format!(
                        "unexpected find argument: {}",
                        other
                    )));
                }
            }
        }

        Ok((root, predicate))
    }

    fn format_long(&self, entry: &ChildSummary) -> String {
        let owner = self
            .users
            .by_uid(entry.uid)
            .map(|user| user.name.clone())
            .unwrap_or_else(|| entry.uid.to_string());

        let group = self
            .users
            .users()
            .iter()
            .find(|user| user.gid == entry.gid)
            .map(|user| user.name.clone())
            .unwrap_or_else(|| entry.gid.to_string());

        let mtime = entry
            .modified_at
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();

        format!(
            "{} {:>8} {:>8} {:>10} {:>10} {}",
            entry.mode.display(entry.kind),
            owner,
            group,
            entry.size,
            mtime,
            entry.name
        )
    }
}
