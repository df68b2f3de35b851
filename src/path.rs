use crate::{FsError, FsResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Canonical, absolute path: a sequence of segments starting at the root.
///
/// A `VfsPath` never contains empty, `.` or `..` segments, so it can be
/// printed and resolved again without changing.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VfsPath {
    segments: Vec<String>,
}

impl VfsPath {
    pub const SEPARATOR: char = '/';

    /// Longest accepted segment, in bytes.
    pub const NAME_MAX: usize = 255;

    pub fn root() -> Self {
        Self::default()
    }

    /// Resolves `input` against `cwd`.
    ///
    /// Absolute inputs start from the root, relative ones from `cwd`; `.` is
    /// dropped, `..` pops one segment (the root's parent is the root) and
    /// consecutive separators are collapsed. This is purely lexical: the
    /// resulting path may not exist.
    pub fn resolve(cwd: &VfsPath, input: &str) -> FsResult<Self> {
        if input.is_empty() {
            return Err(FsError::InvalidPath("empty path".into()));
        }

        let mut segments = if input.starts_with(Self::SEPARATOR) {
            Vec::new()
        } else {
            cwd.segments.clone()
        };

        for segment in input.split(Self::SEPARATOR) {
            match segment {
                "" | "." => continue,

                ".." => {
                    segments.pop();
                }

                segment => {
                    Self::check_name(segment)?;
                    segments.push(segment.to_owned());
                }
            }
        }

        Ok(Self { segments })
    }

    /// Validates a single segment, as it would be stored in a directory.
    pub fn check_name(name: &str) -> FsResult<()> {
        if matches!(name, "" | "." | "..") || name.contains(Self::SEPARATOR) {
            return Err(FsError::InvalidPath(format!("{:?}: invalid name", name)));
        }

        if name.contains('\0') {
            return Err(FsError::InvalidPath(format!(
                "{:?}: embedded null byte",
                name
            )));
        }

        if name.len() > Self::NAME_MAX {
            return Err(FsError::InvalidPath(format!(
                "{}...: name too long",
                name.chars().take(16).collect::<String>()
            )));
        }

        Ok(())
    }

    /// Shorthand for resolving an absolute path.
    pub fn parse(input: &str) -> FsResult<Self> {
        Self::resolve(&Self::root(), input)
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().map(String::as_str)
    }

    /// Last segment; `None` for the root.
    pub fn file_name(&self) -> Option<&str> {
        self.segments.last().map(String::as_str)
    }

    /// Parent directory; `None` for the root.
    pub fn parent(&self) -> Option<Self> {
        if self.is_root() {
            return None;
        }

        Some(Self {
            segments: self.segments[..self.segments.len() - 1].to_vec(),
        })
    }

    /// Appends a single, already validated, segment.
    pub fn join(&self, name: &str) -> Self {
        let mut segments = self.segments.clone();
        segments.push(name.to_owned());

        Self { segments }
    }
}

impl fmt::Display for VfsPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_root() {
            return write!(f, "{}", Self::SEPARATOR);
        }

        for segment in &self.segments {
            write!(f, "{}{}", Self::SEPARATOR, segment)?;
        }

        Ok(())
    }
}
