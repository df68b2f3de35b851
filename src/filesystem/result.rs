use anyhow::Error;
use libc::{EACCES, EEXIST, EINVAL, EIO, EISDIR, ENOENT, ENOSPC, ENOTDIR, ENOTEMPTY};
use std::ffi::c_int;
use thiserror::Error;
use tracing::{debug, error};

pub type FsResult<T> = Result<T, FsError>;

#[derive(Debug, Error)]
pub enum FsError {
    #[error("{0}: No such file or directory")]
    NotFound(String),

    #[error("{0}: File exists")]
    AlreadyExists(String),

    #[error("{0}: Not a directory")]
    NotADirectory(String),

    #[error("{0}: Is a directory")]
    IsADirectory(String),

    #[error("{0}: Directory not empty")]
    NotEmpty(String),

    #[error("{0}: Permission denied")]
    PermissionDenied(String),

    #[error("No space left on device (requested {requested} bytes, {available} available)")]
    OutOfSpace { requested: u64, available: u64 },

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error(transparent)]
    Other(#[from] Error),
}

impl FsError {
    pub fn errno(&self) -> c_int {
        match self {
            FsError::NotFound(_) => ENOENT,
            FsError::AlreadyExists(_) => EEXIST,
            FsError::NotADirectory(_) => ENOTDIR,
            FsError::IsADirectory(_) => EISDIR,
            FsError::NotEmpty(_) => ENOTEMPTY,
            FsError::PermissionDenied(_) => EACCES,
            FsError::OutOfSpace { .. } => ENOSPC,
            FsError::InvalidPath(_) | FsError::InvalidArgument(_) => EINVAL,
            FsError::Other(_) => EIO,
        }
    }

    pub fn log_and_convert(self) -> c_int {
        match &self {
            FsError::Other(err) => error!("... {:?}", err),
            err => debug!("... {}", err),
        }

        self.errno()
    }
}
