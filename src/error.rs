//! Error types for the primitives facade.
//!
//! Every fallible operation returns [`FsError`], a typed taxonomy the
//! storage engine above can machine-check: not-found, permission,
//! already-exists, exhaustion, lock contention, invalid argument, and
//! plain I/O. Classification from `std::io::Error` is centralized in
//! [`FsError::from_io`] so each call site reports the same category for
//! the same OS condition.
//!
//! Exhaustion covers descriptor limits (EMFILE/ENFILE), disk full
//! (ENOSPC/EDQUOT), and address-space pressure (ENOMEM): the conditions
//! a storage engine treats as back-pressure rather than bugs.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Result type for all facade operations.
pub type Result<T> = std::result::Result<T, FsError>;

/// Errors reported by file-system primitive operations.
#[derive(Debug, Error)]
pub enum FsError {
    /// Path or handle does not reference an existing resource.
    #[error("not found: {path}")]
    NotFound { path: PathBuf },

    /// The OS denied the requested access.
    #[error("permission denied: {path}")]
    PermissionDenied { path: PathBuf },

    /// Creation target already exists (mkdir, exclusive create).
    #[error("already exists: {path}")]
    AlreadyExists { path: PathBuf },

    /// Resource limits hit: open descriptors, disk space, address space.
    #[error("{op}: resource exhausted: {source}")]
    Exhausted {
        op: &'static str,
        #[source]
        source: io::Error,
    },

    /// Advisory lock is held by another process or descriptor.
    #[error("lock contended: {path}")]
    LockContended { path: PathBuf },

    /// Caller-supplied offset, length, or mode is out of contract.
    #[error("{op}: invalid argument: {reason}")]
    InvalidArgument { op: &'static str, reason: String },

    /// Underlying device or transport failure.
    #[error("{op} failed on {path}: {source}")]
    Io {
        op: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl FsError {
    /// Classifies a `std::io::Error` into the facade taxonomy.
    pub fn from_io(op: &'static str, path: &Path, err: io::Error) -> Self {
        if is_exhaustion(&err) {
            return Self::Exhausted { op, source: err };
        }
        match err.kind() {
            io::ErrorKind::NotFound => Self::NotFound {
                path: path.to_path_buf(),
            },
            io::ErrorKind::PermissionDenied => Self::PermissionDenied {
                path: path.to_path_buf(),
            },
            io::ErrorKind::AlreadyExists => Self::AlreadyExists {
                path: path.to_path_buf(),
            },
            _ => Self::Io {
                op,
                path: path.to_path_buf(),
                source: err,
            },
        }
    }

    pub fn invalid_argument(op: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            op,
            reason: reason.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    pub fn is_permission_denied(&self) -> bool {
        matches!(self, Self::PermissionDenied { .. })
    }

    pub fn is_already_exists(&self) -> bool {
        matches!(self, Self::AlreadyExists { .. })
    }

    pub fn is_exhausted(&self) -> bool {
        matches!(self, Self::Exhausted { .. })
    }

    pub fn is_contended(&self) -> bool {
        matches!(self, Self::LockContended { .. })
    }

    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, Self::InvalidArgument { .. })
    }
}

#[cfg(unix)]
fn is_exhaustion(err: &io::Error) -> bool {
    matches!(
        err.raw_os_error(),
        Some(libc::EMFILE | libc::ENFILE | libc::ENOSPC | libc::ENOMEM | libc::EDQUOT)
    )
}

#[cfg(not(unix))]
fn is_exhaustion(_err: &io::Error) -> bool {
    false
}
