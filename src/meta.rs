//! # Path Metadata Operations
//!
//! Path-level operations the storage engine uses around its partition
//! directories: existence checks, directory create/remove, file removal,
//! rename, length, and last-modified get/set. All operations are
//! stateless; each takes a borrowed path, performs one OS interaction,
//! and returns.
//!
//! ## Rename Atomicity
//!
//! `rename` passes the OS's same-volume atomic rename through untouched;
//! an existing destination is replaced atomically. When the OS reports a
//! cross-volume move (`EXDEV`), the operation falls back to copy+delete,
//! which is **not** atomic: a crash mid-fallback can leave both paths
//! populated. Engines that need atomicity must keep source and
//! destination on one volume.
//!
//! ## Timestamps
//!
//! Last-modified times are read and written at the resolution the
//! platform stores; setting the time leaves the access time untouched.

use std::fs;
use std::path::Path;
use std::time::SystemTime;

use tracing::trace;

use crate::error::{FsError, Result};

/// Whether `path` references an existing file-system object.
pub fn exists(path: impl AsRef<Path>) -> bool {
    path.as_ref().exists()
}

/// Creates the directory `path` with the given POSIX permission bits.
///
/// Non-recursive: fails if a parent component is missing, and fails with
/// [`FsError::AlreadyExists`] if the target exists; the existing
/// directory is left untouched. `mode` is applied where the platform has
/// permission bits and ignored elsewhere.
pub fn mkdir(path: impl AsRef<Path>, mode: u32) -> Result<()> {
    let path = path.as_ref();
    let mut builder = fs::DirBuilder::new();
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(mode);
    }
    #[cfg(not(unix))]
    let _ = mode;
    builder
        .create(path)
        .map_err(|e| FsError::from_io("mkdir", path, e))?;
    trace!(path = %path.display(), mode, "created directory");
    Ok(())
}

/// Removes the empty directory `path`. Fails if it is non-empty.
pub fn rmdir(path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    fs::remove_dir(path).map_err(|e| FsError::from_io("rmdir", path, e))
}

/// Removes the regular file `path`.
///
/// Directories are rejected; use [`rmdir`] for those.
pub fn remove(path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let meta = fs::symlink_metadata(path).map_err(|e| FsError::from_io("remove", path, e))?;
    if meta.is_dir() {
        return Err(FsError::invalid_argument(
            "remove",
            format!("{} is a directory", path.display()),
        ));
    }
    fs::remove_file(path).map_err(|e| FsError::from_io("remove", path, e))
}

/// Renames `old` to `new`.
///
/// Same-volume renames are atomic and replace an existing destination.
/// Cross-volume renames fall back to copy+delete, which is not atomic
/// (see module docs).
pub fn rename(old: impl AsRef<Path>, new: impl AsRef<Path>) -> Result<()> {
    let (old, new) = (old.as_ref(), new.as_ref());
    match fs::rename(old, new) {
        Ok(()) => {
            trace!(old = %old.display(), new = %new.display(), "renamed");
            Ok(())
        }
        Err(e) if crosses_volumes(&e) => {
            trace!(old = %old.display(), new = %new.display(), "cross-volume rename, copying");
            fs::copy(old, new).map_err(|e| FsError::from_io("rename", new, e))?;
            fs::remove_file(old).map_err(|e| FsError::from_io("rename", old, e))
        }
        Err(e) => Err(FsError::from_io("rename", old, e)),
    }
}

#[cfg(unix)]
fn crosses_volumes(err: &std::io::Error) -> bool {
    err.raw_os_error() == Some(libc::EXDEV)
}

#[cfg(not(unix))]
fn crosses_volumes(_err: &std::io::Error) -> bool {
    false
}

/// Length of the file at `path` in bytes.
pub fn length(path: impl AsRef<Path>) -> Result<u64> {
    let path = path.as_ref();
    let meta = fs::metadata(path).map_err(|e| FsError::from_io("length", path, e))?;
    Ok(meta.len())
}

/// Last-modified timestamp of `path`.
pub fn last_modified(path: impl AsRef<Path>) -> Result<SystemTime> {
    let path = path.as_ref();
    let meta = fs::metadata(path).map_err(|e| FsError::from_io("last_modified", path, e))?;
    meta.modified()
        .map_err(|e| FsError::from_io("last_modified", path, e))
}

/// Sets the last-modified timestamp of `path`, leaving the access time
/// untouched. Times before the epoch are rejected.
#[cfg(unix)]
pub fn set_last_modified(path: impl AsRef<Path>, time: SystemTime) -> Result<()> {
    use std::ffi::CString;
    use std::os::unix::ffi::OsStrExt;

    let path = path.as_ref();
    let since_epoch = time
        .duration_since(SystemTime::UNIX_EPOCH)
        .map_err(|_| FsError::invalid_argument("set_last_modified", "time precedes the epoch"))?;
    let cpath = CString::new(path.as_os_str().as_bytes())
        .map_err(|_| FsError::invalid_argument("set_last_modified", "path contains NUL"))?;

    let times = [
        // Access time untouched.
        libc::timespec {
            tv_sec: 0,
            tv_nsec: libc::UTIME_OMIT,
        },
        libc::timespec {
            tv_sec: since_epoch.as_secs() as libc::time_t,
            tv_nsec: since_epoch.subsec_nanos() as libc::c_long,
        },
    ];
    let rc = unsafe { libc::utimensat(libc::AT_FDCWD, cpath.as_ptr(), times.as_ptr(), 0) };
    if rc == -1 {
        return Err(FsError::from_io(
            "set_last_modified",
            path,
            std::io::Error::last_os_error(),
        ));
    }
    Ok(())
}

#[cfg(not(unix))]
pub fn set_last_modified(path: impl AsRef<Path>, _time: SystemTime) -> Result<()> {
    Err(FsError::Io {
        op: "set_last_modified",
        path: path.as_ref().to_path_buf(),
        source: std::io::Error::new(
            std::io::ErrorKind::Unsupported,
            "setting timestamps requires unix",
        ),
    })
}
