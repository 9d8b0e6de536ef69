//! # File Handles
//!
//! This module implements the handle lifecycle and data-transfer surface of
//! the facade: opening descriptors in read-only, read-write, and append
//! modes, positional and sequential reads, positional writes, append,
//! truncation, advisory locking, and fallible close.
//!
//! ## Ownership Model
//!
//! A [`FileFd`] owns its OS descriptor. Release is exactly-once by
//! construction:
//!
//! ```text
//! close(self) -> Result<()>   // consumes the handle, surfaces OS status
//! Drop                        // silent release if close() was never called
//! ```
//!
//! Using a handle after close is a compile error, not a runtime hazard:
//! the value no longer exists. Callers that care about delayed write
//! errors surfaced at close time must call `close()` rather than dropping.
//!
//! ## Open Modes
//!
//! | Constructor     | Creates | Truncates | Cursor semantics              |
//! |-----------------|---------|-----------|-------------------------------|
//! | `open_ro`       | never   | never     | positional + sequential reads |
//! | `open_rw`       | if absent | never   | positional reads and writes   |
//! | `open_append`   | if absent | never   | every write lands at true EOF |
//!
//! `open_rw` never truncates existing bytes; shrinking a file is always an
//! explicit `truncate` call.
//!
//! ## Append Atomicity
//!
//! `open_append` relies on the OS's native `O_APPEND` positioning: the
//! seek-to-end and the write are one atomic step, so concurrent appenders
//! from other threads or processes never interleave within a single
//! `append` call. The facade does not emulate this with seek+write.
//!
//! ## Cursor Discipline
//!
//! `read_at`/`write_at` use `pread`/`pwrite` and never move the
//! descriptor's implicit cursor. `read_seq` is the only cursor-moving
//! read; it takes `&mut self` so two threads cannot race one handle's
//! cursor in safe code. Its internal short-read loop retries until the
//! buffer is full or EOF, so a short `Ok` count means EOF, never a
//! swallowed error.
//!
//! ## Advisory Locking
//!
//! `lock` takes a non-blocking exclusive `flock` on the descriptor.
//! Contention is reported as [`FsError::LockContended`], not treated as
//! fatal. The lock lives until the descriptor is closed and is not
//! reentrant across descriptors: two handles on the same file contend
//! even within one process.
//!
//! ## Platform Notes
//!
//! Positional I/O, locking, and close-status reporting use Unix
//! descriptors directly (`pread`/`pwrite`/`flock`/`close`). On non-Unix
//! targets `lock` reports unsupported and close status is not observable
//! beyond what the runtime provides.

use std::fs::{File, OpenOptions};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use tracing::trace;

use crate::error::{FsError, Result};

#[cfg(unix)]
use std::os::unix::fs::FileExt;
#[cfg(unix)]
use std::os::unix::io::{AsRawFd, IntoRawFd, RawFd};

/// An owned OS file descriptor with positional and append I/O.
#[derive(Debug)]
pub struct FileFd {
    file: File,
    path: PathBuf,
}

impl FileFd {
    /// Opens an existing file for reading. Never creates.
    pub fn open_ro(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = OpenOptions::new()
            .read(true)
            .open(path)
            .map_err(|e| FsError::from_io("open_ro", path, e))?;
        trace!(path = %path.display(), "opened read-only");
        Ok(Self {
            file,
            path: path.to_path_buf(),
        })
    }

    /// Opens a file for reading and writing, creating it if absent.
    ///
    /// Existing bytes are preserved; shrinking is always an explicit
    /// [`truncate`](Self::truncate).
    pub fn open_rw(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(path)
            .map_err(|e| FsError::from_io("open_rw", path, e))?;
        trace!(path = %path.display(), "opened read-write");
        Ok(Self {
            file,
            path: path.to_path_buf(),
        })
    }

    /// Opens a file for appending, creating it if absent.
    ///
    /// The descriptor carries the OS's native append semantics: every
    /// [`append`](Self::append) lands atomically at the file's true end,
    /// even under concurrent writers from other processes.
    pub fn open_append(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = OpenOptions::new()
            .append(true)
            .create(true)
            .open(path)
            .map_err(|e| FsError::from_io("open_append", path, e))?;
        trace!(path = %path.display(), "opened append");
        Ok(Self {
            file,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current file length in bytes.
    pub fn len(&self) -> Result<u64> {
        let meta = self
            .file
            .metadata()
            .map_err(|e| FsError::from_io("len", &self.path, e))?;
        Ok(meta.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    pub(crate) fn file(&self) -> &File {
        &self.file
    }

    #[cfg(unix)]
    pub fn as_raw_fd(&self) -> RawFd {
        self.file.as_raw_fd()
    }

    /// Acquires a non-blocking exclusive advisory lock on the descriptor.
    ///
    /// Contention reports [`FsError::LockContended`]. The lock is released
    /// when the descriptor closes; it is not reentrant across descriptors.
    #[cfg(unix)]
    pub fn lock(&self) -> Result<()> {
        let rc = unsafe { libc::flock(self.file.as_raw_fd(), libc::LOCK_EX | libc::LOCK_NB) };
        if rc == 0 {
            trace!(path = %self.path.display(), "acquired advisory lock");
            return Ok(());
        }
        let err = io::Error::last_os_error();
        if err.raw_os_error() == Some(libc::EWOULDBLOCK) {
            Err(FsError::LockContended {
                path: self.path.clone(),
            })
        } else {
            Err(FsError::from_io("lock", &self.path, err))
        }
    }

    #[cfg(not(unix))]
    pub fn lock(&self) -> Result<()> {
        Err(FsError::Io {
            op: "lock",
            path: self.path.clone(),
            source: io::Error::new(io::ErrorKind::Unsupported, "advisory locks require unix"),
        })
    }

    /// Reads up to `buf.len()` bytes at `offset` without moving the cursor.
    ///
    /// Returns the byte count from a single OS read; short counts near EOF
    /// are normal and not an error.
    pub fn read_at(&self, buf: &mut [u8], offset: u64) -> Result<usize> {
        check_range("read_at", offset, buf.len())?;
        #[cfg(unix)]
        let n = self
            .file
            .read_at(buf, offset)
            .map_err(|e| FsError::from_io("read_at", &self.path, e))?;
        #[cfg(not(unix))]
        let n = read_at_fallback(&self.file, buf, offset)
            .map_err(|e| FsError::from_io("read_at", &self.path, e))?;
        Ok(n)
    }

    /// Writes `buf` at `offset` without moving the cursor.
    pub fn write_at(&self, buf: &[u8], offset: u64) -> Result<usize> {
        check_range("write_at", offset, buf.len())?;
        #[cfg(unix)]
        let n = self
            .file
            .write_at(buf, offset)
            .map_err(|e| FsError::from_io("write_at", &self.path, e))?;
        #[cfg(not(unix))]
        let n = write_at_fallback(&self.file, buf, offset)
            .map_err(|e| FsError::from_io("write_at", &self.path, e))?;
        Ok(n)
    }

    /// Reads from the descriptor's cursor, advancing it.
    ///
    /// Short reads are retried internally until `buf` is full or EOF.
    /// `Ok(n)` with `n < buf.len()` therefore always means end-of-file;
    /// I/O failures are reported as `Err`, never as a short count.
    pub fn read_seq(&mut self, buf: &mut [u8]) -> Result<usize> {
        let mut total = 0;
        while total < buf.len() {
            match self.file.read(&mut buf[total..]) {
                Ok(0) => break,
                Ok(n) => total += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(FsError::from_io("read_seq", &self.path, e)),
            }
        }
        Ok(total)
    }

    /// Appends `buf` at the file's true end.
    ///
    /// Issues a single OS write on the append descriptor, so the bytes are
    /// contiguous and land at EOF regardless of concurrent appenders.
    /// Requires a handle from [`open_append`](Self::open_append).
    pub fn append(&self, buf: &[u8]) -> Result<usize> {
        (&self.file)
            .write(buf)
            .map_err(|e| FsError::from_io("append", &self.path, e))
    }

    /// Grows or shrinks the file to `new_len`.
    ///
    /// Growth zero-fills the new region with OS sparse semantics; shrink
    /// discards trailing bytes irreversibly.
    pub fn truncate(&self, new_len: u64) -> Result<()> {
        self.file
            .set_len(new_len)
            .map_err(|e| FsError::from_io("truncate", &self.path, e))
    }

    /// Closes the descriptor, surfacing the OS close status.
    ///
    /// Delayed write errors some file systems report only at close time
    /// are visible here and nowhere else; dropping the handle releases the
    /// descriptor but discards that status.
    pub fn close(self) -> Result<()> {
        let Self { file, path } = self;
        trace!(path = %path.display(), "closing");
        close_file(file, &path)
    }
}

#[cfg(unix)]
fn close_file(file: File, path: &Path) -> Result<()> {
    let fd = file.into_raw_fd();
    // The descriptor is consumed even when close() fails; retrying would
    // race a reused fd number.
    if unsafe { libc::close(fd) } == -1 {
        return Err(FsError::from_io("close", path, io::Error::last_os_error()));
    }
    Ok(())
}

#[cfg(not(unix))]
fn close_file(file: File, _path: &Path) -> Result<()> {
    drop(file);
    Ok(())
}

/// Rejects offset/length pairs that overflow the addressable range.
fn check_range(op: &'static str, offset: u64, len: usize) -> Result<()> {
    if offset.checked_add(len as u64).is_none() {
        return Err(FsError::invalid_argument(
            op,
            format!("offset {offset} + len {len} overflows"),
        ));
    }
    Ok(())
}

#[cfg(not(unix))]
fn read_at_fallback(mut file: &File, buf: &mut [u8], offset: u64) -> io::Result<usize> {
    use std::io::{Seek, SeekFrom};
    let pos = file.stream_position()?;
    file.seek(SeekFrom::Start(offset))?;
    let n = file.read(buf);
    file.seek(SeekFrom::Start(pos))?;
    n
}

#[cfg(not(unix))]
fn write_at_fallback(mut file: &File, buf: &[u8], offset: u64) -> io::Result<usize> {
    use std::io::{Seek, SeekFrom};
    let pos = file.stream_position()?;
    file.seek(SeekFrom::Start(offset))?;
    let n = file.write(buf);
    file.seek(SeekFrom::Start(pos))?;
    n
}
