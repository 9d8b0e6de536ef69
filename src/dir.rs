//! # Directory Iteration
//!
//! This module implements the find-first/find-next/find-close protocol
//! the storage engine uses to discover partitions and table directories.
//! A [`DirStream`] is a tagged state machine, not a bare cursor:
//!
//! ```text
//! open ──> NotStarted ──advance──> Active ──advance──> ... ──> Exhausted
//!                │                   │                            │
//!                └── name/type: rejected                          │
//!                                    └── name/type: current entry │
//!                                         name/type: rejected ────┘
//! ```
//!
//! `advance` returns `Ok(false)` once the stream is exhausted and keeps
//! returning it; `name`/`entry_type` outside the `Active` state are
//! rejected as invalid-argument errors rather than left undefined. The
//! current entry's name is borrowed from the stream, so holding it across
//! an `advance` is a compile error.
//!
//! ## Entry Types
//!
//! [`EntryType`] is the fixed enumeration shared with persisted records;
//! the numeric codes must never change. `Whiteout` exists for code
//! compatibility and is never produced on platforms where the standard
//! library cannot observe whiteout entries.
//!
//! ## Dot Entries
//!
//! `.` and `..` are always excluded from iteration: callers traverse data
//! partitions, not generic directory trees, and none of them want the
//! self/parent links.

use std::ffi::{OsStr, OsString};
use std::fs::{self, ReadDir};
use std::path::{Path, PathBuf};

use tracing::trace;

use crate::error::{FsError, Result};

/// Type of a directory entry.
///
/// Discriminants are part of the persisted on-disk vocabulary and must
/// not change.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryType {
    Unknown = 0,
    Fifo = 1,
    CharDevice = 2,
    Directory = 4,
    BlockDevice = 6,
    RegularFile = 8,
    Symlink = 10,
    Socket = 12,
    Whiteout = 14,
}

impl EntryType {
    pub fn code(self) -> i32 {
        self as i32
    }

    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(Self::Unknown),
            1 => Some(Self::Fifo),
            2 => Some(Self::CharDevice),
            4 => Some(Self::Directory),
            6 => Some(Self::BlockDevice),
            8 => Some(Self::RegularFile),
            10 => Some(Self::Symlink),
            12 => Some(Self::Socket),
            14 => Some(Self::Whiteout),
            _ => None,
        }
    }

    #[cfg(unix)]
    fn from_file_type(ft: fs::FileType) -> Self {
        use std::os::unix::fs::FileTypeExt;
        if ft.is_file() {
            Self::RegularFile
        } else if ft.is_dir() {
            Self::Directory
        } else if ft.is_symlink() {
            Self::Symlink
        } else if ft.is_fifo() {
            Self::Fifo
        } else if ft.is_socket() {
            Self::Socket
        } else if ft.is_char_device() {
            Self::CharDevice
        } else if ft.is_block_device() {
            Self::BlockDevice
        } else {
            Self::Unknown
        }
    }

    #[cfg(not(unix))]
    fn from_file_type(ft: fs::FileType) -> Self {
        if ft.is_file() {
            Self::RegularFile
        } else if ft.is_dir() {
            Self::Directory
        } else if ft.is_symlink() {
            Self::Symlink
        } else {
            Self::Unknown
        }
    }
}

#[derive(Debug)]
struct Entry {
    name: OsString,
    kind: EntryType,
}

#[derive(Debug)]
enum State {
    NotStarted,
    Active(Entry),
    Exhausted,
}

/// An open directory stream yielding (name, type) entries.
#[derive(Debug)]
pub struct DirStream {
    path: PathBuf,
    iter: ReadDir,
    state: State,
}

impl DirStream {
    /// Opens a stream over the entries of `path` (find-first).
    ///
    /// The stream starts before the first entry; call
    /// [`advance`](Self::advance) to position on it.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let iter = fs::read_dir(path).map_err(|e| FsError::from_io("find_first", path, e))?;
        trace!(path = %path.display(), "opened directory stream");
        Ok(Self {
            path: path.to_path_buf(),
            iter,
            state: State::NotStarted,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Positions the stream on the next entry (find-next).
    ///
    /// Returns `Ok(false)` once the stream is exhausted; subsequent calls
    /// keep returning it. Entry types come from the directory record where
    /// the file system provides them; entries whose type cannot be
    /// determined are reported as [`EntryType::Unknown`].
    pub fn advance(&mut self) -> Result<bool> {
        if matches!(self.state, State::Exhausted) {
            return Ok(false);
        }
        match self.iter.next() {
            Some(Ok(entry)) => {
                // Symlinks are reported as symlinks, not their targets.
                let kind = entry
                    .file_type()
                    .map(EntryType::from_file_type)
                    .unwrap_or(EntryType::Unknown);
                self.state = State::Active(Entry {
                    name: entry.file_name(),
                    kind,
                });
                Ok(true)
            }
            Some(Err(e)) => {
                self.state = State::Exhausted;
                Err(FsError::from_io("find_next", &self.path, e))
            }
            None => {
                self.state = State::Exhausted;
                Ok(false)
            }
        }
    }

    /// Name of the current entry (find-name).
    ///
    /// Valid only while positioned on an entry; the borrow ends at the
    /// next [`advance`](Self::advance).
    pub fn name(&self) -> Result<&OsStr> {
        match &self.state {
            State::Active(entry) => Ok(&entry.name),
            State::NotStarted => Err(FsError::invalid_argument(
                "find_name",
                "stream not positioned on an entry yet",
            )),
            State::Exhausted => Err(FsError::invalid_argument(
                "find_name",
                "stream is exhausted",
            )),
        }
    }

    /// Type of the current entry (find-type).
    pub fn entry_type(&self) -> Result<EntryType> {
        match &self.state {
            State::Active(entry) => Ok(entry.kind),
            State::NotStarted => Err(FsError::invalid_argument(
                "find_type",
                "stream not positioned on an entry yet",
            )),
            State::Exhausted => Err(FsError::invalid_argument(
                "find_type",
                "stream is exhausted",
            )),
        }
    }

    /// Releases the stream (find-close). Dropping is equivalent.
    pub fn close(self) {
        trace!(path = %self.path.display(), "closed directory stream");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use tempfile::tempdir;

    #[test]
    fn entry_type_codes_round_trip() {
        for code in [0, 1, 2, 4, 6, 8, 10, 12, 14] {
            let ty = EntryType::from_code(code).unwrap();
            assert_eq!(ty.code(), code);
        }
        assert_eq!(EntryType::from_code(3), None);
        assert_eq!(EntryType::from_code(7), None);
        assert_eq!(EntryType::from_code(99), None);
    }

    #[test]
    fn open_fails_for_missing_directory() {
        let dir = tempdir().unwrap();
        let err = DirStream::open(dir.path().join("missing")).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn yields_files_and_directories_with_types() {
        let dir = tempdir().unwrap();
        File::create(dir.path().join("a.txt")).unwrap();
        File::create(dir.path().join("b.txt")).unwrap();
        fs::create_dir(dir.path().join("c")).unwrap();

        let mut stream = DirStream::open(dir.path()).unwrap();
        let mut seen = Vec::new();
        while stream.advance().unwrap() {
            seen.push((
                stream.name().unwrap().to_os_string(),
                stream.entry_type().unwrap(),
            ));
        }
        stream.close();

        seen.sort_by(|a, b| a.0.cmp(&b.0));
        assert_eq!(
            seen,
            vec![
                (OsString::from("a.txt"), EntryType::RegularFile),
                (OsString::from("b.txt"), EntryType::RegularFile),
                (OsString::from("c"), EntryType::Directory),
            ]
        );
    }

    #[test]
    fn dot_entries_are_excluded() {
        let dir = tempdir().unwrap();
        let mut stream = DirStream::open(dir.path()).unwrap();
        assert!(!stream.advance().unwrap());
    }

    #[test]
    fn name_before_first_advance_is_rejected() {
        let dir = tempdir().unwrap();
        File::create(dir.path().join("a.txt")).unwrap();

        let stream = DirStream::open(dir.path()).unwrap();
        assert!(stream.name().unwrap_err().is_invalid_argument());
        assert!(stream.entry_type().unwrap_err().is_invalid_argument());
    }

    #[test]
    fn exhaustion_is_sticky_and_rejects_entry_access() {
        let dir = tempdir().unwrap();
        File::create(dir.path().join("only.txt")).unwrap();

        let mut stream = DirStream::open(dir.path()).unwrap();
        assert!(stream.advance().unwrap());
        assert!(!stream.advance().unwrap());
        assert!(!stream.advance().unwrap());
        assert!(stream.name().unwrap_err().is_invalid_argument());
        assert!(stream.entry_type().unwrap_err().is_invalid_argument());
    }

    #[cfg(unix)]
    #[test]
    fn symlinks_are_reported_as_symlinks() {
        let dir = tempdir().unwrap();
        File::create(dir.path().join("target.txt")).unwrap();
        std::os::unix::fs::symlink(dir.path().join("target.txt"), dir.path().join("link"))
            .unwrap();

        let mut stream = DirStream::open(dir.path()).unwrap();
        let mut link_type = None;
        while stream.advance().unwrap() {
            if stream.name().unwrap() == "link" {
                link_type = Some(stream.entry_type().unwrap());
            }
        }
        assert_eq!(link_type, Some(EntryType::Symlink));
    }
}
