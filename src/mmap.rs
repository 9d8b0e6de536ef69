//! # Memory Mapping
//!
//! This module maps byte ranges of open files into the process address
//! space for zero-copy column access. A [`Mapping`] is an owning guard
//! over one mapped region; the OS resources are released exactly once,
//! when the guard is consumed by [`Mapping::unmap`] or dropped.
//!
//! ## Contract
//!
//! ```text
//! Mapping::map(&fd, len, offset, mode) -> Result<Mapping>
//! ```
//!
//! - `offset` must be a multiple of [`page_size`]; the facade never
//!   auto-aligns.
//! - `len` must be non-zero and `[offset, offset + len)` must lie within
//!   the file's current extent. Both are validated with a cheap `fstat`
//!   before delegating to the OS.
//! - `mode` selects the protection: [`MapMode::ReadOnly`] regions reject
//!   mutable access at the API level; [`MapMode::ReadWrite`] regions are
//!   `MAP_SHARED`, so stores are visible to every mapping of the same
//!   region through OS page-cache coherency.
//!
//! Persistence of stores is asynchronous; explicit flushing is the
//! runtime's concern, not this facade's.
//!
//! ## Release Discipline
//!
//! The guard releases exactly the (address, length) pair the OS handed
//! out at creation. Double-unmap and partial-unmap are therefore
//! unrepresentable rather than runtime errors: once `unmap(self)`
//! consumes the guard, no path can touch the region again.
//!
//! ## Platform Support
//!
//! Mapping goes through `memmap2` (mmap/munmap on Unix,
//! CreateFileMapping/MapViewOfFile on Windows). The `prefetch` hint is
//! `madvise(MADV_WILLNEED)` on Unix and a no-op elsewhere.

use std::io;
use std::sync::OnceLock;

use memmap2::{Mmap, MmapMut, MmapOptions};
use tracing::trace;

use crate::error::{FsError, Result};
use crate::handle::FileFd;

/// Protection mode for a mapped region.
///
/// Discriminants are part of the persisted on-disk vocabulary and must
/// not change.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapMode {
    ReadOnly = 1,
    ReadWrite = 2,
}

impl MapMode {
    pub fn code(self) -> i32 {
        self as i32
    }

    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            1 => Some(Self::ReadOnly),
            2 => Some(Self::ReadWrite),
            _ => None,
        }
    }
}

/// Size of a virtual-memory page on this system.
///
/// Mapping offsets must be multiples of this value.
pub fn page_size() -> usize {
    static PAGE_SIZE: OnceLock<usize> = OnceLock::new();
    *PAGE_SIZE.get_or_init(query_page_size)
}

#[cfg(unix)]
fn query_page_size() -> usize {
    // sysconf(_SC_PAGESIZE) cannot fail on any supported platform.
    unsafe { libc::sysconf(libc::_SC_PAGESIZE) as usize }
}

#[cfg(not(unix))]
fn query_page_size() -> usize {
    4096
}

#[derive(Debug)]
enum Region {
    Ro(Mmap),
    Rw(MmapMut),
}

/// An owned mapped region backing a byte range of a file.
#[derive(Debug)]
pub struct Mapping {
    region: Region,
}

impl Mapping {
    /// Maps `[offset, offset + len)` of `fd` with the given protection.
    pub fn map(fd: &FileFd, len: usize, offset: u64, mode: MapMode) -> Result<Self> {
        if len == 0 {
            return Err(FsError::invalid_argument("mmap", "zero-length mapping"));
        }
        let page = page_size() as u64;
        if offset % page != 0 {
            return Err(FsError::invalid_argument(
                "mmap",
                format!("offset {offset} is not a multiple of the page size {page}"),
            ));
        }
        let file_len = fd.len()?;
        let end = offset
            .checked_add(len as u64)
            .ok_or_else(|| FsError::invalid_argument("mmap", "offset + len overflows"))?;
        if end > file_len {
            return Err(FsError::invalid_argument(
                "mmap",
                format!("range [{offset}, {end}) exceeds file length {file_len}"),
            ));
        }

        let mut options = MmapOptions::new();
        options.offset(offset).len(len);

        // SAFETY: mapping a file is unsafe because other processes can
        // mutate the bytes underneath us. This is safe for the facade's
        // contract because:
        // 1. The range was validated against the file extent above, so the
        //    mapping never extends past EOF at creation time.
        // 2. The region's lifetime is tied to Mapping, so use-after-unmap
        //    is unrepresentable.
        // 3. Coordination between mappers of the same file is the
        //    caller's documented responsibility.
        let region = match mode {
            MapMode::ReadOnly => Region::Ro(unsafe {
                options
                    .map(fd.file())
                    .map_err(|e| map_error(fd, e))?
            }),
            MapMode::ReadWrite => Region::Rw(unsafe {
                options
                    .map_mut(fd.file())
                    .map_err(|e| map_error(fd, e))?
            }),
        };

        trace!(
            path = %fd.path().display(),
            offset,
            len,
            mode = mode.code(),
            "mapped region"
        );
        Ok(Self { region })
    }

    pub fn mode(&self) -> MapMode {
        match self.region {
            Region::Ro(_) => MapMode::ReadOnly,
            Region::Rw(_) => MapMode::ReadWrite,
        }
    }

    pub fn len(&self) -> usize {
        match &self.region {
            Region::Ro(m) => m.len(),
            Region::Rw(m) => m.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_ptr(&self) -> *const u8 {
        match &self.region {
            Region::Ro(m) => m.as_ptr(),
            Region::Rw(m) => m.as_ptr(),
        }
    }

    pub fn as_slice(&self) -> &[u8] {
        match &self.region {
            Region::Ro(m) => &m[..],
            Region::Rw(m) => &m[..],
        }
    }

    /// Mutable view of the region. Rejected for read-only mappings.
    pub fn as_mut_slice(&mut self) -> Result<&mut [u8]> {
        match &mut self.region {
            Region::Ro(_) => Err(FsError::invalid_argument(
                "as_mut_slice",
                "mapping is read-only",
            )),
            Region::Rw(m) => Ok(&mut m[..]),
        }
    }

    /// Hints the OS that `[offset, offset + len)` of the region will be
    /// read soon. Best-effort; out-of-range requests are clamped.
    pub fn prefetch(&self, offset: usize, len: usize) {
        if offset >= self.len() {
            return;
        }
        let len = len.min(self.len() - offset);

        #[cfg(unix)]
        // SAFETY: offset was bounds-checked above and len clamped, so the
        // advised range stays inside the live mapping. madvise is a hint
        // and its failure is ignorable.
        unsafe {
            libc::madvise(
                self.as_ptr().add(offset) as *mut libc::c_void,
                len,
                libc::MADV_WILLNEED,
            );
        }
        #[cfg(not(unix))]
        let _ = len;
    }

    /// Releases the region.
    ///
    /// Consuming the guard is the only release path, so the exact
    /// (address, length) pair from creation is always what reaches the
    /// OS; dropping the guard is equivalent.
    pub fn unmap(self) {
        trace!(len = self.len(), "unmapping region");
    }
}

fn map_error(fd: &FileFd, err: io::Error) -> FsError {
    FsError::from_io("mmap", fd.path(), err)
}
