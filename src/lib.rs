//! # filekit - Native File-System Primitives
//!
//! filekit is the low-level file I/O layer beneath an embedded storage
//! engine. It presents one uniform, synchronous contract over the
//! operating system's file APIs: descriptor lifecycle, positional and
//! append data transfer, memory mapping for zero-copy column access,
//! directory enumeration for partition discovery, advisory locking, and
//! path metadata.
//!
//! ## Architecture
//!
//! Four cohesive operation groups form one stateless facade:
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │            Storage Engine (caller)           │
//! ├───────────┬───────────┬──────────┬──────────┤
//! │  handle   │   mmap    │   dir    │   meta   │
//! │ open/close│ map/unmap │ find-*   │ mkdir,   │
//! │ read/write│ page size │ protocol │ rename,  │
//! │ append    │ prefetch  │          │ times    │
//! │ lock      │           │          │          │
//! ├───────────┴───────────┴──────────┴──────────┤
//! │           OS file-system APIs                │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! The facade holds no state of its own. Every OS resource (descriptor,
//! mapped region, directory stream) is owned by exactly one Rust value
//! ([`FileFd`], [`Mapping`], [`DirStream`]) that releases it exactly
//! once. The crate interprets no file contents, caches nothing, and
//! spawns no threads.
//!
//! ## Usage
//!
//! ```no_run
//! use filekit::{FileFd, MapMode, Mapping};
//!
//! fn main() -> filekit::Result<()> {
//!     let fd = FileFd::open_rw("partition/ts.d")?;
//!     fd.truncate(1 << 20)?;
//!
//!     let mut region = Mapping::map(&fd, 1 << 20, 0, MapMode::ReadWrite)?;
//!     region.as_mut_slice()?[..8].copy_from_slice(&42u64.to_le_bytes());
//!     region.unmap();
//!
//!     fd.close()
//! }
//! ```
//!
//! ## Concurrency Model
//!
//! Every operation may block the calling thread for the duration of the
//! underlying OS call; there is no cancellation or timeout. Distinct
//! handles and streams are independent OS resources and safe to use from
//! distinct threads. Operations on one shared handle are not serialized
//! here: cursor-moving reads take `&mut self`, and ordering of
//! overlapping positional writes is the caller's responsibility.
//!
//! ## Module Overview
//!
//! - [`handle`]: descriptor lifecycle and data transfer ([`FileFd`])
//! - [`mmap`]: memory-mapped regions ([`Mapping`], [`page_size`])
//! - [`dir`]: directory iteration protocol ([`DirStream`], [`EntryType`])
//! - [`meta`]: path metadata operations
//! - [`error`]: the [`FsError`] taxonomy all of the above report

pub mod dir;
pub mod error;
pub mod handle;
pub mod meta;
pub mod mmap;

pub use dir::{DirStream, EntryType};
pub use error::{FsError, Result};
pub use handle::FileFd;
pub use meta::{exists, last_modified, length, mkdir, remove, rename, rmdir, set_last_modified};
pub use mmap::{page_size, MapMode, Mapping};
