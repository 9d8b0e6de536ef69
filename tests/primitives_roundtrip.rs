//! # Primitives Round-Trip Tests
//!
//! End-to-end checks of the facade's contract, exercised the way the
//! storage engine drives it:
//!
//! - Positional read/write idempotence at arbitrary offsets
//! - Mapping writes visible to subsequent positional reads
//! - Truncate growth zero-fills, shrink discards
//! - Rename atomically replaces an existing destination
//! - mkdir is non-destructive on existing directories
//! - The find-first/find-next/find-close protocol over a mixed directory
//! - Sequential reads distinguish EOF from I/O error by construction

use std::fs;

use tempfile::tempdir;

use filekit::{DirStream, EntryType, FileFd, MapMode, Mapping};

mod transfer_tests {
    use super::*;

    #[test]
    fn read_write_read_is_idempotent() {
        let dir = tempdir().unwrap();
        let fd = FileFd::open_rw(dir.path().join("col.d")).unwrap();

        let payload = b"0123456789abcdef";
        fd.write_at(payload, 4096).unwrap();

        let mut first = [0u8; 16];
        fd.read_at(&mut first, 4096).unwrap();
        fd.write_at(&first, 4096).unwrap();

        let mut second = [0u8; 16];
        fd.read_at(&mut second, 4096).unwrap();
        assert_eq!(first, second);
        assert_eq!(&second, payload);
    }

    #[test]
    fn truncate_grow_reads_all_zero() {
        let dir = tempdir().unwrap();
        let fd = FileFd::open_rw(dir.path().join("col.d")).unwrap();
        fd.write_at(b"head", 0).unwrap();

        fd.truncate(8192).unwrap();

        let mut buf = vec![0xAAu8; 8188];
        let n = fd.read_at(&mut buf, 4).unwrap();
        assert_eq!(n, 8188);
        assert!(buf.iter().all(|&b| b == 0));
    }

    #[test]
    fn sequential_read_reports_eof_as_short_count() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("col.d");
        let fd = FileFd::open_rw(&path).unwrap();
        fd.write_at(&[7u8; 1000], 0).unwrap();
        fd.close().unwrap();

        let mut fd = FileFd::open_ro(&path).unwrap();
        let mut buf = vec![0u8; 640];

        let n = fd.read_seq(&mut buf).unwrap();
        assert_eq!(n, 640);

        // Second fill hits EOF: short count, no error.
        let n = fd.read_seq(&mut buf).unwrap();
        assert_eq!(n, 360);
        assert!(buf[..360].iter().all(|&b| b == 7));

        let n = fd.read_seq(&mut buf).unwrap();
        assert_eq!(n, 0);
    }
}

mod mapping_tests {
    use super::*;

    #[test]
    fn mapped_write_then_unmap_then_positional_read() {
        let dir = tempdir().unwrap();
        let fd = FileFd::open_rw(dir.path().join("col.d")).unwrap();
        fd.truncate(16384).unwrap();

        let mut region = Mapping::map(&fd, 16384, 0, MapMode::ReadWrite).unwrap();
        region.as_mut_slice().unwrap()[8000..8008].copy_from_slice(b"columnar");
        region.unmap();

        let mut buf = [0u8; 8];
        fd.read_at(&mut buf, 8000).unwrap();
        assert_eq!(&buf, b"columnar");
    }

    #[test]
    fn two_mappings_of_one_region_are_coherent() {
        let dir = tempdir().unwrap();
        let fd = FileFd::open_rw(dir.path().join("col.d")).unwrap();
        fd.truncate(4096).unwrap();

        let mut writer = Mapping::map(&fd, 4096, 0, MapMode::ReadWrite).unwrap();
        let reader = Mapping::map(&fd, 4096, 0, MapMode::ReadOnly).unwrap();

        writer.as_mut_slice().unwrap()[0..3].copy_from_slice(b"abc");
        assert_eq!(&reader.as_slice()[0..3], b"abc");
    }
}

mod metadata_tests {
    use super::*;

    #[test]
    fn rename_replaces_destination_without_duplicates() {
        let dir = tempdir().unwrap();
        let old = dir.path().join("2024-01.d");
        let new = dir.path().join("2024-02.d");
        fs::write(&old, b"fresh").unwrap();
        fs::write(&new, b"stale").unwrap();

        filekit::rename(&old, &new).unwrap();

        assert!(!filekit::exists(&old));
        assert_eq!(fs::read(&new).unwrap(), b"fresh");
    }

    #[test]
    fn mkdir_existing_fails_without_touching_contents() {
        let dir = tempdir().unwrap();
        let part = dir.path().join("partition");
        filekit::mkdir(&part, 0o755).unwrap();
        fs::write(part.join("ts.d"), b"rows").unwrap();

        let err = filekit::mkdir(&part, 0o755).unwrap_err();
        assert!(err.is_already_exists());
        assert_eq!(fs::read(part.join("ts.d")).unwrap(), b"rows");
    }

    #[test]
    fn length_tracks_appends() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("journal.d");
        let fd = FileFd::open_append(&path).unwrap();
        fd.append(&[1u8; 100]).unwrap();
        fd.append(&[2u8; 28]).unwrap();
        fd.close().unwrap();

        assert_eq!(filekit::length(&path).unwrap(), 128);
    }
}

mod discovery_tests {
    use super::*;

    #[test]
    fn protocol_yields_exactly_the_partition_contents() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), b"").unwrap();
        fs::write(dir.path().join("b.txt"), b"").unwrap();
        fs::create_dir(dir.path().join("c")).unwrap();

        let mut stream = DirStream::open(dir.path()).unwrap();
        let mut files = 0;
        let mut dirs = 0;
        let mut names = Vec::new();
        while stream.advance().unwrap() {
            names.push(stream.name().unwrap().to_os_string());
            match stream.entry_type().unwrap() {
                EntryType::RegularFile => files += 1,
                EntryType::Directory => dirs += 1,
                other => panic!("unexpected entry type {other:?}"),
            }
        }

        assert_eq!((files, dirs), (2, 1));
        names.sort();
        assert_eq!(names, ["a.txt", "b.txt", "c"]);

        // Exhaustion is final: advance stays false, entry access is
        // rejected.
        assert!(!stream.advance().unwrap());
        assert!(stream.name().is_err());
        stream.close();
    }
}
