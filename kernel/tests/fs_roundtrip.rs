//! OTFS round-trip over a real image file: every byte written before an
//! unmount must read back after a fresh mount of the same file, sparse
//! gaps included.

use std::fs::OpenOptions;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use kernel::fs::disk::{Disk, DiskError, MemDisk};
use kernel::fs::otfs::{IMAGE_SIZE, OpenFlags, Otfs};

/// `Disk` over a plain `std::fs::File`, the hosted stand-in for a block
/// device.
struct FileDisk {
    file: std::fs::File,
}

impl FileDisk {
    fn create(path: &Path) -> Self {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)
            .expect("create image file");
        file.set_len(IMAGE_SIZE as u64).expect("size image file");
        FileDisk { file }
    }

    fn reopen(path: &Path) -> Self {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .expect("reopen image file");
        FileDisk { file }
    }
}

impl Disk for FileDisk {
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> Result<(), DiskError> {
        self.file
            .seek(SeekFrom::Start(offset))
            .map_err(|_| DiskError)?;
        self.file.read_exact(buf).map_err(|_| DiskError)
    }

    fn write_at(&mut self, offset: u64, buf: &[u8]) -> Result<(), DiskError> {
        self.file
            .seek(SeekFrom::Start(offset))
            .map_err(|_| DiskError)?;
        self.file.write_all(buf).map_err(|_| DiskError)
    }

    fn flush(&mut self) -> Result<(), DiskError> {
        self.file.flush().map_err(|_| DiskError)
    }
}

fn write_file<D: Disk>(fs: &mut Otfs<D>, name: &str, data: &[u8]) {
    let fd = fs
        .open(name, OpenFlags::WRITE | OpenFlags::CREATE)
        .expect("open for write");
    assert_eq!(fs.write(fd, data).expect("write"), data.len());
    fs.close(fd).expect("close");
}

fn read_file<D: Disk>(fs: &mut Otfs<D>, name: &str) -> Vec<u8> {
    let fd = fs.open(name, OpenFlags::READ).expect("open for read");
    let size = fs.stat(name).expect("stat") as usize;
    let mut buf = vec![0u8; size];
    assert_eq!(fs.read(fd, &mut buf).expect("read"), size);
    fs.close(fd).expect("close");
    buf
}

#[test]
fn full_roundtrip_survives_remount() {
    let dir = tempfile::tempdir().expect("tempdir");
    let image = dir.path().join("otfs.img");

    let mut disk = FileDisk::create(&image);
    Otfs::format(&mut disk).expect("format");
    let mut fs = Otfs::mount(disk).expect("mount");

    // Plain write and read-back.
    write_file(&mut fs, "note.txt", b"bootstrapped file content");
    assert_eq!(read_file(&mut fs, "note.txt"), b"bootstrapped file content");

    // Overwrite through truncation.
    let fd = fs
        .open("note.txt", OpenFlags::WRITE | OpenFlags::TRUNC)
        .expect("open trunc");
    fs.write(fd, b"updated file content after truncation")
        .expect("overwrite");
    fs.close(fd).expect("close");
    assert_eq!(
        read_file(&mut fs, "note.txt"),
        b"updated file content after truncation"
    );

    // Patch in place via seek.
    let fd = fs
        .open("note.txt", OpenFlags::READ | OpenFlags::WRITE)
        .expect("open rw");
    fs.seek(fd, 8).expect("seek");
    fs.write(fd, b"DATA").expect("patch");
    fs.close(fd).expect("close");
    assert_eq!(
        read_file(&mut fs, "note.txt"),
        b"updated DATA content after truncation"
    );

    // A file spanning three data blocks.
    let pattern: Vec<u8> = (0..1300u32).map(|i| (i * 7 % 256) as u8).collect();
    write_file(&mut fs, "blob.bin", &pattern);
    assert_eq!(read_file(&mut fs, "blob.bin"), pattern);

    // Sparse write: the gap reads back as zeros.
    let fd = fs
        .open("sparse.bin", OpenFlags::WRITE | OpenFlags::CREATE)
        .expect("open sparse");
    fs.seek(fd, 600).expect("seek past end");
    fs.write(fd, b"XYZ").expect("sparse write");
    fs.close(fd).expect("close");
    let sparse = read_file(&mut fs, "sparse.bin");
    assert_eq!(sparse.len(), 603);
    assert!(sparse[..600].iter().all(|&b| b == 0));
    assert_eq!(&sparse[600..], b"XYZ");

    // Unmount, reopen the image file from scratch, and verify every byte.
    fs.unmount().expect("unmount");
    let disk = FileDisk::reopen(&image);
    let mut fs = Otfs::mount(disk).expect("remount");

    assert_eq!(
        read_file(&mut fs, "note.txt"),
        b"updated DATA content after truncation"
    );
    assert_eq!(read_file(&mut fs, "blob.bin"), pattern);
    let sparse = read_file(&mut fs, "sparse.bin");
    assert!(sparse[..600].iter().all(|&b| b == 0));
    assert_eq!(&sparse[600..], b"XYZ");

    let mut names = fs.list();
    names.sort();
    assert_eq!(names, ["blob.bin", "note.txt", "sparse.bin"]);
}

#[test]
fn metadata_is_durable_without_unmount() {
    // Every write syncs metadata, so even a mount dropped on the floor
    // (no unmount) leaves a consistent image behind.
    let dir = tempfile::tempdir().expect("tempdir");
    let image = dir.path().join("otfs.img");

    let mut disk = FileDisk::create(&image);
    Otfs::format(&mut disk).expect("format");
    let mut fs = Otfs::mount(disk).expect("mount");
    write_file(&mut fs, "survivor.txt", b"synced at write time");
    drop(fs);

    let mut fs = Otfs::mount(FileDisk::reopen(&image)).expect("remount");
    assert_eq!(read_file(&mut fs, "survivor.txt"), b"synced at write time");
}

#[test]
fn truncated_image_fails_to_mount() {
    let mut disk = MemDisk::new(IMAGE_SIZE / 2);
    assert!(Otfs::format(&mut disk).is_err());
}

#[test]
fn formatted_image_has_expected_superblock() {
    let mut disk = MemDisk::new(IMAGE_SIZE);
    Otfs::format(&mut disk).expect("format");
    let bytes = disk.into_bytes();
    assert_eq!(&bytes[..8], b"OTFSv1\0\0");
    assert_eq!(u32::from_le_bytes(bytes[8..12].try_into().unwrap()), 1);
    assert_eq!(u32::from_le_bytes(bytes[12..16].try_into().unwrap()), 512);
    assert_eq!(u32::from_le_bytes(bytes[16..20].try_into().unwrap()), 256);
    // dir start/count, fat start/count, data start/count, max files.
    let words: Vec<u32> = (0..7)
        .map(|i| u32::from_le_bytes(bytes[20 + i * 4..24 + i * 4].try_into().unwrap()))
        .collect();
    assert_eq!(words, [1, 4, 5, 2, 7, 249, 32]);
    // FAT region is all 0xff after format.
    let fat_start = 5 * 512;
    assert!(bytes[fat_start..fat_start + 2 * 512].iter().all(|&b| b == 0xff));
}
