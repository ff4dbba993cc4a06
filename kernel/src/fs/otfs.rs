//! OTFS: the on-image block filesystem.
//!
//! Fixed geometry: one superblock, four directory blocks, two FAT blocks,
//! and 249 data blocks of 512 bytes. Files are flat (no directories on
//! disk) and their data lives in FAT-chained blocks. The directory region
//! and FAT are cached in memory and flushed back after every mutation:
//! file creation, truncation and each successful write, which is what
//! makes the image safe to remount at any point between calls.

use alloc::string::String;
use alloc::vec;
use alloc::vec::Vec;
use bitflags::bitflags;

use super::disk::Disk;

pub const BLOCK_SIZE: usize = 512;
pub const TOTAL_BLOCKS: u32 = 256;
pub const DIR_START_BLOCK: u32 = 1;
pub const DIR_BLOCK_COUNT: u32 = 4;
pub const FAT_START_BLOCK: u32 = 5;
pub const FAT_BLOCK_COUNT: u32 = 2;
pub const DATA_START_BLOCK: u32 = 7;
pub const DATA_BLOCK_COUNT: u32 = TOTAL_BLOCKS - DATA_START_BLOCK;
pub const MAX_FILES: usize = 32;
pub const MAX_OPEN_FILES: usize = 16;
pub const MAX_NAME_LEN: usize = 31;

/// Bytes of a freshly formatted image.
pub const IMAGE_SIZE: usize = BLOCK_SIZE * TOTAL_BLOCKS as usize;

const VERSION: u32 = 1;
const MAGIC: [u8; 8] = *b"OTFSv1\0\0";

const FAT_FREE: u32 = 0xffff_ffff;
const FAT_END: u32 = 0xffff_fffe;

const SUPERBLOCK_SIZE: usize = 64;
const DIR_ENTRY_SIZE: usize = 64;

bitflags! {
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct OpenFlags: u32 {
        const READ = 1 << 0;
        const WRITE = 1 << 1;
        const CREATE = 1 << 2;
        const TRUNC = 1 << 3;
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FsError {
    InvalidArgument,
    Io,
    BadState,
    NotFound,
    NoSpace,
}

/// Open-file handle; an index into the open-file table.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Fd(usize);

#[derive(Clone)]
struct DirEntry {
    used: bool,
    name: [u8; 32],
    first_block: u32,
    size_bytes: u32,
}

impl DirEntry {
    fn empty() -> Self {
        DirEntry {
            used: false,
            name: [0; 32],
            first_block: FAT_END,
            size_bytes: 0,
        }
    }

    fn name_matches(&self, name: &str) -> bool {
        let bytes = name.as_bytes();
        if bytes.len() > MAX_NAME_LEN {
            return false;
        }
        &self.name[..bytes.len()] == bytes && self.name[bytes.len()] == 0
    }

    fn set_name(&mut self, name: &str) {
        self.name = [0; 32];
        self.name[..name.len()].copy_from_slice(name.as_bytes());
    }

    fn encode(&self, out: &mut [u8]) {
        out.fill(0);
        out[0] = self.used as u8;
        out[4..36].copy_from_slice(&self.name);
        out[36..40].copy_from_slice(&self.first_block.to_le_bytes());
        out[40..44].copy_from_slice(&self.size_bytes.to_le_bytes());
    }

    fn decode(raw: &[u8]) -> Self {
        let mut name = [0u8; 32];
        name.copy_from_slice(&raw[4..36]);
        DirEntry {
            used: raw[0] != 0,
            name,
            first_block: u32::from_le_bytes(raw[36..40].try_into().unwrap()),
            size_bytes: u32::from_le_bytes(raw[40..44].try_into().unwrap()),
        }
    }
}

#[derive(Clone, Copy)]
struct OpenFile {
    in_use: bool,
    dir_index: usize,
    offset: u32,
    flags: OpenFlags,
}

impl OpenFile {
    const fn closed() -> Self {
        OpenFile {
            in_use: false,
            dir_index: 0,
            offset: 0,
            flags: OpenFlags::empty(),
        }
    }
}

fn block_offset(block: u32) -> u64 {
    block as u64 * BLOCK_SIZE as u64
}

fn encode_superblock() -> [u8; SUPERBLOCK_SIZE] {
    let mut sb = [0u8; SUPERBLOCK_SIZE];
    sb[..8].copy_from_slice(&MAGIC);
    let fields = [
        VERSION,
        BLOCK_SIZE as u32,
        TOTAL_BLOCKS,
        DIR_START_BLOCK,
        DIR_BLOCK_COUNT,
        FAT_START_BLOCK,
        FAT_BLOCK_COUNT,
        DATA_START_BLOCK,
        DATA_BLOCK_COUNT,
        MAX_FILES as u32,
    ];
    for (i, field) in fields.iter().enumerate() {
        sb[8 + i * 4..12 + i * 4].copy_from_slice(&field.to_le_bytes());
    }
    sb
}

pub struct Otfs<D: Disk> {
    disk: D,
    dir: Vec<DirEntry>,
    fat: Vec<u32>,
    open_files: [OpenFile; MAX_OPEN_FILES],
}

impl<D: Disk> Otfs<D> {
    /// Writes a fresh image: zeroed blocks, then superblock, an all-empty
    /// directory region and an all-free FAT.
    pub fn format(disk: &mut D) -> Result<(), FsError> {
        let zeros = [0u8; BLOCK_SIZE];
        for block in 0..TOTAL_BLOCKS {
            disk.write_at(block_offset(block), &zeros)
                .map_err(|_| FsError::Io)?;
        }

        disk.write_at(0, &encode_superblock())
            .map_err(|_| FsError::Io)?;

        let mut dir_bytes = vec![0u8; MAX_FILES * DIR_ENTRY_SIZE];
        let empty = DirEntry::empty();
        for i in 0..MAX_FILES {
            empty.encode(&mut dir_bytes[i * DIR_ENTRY_SIZE..(i + 1) * DIR_ENTRY_SIZE]);
        }
        disk.write_at(block_offset(DIR_START_BLOCK), &dir_bytes)
            .map_err(|_| FsError::Io)?;

        let fat_bytes = [0xffu8; FAT_BLOCK_COUNT as usize * BLOCK_SIZE];
        disk.write_at(block_offset(FAT_START_BLOCK), &fat_bytes)
            .map_err(|_| FsError::Io)?;

        disk.flush().map_err(|_| FsError::Io)
    }

    /// Validates the superblock against every layout constant and loads
    /// the directory region and FAT. A mismatch hands the disk back as an
    /// error; the image is not touched.
    pub fn mount(mut disk: D) -> Result<Self, FsError> {
        let mut sb = [0u8; SUPERBLOCK_SIZE];
        disk.read_at(0, &mut sb).map_err(|_| FsError::Io)?;
        if sb != encode_superblock() {
            return Err(FsError::BadState);
        }

        let mut dir_bytes = vec![0u8; MAX_FILES * DIR_ENTRY_SIZE];
        disk.read_at(block_offset(DIR_START_BLOCK), &mut dir_bytes)
            .map_err(|_| FsError::Io)?;
        let dir = (0..MAX_FILES)
            .map(|i| DirEntry::decode(&dir_bytes[i * DIR_ENTRY_SIZE..(i + 1) * DIR_ENTRY_SIZE]))
            .collect();

        let mut fat_bytes = vec![0u8; DATA_BLOCK_COUNT as usize * 4];
        disk.read_at(block_offset(FAT_START_BLOCK), &mut fat_bytes)
            .map_err(|_| FsError::Io)?;
        let fat = fat_bytes
            .chunks_exact(4)
            .map(|c| u32::from_le_bytes(c.try_into().unwrap()))
            .collect();

        Ok(Otfs {
            disk,
            dir,
            fat,
            open_files: [OpenFile::closed(); MAX_OPEN_FILES],
        })
    }

    /// Flushes metadata and hands the image back.
    pub fn unmount(mut self) -> Result<D, FsError> {
        self.sync_metadata()?;
        self.disk.flush().map_err(|_| FsError::Io)?;
        Ok(self.disk)
    }

    fn sync_metadata(&mut self) -> Result<(), FsError> {
        let mut dir_bytes = vec![0u8; MAX_FILES * DIR_ENTRY_SIZE];
        for (i, entry) in self.dir.iter().enumerate() {
            entry.encode(&mut dir_bytes[i * DIR_ENTRY_SIZE..(i + 1) * DIR_ENTRY_SIZE]);
        }
        self.disk
            .write_at(block_offset(DIR_START_BLOCK), &dir_bytes)
            .map_err(|_| FsError::Io)?;

        // The tail of the FAT region past the last data block stays 0xff.
        let mut fat_bytes = vec![0xffu8; FAT_BLOCK_COUNT as usize * BLOCK_SIZE];
        for (i, entry) in self.fat.iter().enumerate() {
            fat_bytes[i * 4..(i + 1) * 4].copy_from_slice(&entry.to_le_bytes());
        }
        self.disk
            .write_at(block_offset(FAT_START_BLOCK), &fat_bytes)
            .map_err(|_| FsError::Io)?;
        self.disk.flush().map_err(|_| FsError::Io)
    }

    fn valid_block_index(index: u32) -> bool {
        index < DATA_BLOCK_COUNT
    }

    fn read_data_block(&mut self, index: u32, out: &mut [u8; BLOCK_SIZE]) -> Result<(), FsError> {
        if !Self::valid_block_index(index) {
            return Err(FsError::InvalidArgument);
        }
        self.disk
            .read_at(block_offset(DATA_START_BLOCK + index), out)
            .map_err(|_| FsError::Io)
    }

    fn write_data_block(&mut self, index: u32, data: &[u8; BLOCK_SIZE]) -> Result<(), FsError> {
        if !Self::valid_block_index(index) {
            return Err(FsError::InvalidArgument);
        }
        self.disk
            .write_at(block_offset(DATA_START_BLOCK + index), data)
            .map_err(|_| FsError::Io)?;
        self.disk.flush().map_err(|_| FsError::Io)
    }

    /// Claims the first free FAT slot and zeroes its block on disk, so
    /// sparse regions read back as zeros.
    fn allocate_data_block(&mut self) -> Result<u32, FsError> {
        for index in 0..DATA_BLOCK_COUNT {
            if self.fat[index as usize] == FAT_FREE {
                self.fat[index as usize] = FAT_END;
                let zeros = [0u8; BLOCK_SIZE];
                self.write_data_block(index, &zeros)?;
                return Ok(index);
            }
        }
        Err(FsError::NoSpace)
    }

    fn release_chain(&mut self, first_block: u32) -> Result<(), FsError> {
        let mut cur = first_block;
        let mut seen = 0u32;
        while cur != FAT_END {
            if !Self::valid_block_index(cur) || seen > DATA_BLOCK_COUNT {
                return Err(FsError::BadState);
            }
            seen += 1;
            let next = self.fat[cur as usize];
            self.fat[cur as usize] = FAT_FREE;
            cur = next;
        }
        Ok(())
    }

    /// Walks `logical_block` steps down the entry's chain. With `allocate`
    /// the chain is extended (and the file gains zeroed blocks) as needed;
    /// without it a short chain is NotFound.
    fn resolve_data_block(
        &mut self,
        dir_index: usize,
        logical_block: u32,
        allocate: bool,
    ) -> Result<u32, FsError> {
        if self.dir[dir_index].first_block == FAT_END {
            if !allocate {
                return Err(FsError::NotFound);
            }
            let first = self.allocate_data_block()?;
            self.dir[dir_index].first_block = first;
        }

        let mut cur = self.dir[dir_index].first_block;
        if !Self::valid_block_index(cur) {
            return Err(FsError::BadState);
        }

        for _ in 0..logical_block {
            let mut next = self.fat[cur as usize];
            if next == FAT_END {
                if !allocate {
                    return Err(FsError::NotFound);
                }
                next = self.allocate_data_block()?;
                self.fat[cur as usize] = next;
            }
            if !Self::valid_block_index(next) {
                return Err(FsError::BadState);
            }
            cur = next;
        }
        Ok(cur)
    }

    fn find_dir_entry(&self, name: &str) -> Option<usize> {
        self.dir
            .iter()
            .position(|e| e.used && e.name_matches(name))
    }

    fn alloc_dir_entry(&mut self, name: &str) -> Option<usize> {
        let index = self.dir.iter().position(|e| !e.used)?;
        let entry = &mut self.dir[index];
        *entry = DirEntry::empty();
        entry.used = true;
        entry.set_name(name);
        Some(index)
    }

    fn open_file(&self, fd: Fd) -> Result<&OpenFile, FsError> {
        let slot = self.open_files.get(fd.0).ok_or(FsError::InvalidArgument)?;
        if !slot.in_use {
            return Err(FsError::BadState);
        }
        Ok(slot)
    }

    pub fn open(&mut self, name: &str, flags: OpenFlags) -> Result<Fd, FsError> {
        if !flags.intersects(OpenFlags::READ | OpenFlags::WRITE) {
            return Err(FsError::InvalidArgument);
        }
        if flags.contains(OpenFlags::TRUNC) && !flags.contains(OpenFlags::WRITE) {
            return Err(FsError::InvalidArgument);
        }
        if name.is_empty() || name.len() > MAX_NAME_LEN {
            return Err(FsError::InvalidArgument);
        }

        let dir_index = match self.find_dir_entry(name) {
            Some(index) => index,
            None => {
                if !flags.contains(OpenFlags::CREATE) {
                    return Err(FsError::NotFound);
                }
                let index = self.alloc_dir_entry(name).ok_or(FsError::NoSpace)?;
                self.sync_metadata()?;
                index
            }
        };

        if flags.contains(OpenFlags::TRUNC) {
            let first = self.dir[dir_index].first_block;
            if first != FAT_END {
                self.release_chain(first)?;
            }
            self.dir[dir_index].first_block = FAT_END;
            self.dir[dir_index].size_bytes = 0;
            self.sync_metadata()?;
        }

        let fd = self
            .open_files
            .iter()
            .position(|f| !f.in_use)
            .ok_or(FsError::NoSpace)?;
        self.open_files[fd] = OpenFile {
            in_use: true,
            dir_index,
            offset: 0,
            flags,
        };
        Ok(Fd(fd))
    }

    pub fn close(&mut self, fd: Fd) -> Result<(), FsError> {
        self.open_file(fd)?;
        self.open_files[fd.0] = OpenFile::closed();
        Ok(())
    }

    /// Records the offset with no bounds check; writing past the end later
    /// creates a sparse region.
    pub fn seek(&mut self, fd: Fd, offset: u32) -> Result<(), FsError> {
        self.open_file(fd)?;
        self.open_files[fd.0].offset = offset;
        Ok(())
    }

    pub fn read(&mut self, fd: Fd, buf: &mut [u8]) -> Result<usize, FsError> {
        let file = *self.open_file(fd)?;
        if !file.flags.contains(OpenFlags::READ) {
            return Err(FsError::BadState);
        }

        let size = self.dir[file.dir_index].size_bytes;
        if file.offset >= size || buf.is_empty() {
            return Ok(0);
        }
        let len = buf.len().min((size - file.offset) as usize);

        let mut done = 0;
        let mut block_buf = [0u8; BLOCK_SIZE];
        while done < len {
            let offset = self.open_files[fd.0].offset;
            let logical_block = offset / BLOCK_SIZE as u32;
            let intra = (offset % BLOCK_SIZE as u32) as usize;
            let chunk = (BLOCK_SIZE - intra).min(len - done);

            let block = self
                .resolve_data_block(file.dir_index, logical_block, false)
                .map_err(|_| FsError::BadState)?;
            self.read_data_block(block, &mut block_buf)?;

            buf[done..done + chunk].copy_from_slice(&block_buf[intra..intra + chunk]);
            done += chunk;
            self.open_files[fd.0].offset += chunk as u32;
        }
        Ok(done)
    }

    /// Read-modify-write per block so bytes outside the window survive,
    /// including the zeros backing a sparse gap. Metadata is synced only
    /// once the whole buffer has landed; on a mid-loop error the recorded
    /// size is unchanged even though some chunks may already be on disk.
    pub fn write(&mut self, fd: Fd, buf: &[u8]) -> Result<usize, FsError> {
        let file = *self.open_file(fd)?;
        if !file.flags.contains(OpenFlags::WRITE) {
            return Err(FsError::BadState);
        }

        let mut done = 0;
        let mut block_buf = [0u8; BLOCK_SIZE];
        while done < buf.len() {
            let offset = self.open_files[fd.0].offset;
            let logical_block = offset / BLOCK_SIZE as u32;
            let intra = (offset % BLOCK_SIZE as u32) as usize;
            let chunk = (BLOCK_SIZE - intra).min(buf.len() - done);

            let block = self
                .resolve_data_block(file.dir_index, logical_block, true)
                .map_err(|_| FsError::NoSpace)?;
            self.read_data_block(block, &mut block_buf)?;
            block_buf[intra..intra + chunk].copy_from_slice(&buf[done..done + chunk]);
            self.write_data_block(block, &block_buf)?;

            done += chunk;
            self.open_files[fd.0].offset += chunk as u32;
        }

        let end = self.open_files[fd.0].offset;
        if end > self.dir[file.dir_index].size_bytes {
            self.dir[file.dir_index].size_bytes = end;
        }
        self.sync_metadata()?;
        Ok(done)
    }

    /// Size of a named file, if it exists.
    pub fn stat(&self, name: &str) -> Option<u32> {
        self.find_dir_entry(name)
            .map(|index| self.dir[index].size_bytes)
    }

    /// Names of every file on the image.
    pub fn list(&self) -> Vec<String> {
        self.dir
            .iter()
            .filter(|e| e.used)
            .map(|e| {
                let len = e.name.iter().position(|&b| b == 0).unwrap_or(e.name.len());
                String::from_utf8_lossy(&e.name[..len]).into_owned()
            })
            .collect()
    }
}
