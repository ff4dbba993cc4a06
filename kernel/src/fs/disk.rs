//! Byte-addressed image backend for the block filesystem.
//!
//! OTFS itself never touches storage directly; it goes through this trait,
//! so the kernel can run the filesystem over a RAM image while hosted
//! tests run it over a real file and exercise remount durability.

use alloc::vec;
use alloc::vec::Vec;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DiskError;

pub trait Disk {
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> Result<(), DiskError>;
    fn write_at(&mut self, offset: u64, buf: &[u8]) -> Result<(), DiskError>;
    fn flush(&mut self) -> Result<(), DiskError>;
}

/// Fixed-size in-memory image.
pub struct MemDisk {
    bytes: Vec<u8>,
}

impl MemDisk {
    pub fn new(len: usize) -> Self {
        MemDisk {
            bytes: vec![0; len],
        }
    }

    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        MemDisk { bytes }
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    fn range(&self, offset: u64, len: usize) -> Result<core::ops::Range<usize>, DiskError> {
        let start = usize::try_from(offset).map_err(|_| DiskError)?;
        let end = start.checked_add(len).ok_or(DiskError)?;
        if end > self.bytes.len() {
            return Err(DiskError);
        }
        Ok(start..end)
    }
}

impl Disk for MemDisk {
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> Result<(), DiskError> {
        let range = self.range(offset, buf.len())?;
        buf.copy_from_slice(&self.bytes[range]);
        Ok(())
    }

    fn write_at(&mut self, offset: u64, buf: &[u8]) -> Result<(), DiskError> {
        let range = self.range(offset, buf.len())?;
        self.bytes[range].copy_from_slice(buf);
        Ok(())
    }

    fn flush(&mut self) -> Result<(), DiskError> {
        Ok(())
    }
}
