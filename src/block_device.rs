//! The block device abstraction this crate builds a filesystem on top of.
//!
//! `spec.md` treats block I/O as an external collaborator; [`BlockDevice`] is the
//! trait describing it, and [`FileBlockDevice`] is the one concrete implementation
//! this crate ships, backed by a regular file or a real block device.

use crate::error::{Error, Result};
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::os::fd::AsRawFd;
use std::os::unix::fs::FileTypeExt;
use std::path::Path;

/// The fixed size of a block, in bytes.
pub const BLOCK_SIZE: usize = 4096;

/// Fixed-size block I/O against a named backing store.
///
/// Implementations are assumed to perform each read/write atomically (`spec.md`
/// §5) and are not required to be `Send`/`Sync`: the library's session model is
/// single-threaded.
pub trait BlockDevice {
    /// Returns the number of fixed-size blocks in the device.
    fn block_count(&self) -> usize;

    /// Reads block `index` into `buf`.
    fn block_read(&mut self, index: usize, buf: &mut [u8; BLOCK_SIZE]) -> Result<()>;

    /// Writes `buf` to block `index`.
    fn block_write(&mut self, index: usize, buf: &[u8; BLOCK_SIZE]) -> Result<()>;
}

/// ioctl macro: command.
macro_rules! ioc {
    ($a:expr, $b:expr, $c:expr, $d:expr) => {
        (($a) << 30) | (($b) << 8) | ($c) | (($d) << 16)
    };
}

/// ioctl macro: read command.
macro_rules! ior {
    ($a:expr, $b:expr, $c:ty) => {
        ioc!(2, $a, $b, std::mem::size_of::<$c>() as std::ffi::c_long)
    };
}

/// ioctl command: get size of disk in bytes.
const BLKGETSIZE64: std::ffi::c_long = ior!(0x12, 114, u64);

/// A [`BlockDevice`] backed by a path: either a regular disk image file or a real
/// block/char device.
pub struct FileBlockDevice {
    file: File,
    block_count: usize,
}

impl FileBlockDevice {
    /// Opens the backing store at `path` and determines its block count.
    ///
    /// For a regular file, the count is `file size / BLOCK_SIZE` (truncated). For a
    /// real block or character device, the byte size is queried directly with
    /// `ioctl(BLKGETSIZE64)`.
    pub fn open(path: &Path) -> Result<Self> {
        let file = OpenOptions::new().read(true).write(true).open(path)?;
        let metadata = file.metadata()?;
        let file_type = metadata.file_type();

        let byte_len = if file_type.is_block_device() || file_type.is_char_device() {
            let mut byte_len: u64 = 0;
            let ret = unsafe { libc::ioctl(file.as_raw_fd(), BLKGETSIZE64 as _, &mut byte_len) };
            if ret < 0 {
                return Err(Error::Io(std::io::Error::last_os_error()));
            }
            byte_len
        } else {
            metadata.len()
        };

        Ok(Self {
            file,
            block_count: (byte_len / BLOCK_SIZE as u64) as usize,
        })
    }
}

impl BlockDevice for FileBlockDevice {
    fn block_count(&self) -> usize {
        self.block_count
    }

    fn block_read(&mut self, index: usize, buf: &mut [u8; BLOCK_SIZE]) -> Result<()> {
        self.file.seek(SeekFrom::Start((index * BLOCK_SIZE) as u64))?;
        self.file.read_exact(buf)?;
        Ok(())
    }

    fn block_write(&mut self, index: usize, buf: &[u8; BLOCK_SIZE]) -> Result<()> {
        self.file.seek(SeekFrom::Start((index * BLOCK_SIZE) as u64))?;
        self.file.write_all(buf)?;
        Ok(())
    }
}

/// An in-memory [`BlockDevice`], used by this crate's own tests so they don't need
/// a real disk image file on disk.
#[cfg(test)]
pub(crate) struct MemoryBlockDevice {
    blocks: Vec<[u8; BLOCK_SIZE]>,
}

#[cfg(test)]
impl MemoryBlockDevice {
    pub(crate) fn new(block_count: usize) -> Self {
        Self {
            blocks: vec![[0u8; BLOCK_SIZE]; block_count],
        }
    }
}

#[cfg(test)]
impl BlockDevice for MemoryBlockDevice {
    fn block_count(&self) -> usize {
        self.blocks.len()
    }

    fn block_read(&mut self, index: usize, buf: &mut [u8; BLOCK_SIZE]) -> Result<()> {
        buf.copy_from_slice(&self.blocks[index]);
        Ok(())
    }

    fn block_write(&mut self, index: usize, buf: &[u8; BLOCK_SIZE]) -> Result<()> {
        self.blocks[index].copy_from_slice(buf);
        Ok(())
    }
}
