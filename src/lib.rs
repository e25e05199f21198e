//! A small user-space FAT-style filesystem, implemented entirely on top of a
//! [`BlockDevice`] — a 4096-byte-block superblock, a chained allocation table, a
//! single-level 128-entry root directory, and a 32-slot file descriptor table.
//!
//! [`FileSystem`] is the primary, `Result`-returning API. [`posix`] wraps a
//! single process-wide [`FileSystem`] behind the literal free-function,
//! return-code-based API that tools built against this crate's origin expect.

mod block_device;
mod descriptor;
mod directory;
mod error;
mod fat;
mod io_engine;
pub mod posix;
mod superblock;

pub use block_device::{BlockDevice, FileBlockDevice, BLOCK_SIZE};
pub use directory::FileStat;
pub use error::{Error, Result};

use descriptor::FdTable;
use directory::RootDirectory;
use fat::Fat;
use superblock::Superblock;

/// Disk usage summary returned by [`FileSystem::info`].
#[derive(Debug, Clone, Copy)]
pub struct Info {
    pub total_blocks: u16,
    pub fat_blocks: u8,
    pub data_blocks: u16,
    pub free_data_blocks: usize,
    pub root_dir_entries: usize,
    pub free_root_dir_entries: usize,
}

/// A mounted filesystem session.
///
/// Every structure this crate manages — the FAT, the root directory, the
/// descriptor table — is held in memory for the lifetime of the mount and only
/// written back to `device` where `spec.md` §4 calls for it: the FAT and root
/// directory are rewritten whenever they change, and the superblock is never
/// rewritten once mounted.
pub struct FileSystem {
    device: Box<dyn BlockDevice>,
    superblock: Superblock,
    fat: Fat,
    root: RootDirectory,
    fds: FdTable,
}

impl FileSystem {
    /// Mounts `device`: reads and validates the superblock, then loads the FAT
    /// and root directory into memory.
    pub fn mount(mut device: Box<dyn BlockDevice>) -> Result<Self> {
        let superblock = Superblock::load(device.as_mut())?;
        let fat = Fat::load(device.as_mut(), &superblock)?;
        let root = RootDirectory::load(device.as_mut(), superblock.root_dir_block)?;
        Ok(Self {
            device,
            superblock,
            fat,
            root,
            fds: FdTable::new(),
        })
    }

    /// Flushes the FAT and root directory back to the device, consuming the
    /// session and handing the device back to the caller. `spec.md` §4.1 leaves
    /// open file descriptors open across `umount` undefined; this crate allows
    /// it, simply discarding the table.
    pub fn umount(mut self) -> Result<Box<dyn BlockDevice>> {
        self.fat.flush(self.device.as_mut())?;
        self.root.flush(self.device.as_mut())?;
        Ok(self.device)
    }

    /// Reports layout and free-space information about the mounted image.
    pub fn info(&self) -> Info {
        Info {
            total_blocks: self.superblock.total_blocks,
            fat_blocks: self.superblock.fat_block_count,
            data_blocks: self.superblock.data_block_count,
            free_data_blocks: self.fat.free_count(),
            root_dir_entries: superblock::ROOT_DIR_ENTRIES,
            free_root_dir_entries: superblock::ROOT_DIR_ENTRIES - self.root.list().map(|l| l.len()).unwrap_or(0),
        }
    }

    /// Lists every file currently in the root directory, as (name, size) pairs.
    pub fn ls(&self) -> Result<Vec<(String, u32)>> {
        self.root.list()
    }

    /// Creates a new, zero-length file named `name`.
    pub fn create(&mut self, name: &str) -> Result<()> {
        self.root.create(name)?;
        self.root.flush(self.device.as_mut())?;
        Ok(())
    }

    /// Deletes `name`, freeing its data chain. Fails with [`Error::Busy`] if any
    /// descriptor currently has it open.
    pub fn delete(&mut self, name: &str) -> Result<()> {
        let index = self.root.find(name)?.ok_or(Error::NotFound)?;
        if self.fds.is_busy(index) {
            return Err(Error::Busy);
        }
        self.root.delete(index, &mut self.fat)?;
        self.fat.flush(self.device.as_mut())?;
        self.root.flush(self.device.as_mut())?;
        Ok(())
    }

    /// Opens `name`, returning a file descriptor positioned at offset 0.
    pub fn open(&mut self, name: &str) -> Result<usize> {
        let index = self.root.find(name)?.ok_or(Error::NotFound)?;
        self.fds.open(index)
    }

    /// Closes `fd`.
    pub fn close(&mut self, fd: usize) -> Result<()> {
        self.fds.close(fd)
    }

    /// Returns the size and first data block of the file open on `fd`.
    pub fn stat(&self, fd: usize) -> Result<FileStat> {
        let index = self.fds.entry_index(fd)?;
        Ok(self.root.stat(index))
    }

    /// Repositions `fd`'s offset. `spec.md` §4.4/§6 require `0 <= offset <=
    /// size`; seeking past the current end of file fails with
    /// [`Error::BadArg`], matching the original `fs_lseek`'s rejection of an
    /// offset beyond the file's size.
    pub fn lseek(&mut self, fd: usize, offset: usize) -> Result<()> {
        let index = self.fds.entry_index(fd)?;
        if offset > self.root.size(index) as usize {
            return Err(Error::BadArg("offset is past the end of the file"));
        }
        self.fds.set_offset(fd, offset)
    }
}
