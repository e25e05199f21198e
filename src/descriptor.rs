//! The file descriptor table: 32 slots mapping an open handle to a directory
//! entry and a current read/write offset.

use crate::error::{Error, Result};
use crate::superblock::MAX_OPEN_FILES;

/// One open file: which directory entry it refers to, and where the next
/// `read`/`write` will start.
#[derive(Debug, Clone, Copy)]
struct Descriptor {
    entry_index: usize,
    offset: usize,
}

/// The fixed-size, process-wide table of open files.
///
/// A directory entry may be open through more than one descriptor at once;
/// `spec.md` places no restriction on this, it only uses "is this entry open at
/// all" to decide whether `delete` must fail with [`Error::Busy`].
#[derive(Default)]
pub struct FdTable {
    slots: [Option<Descriptor>; MAX_OPEN_FILES],
}

impl FdTable {
    pub fn new() -> Self {
        Self {
            slots: [None; MAX_OPEN_FILES],
        }
    }

    /// Allocates the lowest-numbered free slot for `entry_index`, at offset 0.
    pub fn open(&mut self, entry_index: usize) -> Result<usize> {
        let fd = self.slots.iter().position(Option::is_none).ok_or(Error::Full)?;
        self.slots[fd] = Some(Descriptor {
            entry_index,
            offset: 0,
        });
        Ok(fd)
    }

    /// Frees `fd`. Fails with [`Error::BadArg`] if `fd` is out of range or not
    /// currently open.
    pub fn close(&mut self, fd: usize) -> Result<()> {
        let slot = self.slots.get_mut(fd).ok_or(Error::BadArg("fd out of range"))?;
        if slot.is_none() {
            return Err(Error::BadArg("fd is not open"));
        }
        *slot = None;
        Ok(())
    }

    fn get(&self, fd: usize) -> Result<&Descriptor> {
        self.slots
            .get(fd)
            .and_then(Option::as_ref)
            .ok_or(Error::BadArg("fd is not open"))
    }

    fn get_mut(&mut self, fd: usize) -> Result<&mut Descriptor> {
        self.slots
            .get_mut(fd)
            .and_then(Option::as_mut)
            .ok_or(Error::BadArg("fd is not open"))
    }

    pub fn entry_index(&self, fd: usize) -> Result<usize> {
        Ok(self.get(fd)?.entry_index)
    }

    pub fn offset(&self, fd: usize) -> Result<usize> {
        Ok(self.get(fd)?.offset)
    }

    pub fn set_offset(&mut self, fd: usize, offset: usize) -> Result<()> {
        self.get_mut(fd)?.offset = offset;
        Ok(())
    }

    /// Whether any open descriptor currently refers to `entry_index`. Used by
    /// `delete` to enforce [`Error::Busy`].
    pub fn is_busy(&self, entry_index: usize) -> bool {
        self.slots
            .iter()
            .flatten()
            .any(|d| d.entry_index == entry_index)
    }
}
