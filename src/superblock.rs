//! The superblock: block 0 of the image, read once at mount and never rewritten.

use crate::block_device::{BlockDevice, BLOCK_SIZE};
use crate::error::{Error, Result};

/// The on-disk signature, the ASCII bytes of `"ECS150FS"`.
///
/// `spec.md` §3 gives this as the hex literal `0x5346303532303441`, but that
/// literal does not actually decode to `"ECS150FS"`; `original_source/libfs/fs.c`
/// compares against the decimal constant `6000536558536704837`, which does. Storing
/// the signature as a raw byte array sidesteps both the transcription error and any
/// question of host endianness. See DESIGN.md.
const SIGNATURE: [u8; 8] = *b"ECS150FS";

/// The number of 16-bit FAT entries that fit in one block.
pub const FAT_ENTRIES_PER_BLOCK: usize = BLOCK_SIZE / 2;

/// The fixed number of slots in the root directory.
pub const ROOT_DIR_ENTRIES: usize = 128;

/// The fixed number of file descriptor slots.
pub const MAX_OPEN_FILES: usize = 32;

/// The maximum length of a filename, not counting the terminating NUL.
pub const MAX_FILENAME_LEN: usize = 15;

/// The read-only, validated layout of a mounted image.
#[derive(Debug, Clone, Copy)]
pub struct Superblock {
    /// Total number of blocks on the disk, including metadata blocks.
    pub total_blocks: u16,
    /// Index of the root directory block.
    pub root_dir_block: u16,
    /// Index of the first data block.
    pub first_data_block: u16,
    /// Number of data blocks.
    pub data_block_count: u16,
    /// Number of blocks occupied by the FAT.
    pub fat_block_count: u8,
}

impl Superblock {
    /// Decodes a superblock from a raw block buffer, without consulting the
    /// underlying device. Used by [`Self::load`] and by tests.
    fn decode(buf: &[u8; BLOCK_SIZE]) -> Result<Self> {
        if buf[0..8] != SIGNATURE {
            return Err(Error::BadImage("signature mismatch"));
        }
        let total_blocks = u16::from_le_bytes([buf[8], buf[9]]);
        let root_dir_block = u16::from_le_bytes([buf[10], buf[11]]);
        let first_data_block = u16::from_le_bytes([buf[12], buf[13]]);
        let data_block_count = u16::from_le_bytes([buf[14], buf[15]]);
        let fat_block_count = buf[16];

        let sb = Self {
            total_blocks,
            root_dir_block,
            first_data_block,
            data_block_count,
            fat_block_count,
        };
        sb.check_internal_consistency()?;
        Ok(sb)
    }

    /// Checks the layout invariants from `spec.md` §3 that don't require the
    /// underlying device (total block count vs. device size is checked
    /// separately in [`Self::load`]).
    fn check_internal_consistency(&self) -> Result<()> {
        let expected_root = 1 + self.fat_block_count as u32;
        if self.root_dir_block as u32 != expected_root {
            return Err(Error::BadImage("root directory index inconsistent with FAT block count"));
        }
        if self.first_data_block as u32 != expected_root + 1 {
            return Err(Error::BadImage("first data block index inconsistent with root directory index"));
        }
        let expected_total = 1 + self.fat_block_count as u32 + 1 + self.data_block_count as u32;
        if self.total_blocks as u32 != expected_total {
            return Err(Error::BadImage("total block count inconsistent with layout"));
        }
        Ok(())
    }

    /// Encodes the superblock into a fresh, zero-padded block buffer.
    pub fn encode(&self) -> [u8; BLOCK_SIZE] {
        let mut buf = [0u8; BLOCK_SIZE];
        buf[0..8].copy_from_slice(&SIGNATURE);
        buf[8..10].copy_from_slice(&self.total_blocks.to_le_bytes());
        buf[10..12].copy_from_slice(&self.root_dir_block.to_le_bytes());
        buf[12..14].copy_from_slice(&self.first_data_block.to_le_bytes());
        buf[14..16].copy_from_slice(&self.data_block_count.to_le_bytes());
        buf[16] = self.fat_block_count;
        buf
    }

    /// Reads block 0 from `dev`, decodes it and validates it against the device's
    /// own block count.
    pub fn load(dev: &mut dyn BlockDevice) -> Result<Self> {
        let mut buf = [0u8; BLOCK_SIZE];
        dev.block_read(0, &mut buf)?;
        let sb = Self::decode(&buf)?;
        if dev.block_count() != sb.total_blocks as usize {
            return Err(Error::BadImage("total block count does not match device"));
        }
        Ok(sb)
    }
}
