//! Byte-accurate, partial-block `read`/`write` built on top of block-sized
//! device I/O and FAT chain walks.

use crate::block_device::BLOCK_SIZE;
use crate::error::{Error, Result};
use crate::fat::EOC;
use crate::FileSystem;

impl FileSystem {
    /// Walks `first_block`'s chain `steps` blocks forward, returning the block
    /// index reached. `steps == 0` returns `first_block` itself.
    fn walk(&self, first_block: u16, steps: usize) -> u16 {
        let mut block = first_block;
        for _ in 0..steps {
            block = self.fat.next(block as usize);
        }
        block
    }

    fn data_block_offset(&self, block: u16) -> usize {
        self.superblock.first_data_block as usize + block as usize
    }

    /// Allocates a fresh data block and immediately zero-writes it to the
    /// device, so a reused block never leaks a previous file's bytes through a
    /// later partial overwrite (`spec.md` §9 Open Question).
    fn alloc_zeroed_block(&mut self) -> Result<u16> {
        let new_block = self.fat.allocate()? as u16;
        self.device.block_write(self.data_block_offset(new_block), &[0u8; BLOCK_SIZE])?;
        Ok(new_block)
    }

    /// Reads up to `buf.len()` bytes starting at `fd`'s current offset, not
    /// reading past the file's size, and advances the offset by the number of
    /// bytes actually read.
    pub fn read(&mut self, fd: usize, buf: &mut [u8]) -> Result<usize> {
        let index = self.fds.entry_index(fd)?;
        let offset = self.fds.offset(fd)?;
        let size = self.root.size(index) as usize;
        let first_block = self.root.first_block(index);

        if offset >= size || buf.is_empty() {
            return Ok(0);
        }
        let to_read = buf.len().min(size - offset);

        let mut done = 0;
        let mut block = self.walk(first_block, offset / BLOCK_SIZE);
        let mut in_block_offset = offset % BLOCK_SIZE;

        while done < to_read {
            if block == EOC {
                return Err(Error::Corrupt("file chain ended before its recorded size"));
            }
            let mut block_buf = [0u8; BLOCK_SIZE];
            self.device.block_read(self.data_block_offset(block), &mut block_buf)?;

            let span = (BLOCK_SIZE - in_block_offset).min(to_read - done);
            buf[done..done + span].copy_from_slice(&block_buf[in_block_offset..in_block_offset + span]);

            done += span;
            in_block_offset = 0;
            if done < to_read {
                block = self.fat.next(block as usize);
            }
        }

        self.fds.set_offset(fd, offset + done)?;
        Ok(done)
    }

    /// Writes `buf` starting at `fd`'s current offset, allocating and chaining
    /// new data blocks as needed, growing the file's recorded size, and
    /// advancing the offset. Newly allocated blocks are zero-filled before any
    /// partial overwrite, so the unwritten tail of the final block never
    /// exposes stale data (`spec.md` §9 Open Question).
    ///
    /// A disk with no free blocks left is not a failure: the write truncates
    /// at whatever fit and returns that byte count, same as the original
    /// `fs_write` returning `count_written` once `find_empty_FAT` comes up
    /// empty (`spec.md` §4.5, §7, scenario S3).
    pub fn write(&mut self, fd: usize, buf: &[u8]) -> Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        let index = self.fds.entry_index(fd)?;
        let start_offset = self.fds.offset(fd)?;
        let size = self.root.size(index) as usize;
        let mut first_block = self.root.first_block(index);

        if first_block == EOC {
            first_block = match self.alloc_zeroed_block() {
                Ok(b) => b,
                Err(Error::Full) => return Ok(0),
                Err(e) => return Err(e),
            };
            self.fat.set(first_block as usize, EOC);
            self.root.set_first_block(index, first_block);
        }

        // Walk to the block containing `start_offset`, bridging any gap (from a
        // prior `lseek` past the old end of file) with freshly zeroed blocks. A
        // `Full` hit while bridging means nothing can be written this call.
        let mut block = first_block;
        let mut block_start = 0usize;
        while block_start + BLOCK_SIZE <= start_offset {
            let next = self.fat.next(block as usize);
            block = if next == EOC {
                match self.alloc_zeroed_block() {
                    Ok(new_block) => {
                        self.fat.set(block as usize, new_block);
                        self.fat.set(new_block as usize, EOC);
                        new_block
                    }
                    Err(Error::Full) => {
                        self.fat.flush(self.device.as_mut())?;
                        self.root.flush(self.device.as_mut())?;
                        return Ok(0);
                    }
                    Err(e) => return Err(e),
                }
            } else {
                next
            };
            block_start += BLOCK_SIZE;
        }

        let mut done = 0usize;
        let mut in_block_offset = start_offset - block_start;

        loop {
            let span = (BLOCK_SIZE - in_block_offset).min(buf.len() - done);
            let whole_block = in_block_offset == 0 && span == BLOCK_SIZE;

            let mut block_buf = [0u8; BLOCK_SIZE];
            if !whole_block {
                self.device.block_read(self.data_block_offset(block), &mut block_buf)?;
            }
            block_buf[in_block_offset..in_block_offset + span].copy_from_slice(&buf[done..done + span]);
            self.device.block_write(self.data_block_offset(block), &block_buf)?;

            done += span;
            in_block_offset = 0;

            if done >= buf.len() {
                break;
            }

            let next = self.fat.next(block as usize);
            block = if next == EOC {
                match self.alloc_zeroed_block() {
                    Ok(new_block) => {
                        self.fat.set(block as usize, new_block);
                        self.fat.set(new_block as usize, EOC);
                        new_block
                    }
                    // The disk filled up mid-write: stop and report the bytes
                    // written so far instead of failing the whole call.
                    Err(Error::Full) => break,
                    Err(e) => return Err(e),
                }
            } else {
                next
            };
        }

        if start_offset + done > size {
            self.root.set_size(index, (start_offset + done) as u32);
        }
        self.fds.set_offset(fd, start_offset + done)?;

        self.fat.flush(self.device.as_mut())?;
        self.root.flush(self.device.as_mut())?;

        Ok(done)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::test::format as format_image;
    use crate::FileSystem;

    #[test]
    fn write_then_read_small_file() {
        let dev = format_image(4);
        let mut fs = FileSystem::mount(Box::new(dev)).unwrap();
        fs.create("f").unwrap();
        let fd = fs.open("f").unwrap();

        let written = fs.write(fd, b"hello world").unwrap();
        assert_eq!(written, 11);

        fs.lseek(fd, 0).unwrap();
        let mut buf = [0u8; 32];
        let read = fs.read(fd, &mut buf).unwrap();
        assert_eq!(read, 11);
        assert_eq!(&buf[..11], b"hello world");
    }

    #[test]
    fn write_spanning_multiple_blocks() {
        let dev = format_image(4);
        let mut fs = FileSystem::mount(Box::new(dev)).unwrap();
        fs.create("f").unwrap();
        let fd = fs.open("f").unwrap();

        let payload = vec![0xABu8; BLOCK_SIZE * 2 + 37];
        let written = fs.write(fd, &payload).unwrap();
        assert_eq!(written, payload.len());

        fs.lseek(fd, 0).unwrap();
        let mut readback = vec![0u8; payload.len()];
        let read = fs.read(fd, &mut readback).unwrap();
        assert_eq!(read, payload.len());
        assert_eq!(readback, payload);
    }

    #[test]
    fn read_past_end_returns_zero() {
        let dev = format_image(4);
        let mut fs = FileSystem::mount(Box::new(dev)).unwrap();
        fs.create("f").unwrap();
        let fd = fs.open("f").unwrap();
        fs.write(fd, b"abc").unwrap();
        fs.lseek(fd, 3).unwrap();
        let mut buf = [0u8; 8];
        assert_eq!(fs.read(fd, &mut buf).unwrap(), 0);
    }

    #[test]
    fn write_truncates_when_disk_exhausted() {
        let dev = format_image(1);
        let mut fs = FileSystem::mount(Box::new(dev)).unwrap();
        fs.create("f").unwrap();
        let fd = fs.open("f").unwrap();
        let payload = vec![1u8; BLOCK_SIZE * 3];
        let written = fs.write(fd, &payload).unwrap();
        assert_eq!(written, BLOCK_SIZE);

        let further = fs.write(fd, &[0u8; 1]).unwrap();
        assert_eq!(further, 0);
    }

    #[test]
    fn overwrite_within_existing_block_preserves_neighbors() {
        let dev = format_image(4);
        let mut fs = FileSystem::mount(Box::new(dev)).unwrap();
        fs.create("f").unwrap();
        let fd = fs.open("f").unwrap();
        fs.write(fd, b"0123456789").unwrap();
        fs.lseek(fd, 2).unwrap();
        fs.write(fd, b"XY").unwrap();

        fs.lseek(fd, 0).unwrap();
        let mut buf = [0u8; 10];
        fs.read(fd, &mut buf).unwrap();
        assert_eq!(&buf, b"01XY456789");
    }

    #[test]
    fn persists_across_umount_and_remount() {
        let dev = format_image(4);
        let mut fs = FileSystem::mount(Box::new(dev)).unwrap();
        fs.create("f").unwrap();
        let fd = fs.open("f").unwrap();
        fs.write(fd, b"durable").unwrap();
        fs.close(fd).unwrap();
        let device = fs.umount().unwrap();

        let mut fs = FileSystem::mount(device).unwrap();
        let fd = fs.open("f").unwrap();
        let mut buf = [0u8; 7];
        fs.read(fd, &mut buf).unwrap();
        assert_eq!(&buf, b"durable");
    }
}
