//! The literal POSIX-flavored, process-wide API: a single filesystem session
//! guarded by a mutex, with every operation returning the conventional
//! `0`/`-1`, file descriptor, or byte-count codes instead of a [`crate::Error`].
//!
//! This mirrors the single-process, single-mount shape of the system this
//! crate's API table is modeled on (`spec.md` §6, §9 Design Note): callers that
//! want the richer [`crate::Error`] variants should use [`crate::FileSystem`]
//! directly instead.

use crate::block_device::FileBlockDevice;
use crate::{FileSystem, Result};
use std::path::Path;
use std::sync::Mutex;

static MOUNTED: Mutex<Option<FileSystem>> = Mutex::new(None);

/// Mounts the disk image at `path`. Returns `0` on success, `-1` if a
/// filesystem is already mounted or the image fails to mount.
pub fn mount(path: &Path) -> i32 {
    let mut guard = MOUNTED.lock().unwrap();
    if guard.is_some() {
        return -1;
    }
    match FileBlockDevice::open(path).and_then(|dev| FileSystem::mount(Box::new(dev))) {
        Ok(fs) => {
            *guard = Some(fs);
            0
        }
        Err(_) => -1,
    }
}

/// Unmounts the current session, flushing the FAT and root directory. Returns
/// `0` on success, `-1` if nothing is mounted.
pub fn umount() -> i32 {
    let mut guard = MOUNTED.lock().unwrap();
    match guard.take() {
        Some(fs) => match fs.umount() {
            Ok(_) => 0,
            Err(_) => -1,
        },
        None => -1,
    }
}

fn with_mounted<T>(f: impl FnOnce(&mut FileSystem) -> Result<T>) -> Option<T> {
    let mut guard = MOUNTED.lock().unwrap();
    let fs = guard.as_mut()?;
    f(fs).ok()
}

/// Disk usage summary: `(total_blocks, fat_blocks, data_blocks,
/// free_data_blocks, free_root_dir_entries)`, or `None` if nothing is mounted.
pub fn info() -> Option<(u16, u8, u16, usize, usize)> {
    with_mounted(|fs| {
        let i = fs.info();
        Ok((i.total_blocks, i.fat_blocks, i.data_blocks, i.free_data_blocks, i.free_root_dir_entries))
    })
}

/// Lists every file in the root directory as `(name, size)` pairs, or `None`
/// if nothing is mounted.
pub fn ls() -> Option<Vec<(String, u32)>> {
    with_mounted(|fs| fs.ls())
}

/// Creates an empty file named `name`. Returns `0` on success, `-1` otherwise.
pub fn create(name: &str) -> i32 {
    with_mounted(|fs| fs.create(name)).map_or(-1, |()| 0)
}

/// Deletes `name`. Returns `0` on success, `-1` otherwise.
pub fn delete(name: &str) -> i32 {
    with_mounted(|fs| fs.delete(name)).map_or(-1, |()| 0)
}

/// Opens `name`. Returns the new file descriptor, or `-1` on failure.
pub fn open(name: &str) -> i32 {
    with_mounted(|fs| fs.open(name)).map_or(-1, |fd| fd as i32)
}

/// Closes `fd`. Returns `0` on success, `-1` otherwise.
pub fn close(fd: i32) -> i32 {
    if fd < 0 {
        return -1;
    }
    with_mounted(|fs| fs.close(fd as usize)).map_or(-1, |()| 0)
}

/// Returns the size in bytes of the file open on `fd`, or `-1` on failure.
pub fn stat(fd: i32) -> i32 {
    if fd < 0 {
        return -1;
    }
    with_mounted(|fs| fs.stat(fd as usize)).map_or(-1, |st| st.size as i32)
}

/// Repositions `fd`'s offset to `offset`. Returns `0` on success, `-1`
/// otherwise.
pub fn lseek(fd: i32, offset: usize) -> i32 {
    if fd < 0 {
        return -1;
    }
    with_mounted(|fs| fs.lseek(fd as usize, offset)).map_or(-1, |()| 0)
}

/// Reads up to `buf.len()` bytes from `fd` into `buf`. Returns the number of
/// bytes read, or `-1` on failure.
pub fn read(fd: i32, buf: &mut [u8]) -> i32 {
    if fd < 0 {
        return -1;
    }
    with_mounted(|fs| fs.read(fd as usize, buf)).map_or(-1, |n| n as i32)
}

/// Writes `buf` to `fd`. Returns the number of bytes written, or `-1` on
/// failure.
pub fn write(fd: i32, buf: &[u8]) -> i32 {
    if fd < 0 {
        return -1;
    }
    with_mounted(|fs| fs.write(fd as usize, buf)).map_or(-1, |n| n as i32)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::superblock::{Superblock, FAT_ENTRIES_PER_BLOCK};
    use std::io::Write as _;

    #[test]
    fn mount_without_image_fails_cleanly() {
        assert_eq!(mount(Path::new("/nonexistent/path/to/image")), -1);
        assert!(ls().is_none());
    }

    #[test]
    fn full_session_round_trip() {
        let image = ScratchImage::formatted(8);
        assert_eq!(mount(&image.path), 0);

        assert_eq!(create("greeting.txt"), 0);
        let fd = open("greeting.txt");
        assert!(fd >= 0);
        assert_eq!(write(fd, b"hi"), 2);
        assert_eq!(lseek(fd, 0), 0);
        let mut buf = [0u8; 2];
        assert_eq!(read(fd, &mut buf), 2);
        assert_eq!(&buf, b"hi");
        assert_eq!(close(fd), 0);
        assert_eq!(delete("greeting.txt"), 0);
        assert_eq!(umount(), 0);
        assert_eq!(umount(), -1);
    }

    /// A freshly formatted disk image written to a unique path under the
    /// system temp directory, so `mount` has a real file to open — `posix`
    /// always goes through [`FileBlockDevice`], never [`crate::block_device`]'s
    /// in-memory test double.
    struct ScratchImage {
        path: std::path::PathBuf,
    }

    impl ScratchImage {
        fn formatted(data_blocks: u16) -> Self {
            let fat_entries_needed = data_blocks as usize + 1;
            let fat_block_count = fat_entries_needed.div_ceil(FAT_ENTRIES_PER_BLOCK).max(1) as u8;
            let root_dir_block = 1 + fat_block_count as u16;
            let first_data_block = root_dir_block + 1;
            let total_blocks = first_data_block + data_blocks;

            let sb = Superblock {
                total_blocks,
                root_dir_block,
                first_data_block,
                data_block_count: data_blocks,
                fat_block_count,
            };

            let mut bytes = vec![0u8; total_blocks as usize * crate::BLOCK_SIZE];
            bytes[0..crate::BLOCK_SIZE].copy_from_slice(&sb.encode());

            let mut fat0 = vec![0u8; crate::BLOCK_SIZE];
            fat0[0..2].copy_from_slice(&crate::fat::EOC.to_le_bytes());
            bytes[crate::BLOCK_SIZE..2 * crate::BLOCK_SIZE].copy_from_slice(&fat0);

            let path = std::env::temp_dir().join(format!("simplefs-posix-test-{}-{:?}.img", std::process::id(), std::thread::current().id()));
            let mut file = std::fs::File::create(&path).unwrap();
            file.write_all(&bytes).unwrap();
            Self { path }
        }
    }

    impl Drop for ScratchImage {
        fn drop(&mut self) {
            let _ = std::fs::remove_file(&self.path);
        }
    }
}
