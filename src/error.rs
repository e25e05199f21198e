//! Error taxonomy shared by every operation in the crate.

use std::fmt;
use std::io;

/// Errors that can be produced while mounting, or while operating on a mounted
/// filesystem.
///
/// The public `posix` facade collapses all of these to `-1`, matching
/// `spec.md`'s external interface; the richer variants stay available to callers
/// going through [`crate::FileSystem`] directly.
#[derive(Debug)]
pub enum Error {
    /// The superblock or FAT failed validation at mount time.
    BadImage(&'static str),
    /// An operation was attempted without a mounted filesystem.
    NotMounted,
    /// A null/empty/oversized argument was passed (e.g. a bad filename).
    BadArg(&'static str),
    /// A lookup by name found nothing.
    NotFound,
    /// `create` was given a name that is already in use.
    Exists,
    /// `delete` was attempted on a file that still has open descriptors.
    Busy,
    /// The FAT has no free entry, or the file descriptor table is full.
    Full,
    /// An on-disk structure violated an invariant discovered outside of mount
    /// (e.g. a FAT chain walk hit an out-of-range or already-free entry).
    Corrupt(&'static str),
    /// The underlying block device failed.
    Io(io::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BadImage(reason) => write!(f, "bad filesystem image: {reason}"),
            Self::NotMounted => write!(f, "no filesystem is mounted"),
            Self::BadArg(reason) => write!(f, "invalid argument: {reason}"),
            Self::NotFound => write!(f, "no such file"),
            Self::Exists => write!(f, "file already exists"),
            Self::Busy => write!(f, "file is open"),
            Self::Full => write!(f, "no space left"),
            Self::Corrupt(reason) => write!(f, "corrupt filesystem structure: {reason}"),
            Self::Io(e) => write!(f, "I/O error: {e}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
