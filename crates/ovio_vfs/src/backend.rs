use alloc::boxed::Box;
use core::any::Any;

use arrayvec::ArrayString;
use ovio_types::{Errno, FileType, LocalFd, Metadata, OpenFlags, SeekFrom};

use crate::params::PATH_MAX_PREFIX;

/// A directory entry reported by [`VfsBackend::readdir`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirEntry {
    pub name: ArrayString<PATH_MAX_PREFIX>,
    pub file_type: FileType,
}

/// Operations a backend may provide.
///
/// Every method has a default body that fails with
/// [`Errno::Unsupported`]; a backend implements the subset it supports.
/// Paths arrive with the backend's registration prefix already stripped
/// (a path equal to the prefix arrives as `"/"`). File operations carry
/// the backend-local descriptor returned by `open`; directory operations
/// carry the opaque handle returned by `opendir`, which only the backend
/// itself inspects.
pub trait VfsBackend: Send + Sync {
    fn open(&self, path: &str, flags: OpenFlags, mode: u32) -> Result<LocalFd, Errno> {
        let _ = (path, flags, mode);
        Err(Errno::Unsupported)
    }

    fn close(&self, fd: LocalFd) -> Result<(), Errno> {
        let _ = fd;
        Err(Errno::Unsupported)
    }

    fn read(&self, fd: LocalFd, buf: &mut [u8]) -> Result<usize, Errno> {
        let _ = (fd, buf);
        Err(Errno::Unsupported)
    }

    fn write(&self, fd: LocalFd, buf: &[u8]) -> Result<usize, Errno> {
        let _ = (fd, buf);
        Err(Errno::Unsupported)
    }

    fn pread(&self, fd: LocalFd, buf: &mut [u8], offset: u64) -> Result<usize, Errno> {
        let _ = (fd, buf, offset);
        Err(Errno::Unsupported)
    }

    fn pwrite(&self, fd: LocalFd, buf: &[u8], offset: u64) -> Result<usize, Errno> {
        let _ = (fd, buf, offset);
        Err(Errno::Unsupported)
    }

    fn lseek(&self, fd: LocalFd, pos: SeekFrom) -> Result<u64, Errno> {
        let _ = (fd, pos);
        Err(Errno::Unsupported)
    }

    fn fcntl(&self, fd: LocalFd, cmd: i32, arg: usize) -> Result<i32, Errno> {
        let _ = (fd, cmd, arg);
        Err(Errno::Unsupported)
    }

    fn fstat(&self, fd: LocalFd) -> Result<Metadata, Errno> {
        let _ = fd;
        Err(Errno::Unsupported)
    }

    fn stat(&self, path: &str) -> Result<Metadata, Errno> {
        let _ = path;
        Err(Errno::Unsupported)
    }

    fn fsync(&self, fd: LocalFd) -> Result<(), Errno> {
        let _ = fd;
        Err(Errno::Unsupported)
    }

    fn ioctl(&self, fd: LocalFd, cmd: u32, arg: usize) -> Result<i32, Errno> {
        let _ = (fd, cmd, arg);
        Err(Errno::Unsupported)
    }

    fn opendir(&self, path: &str) -> Result<Box<dyn Any + Send>, Errno> {
        let _ = path;
        Err(Errno::Unsupported)
    }

    fn closedir(&self, dir: Box<dyn Any + Send>) -> Result<(), Errno> {
        let _ = dir;
        Err(Errno::Unsupported)
    }

    /// Reads the next entry, or `None` at the end of the directory.
    ///
    /// Handles carry their own cursor, so this also backs the reentrant
    /// surface call.
    fn readdir(&self, dir: &mut (dyn Any + Send)) -> Result<Option<DirEntry>, Errno> {
        let _ = dir;
        Err(Errno::Unsupported)
    }

    fn telldir(&self, dir: &mut (dyn Any + Send)) -> Result<u64, Errno> {
        let _ = dir;
        Err(Errno::Unsupported)
    }

    fn seekdir(&self, dir: &mut (dyn Any + Send), loc: u64) -> Result<(), Errno> {
        let _ = (dir, loc);
        Err(Errno::Unsupported)
    }
}
