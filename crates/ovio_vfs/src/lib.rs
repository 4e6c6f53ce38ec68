//! Virtual file system multiplexer.
//!
//! A [`Vfs`] routes standard file and directory operations to pluggable
//! [`VfsBackend`]s keyed by path prefix, and owns the process-wide
//! descriptor table that maps global descriptors to backend-local ones.
//! Backends register under a prefix (`"/dev"`, …) or reserve a descriptor
//! range outright (standard streams); callers address them through paths,
//! descriptors, or directory handles and never see which backend served
//! them.

#![cfg_attr(not(test), no_std)]

extern crate alloc;

use alloc::{boxed::Box, sync::Arc};
use core::{any::Any, fmt};

use arrayvec::ArrayString;
use mutex_api::{Mutex, RawMutex};
#[cfg(test)]
use ovio_types::LocalFd;
use ovio_types::{Errno, Metadata, OpenFlags, RawFd, SeekFrom};

pub use self::backend::{DirEntry, VfsBackend};
use self::{
    registry::{BackendSlot, FdRow, Prefix, State},
    root_dir::RootDir,
};

mod backend;
pub mod params;
mod registry;
mod root_dir;

/// Observer of backend registration boundaries.
///
/// Both hooks run with no internal lock held.
pub trait VfsEvents: Send + Sync {
    fn registered(&self, prefix: &str);
    fn unregistered(&self, prefix: &str);
}

pub(crate) struct Shared<R>
where
    R: RawMutex,
{
    pub(crate) state: Mutex<R, State>,
    events: Option<Box<dyn VfsEvents>>,
}

/// The VFS multiplexer.
///
/// Clones share one registry and descriptor table.
pub struct Vfs<R>
where
    R: RawMutex,
{
    shared: Arc<Shared<R>>,
}

impl<R> Clone for Vfs<R>
where
    R: RawMutex,
{
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

/// An open directory stream.
///
/// Carries the index of the backend that opened it, so iteration calls
/// reach the right backend without re-resolving a path, plus the
/// backend's own opaque cursor.
pub struct Dir {
    backend: usize,
    handle: Box<dyn Any + Send>,
}

impl fmt::Debug for Dir {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dir")
            .field("backend", &self.backend)
            .finish_non_exhaustive()
    }
}

impl<R> Default for Vfs<R>
where
    R: RawMutex + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<R> Vfs<R>
where
    R: RawMutex + 'static,
{
    #[must_use]
    pub fn new() -> Self {
        Self::build(None)
    }

    /// Creates a multiplexer whose registration boundaries are reported
    /// to `events`.
    #[must_use]
    pub fn with_events(events: Box<dyn VfsEvents>) -> Self {
        Self::build(Some(events))
    }

    fn build(events: Option<Box<dyn VfsEvents>>) -> Self {
        let shared = Arc::new(Shared {
            state: Mutex::new(State::new()),
            events,
        });

        // The root backend binds "/" directly, which the public prefix
        // grammar cannot express: the boundary rule then makes it an
        // exact match for "/" and nothing else.
        let root = RootDir::new(Arc::downgrade(&shared));
        shared
            .state
            .lock()
            .insert(BackendSlot {
                prefix: Prefix::Path(ArrayString::from("/").expect("fits any prefix capacity")),
                ops: Arc::new(root),
            })
            .expect("fresh registry has a free slot");

        let vfs = Self { shared };
        vfs.emit_registered("/");
        vfs
    }

    fn emit_registered(&self, prefix: &str) {
        log::debug!("vfs backend registered at {prefix:?}");
        if let Some(events) = &self.shared.events {
            events.registered(prefix);
        }
    }

    fn emit_unregistered(&self, prefix: &str) {
        log::debug!("vfs backend unregistered at {prefix:?}");
        if let Some(events) = &self.shared.events {
            events.unregistered(prefix);
        }
    }

    /// Registers `ops` under `prefix` and returns its slot index.
    ///
    /// The prefix must be empty (the default catch-all) or start with `/`
    /// without ending in one; `EINVAL` otherwise, `ENOMEM` when every
    /// slot is taken.
    pub fn register(&self, prefix: &str, ops: Arc<dyn VfsBackend>) -> Result<usize, Errno> {
        let prefix = registry::validate_prefix(prefix)?;
        let index = self.shared.state.lock().insert(BackendSlot {
            prefix: Prefix::Path(prefix),
            ops,
        })?;
        self.emit_registered(&prefix);
        Ok(index)
    }

    /// Registers `ops` without a path and reserves descriptor rows
    /// `min..=max` for it, all permanent, with the row index as the
    /// backend-local descriptor.
    ///
    /// Fails with `EINVAL` when the range is out of bounds or any row in
    /// it is occupied; a failed call changes nothing.
    pub fn register_fd_range(
        &self,
        ops: Arc<dyn VfsBackend>,
        min: usize,
        max: usize,
    ) -> Result<usize, Errno> {
        if min > max || max >= params::MAX_FDS {
            return Err(Errno::InvalidInput);
        }
        let mut state = self.shared.state.lock();
        if !state.rows_free(min, max) {
            return Err(Errno::InvalidInput);
        }
        let index = state.insert(BackendSlot {
            prefix: Prefix::Ignored,
            ops,
        })?;
        state.set_permanent_rows(index, min, max);
        Ok(index)
    }

    /// Removes the backend at `index`.
    ///
    /// Every descriptor row pointing at it is freed under the same lock,
    /// permanent rows included, so no row outlives its backend or aliases
    /// a reused slot.
    pub fn unregister(&self, index: usize) -> Result<(), Errno> {
        let slot = {
            let mut state = self.shared.state.lock();
            let slot = state.take_slot(index).ok_or(Errno::InvalidInput)?;
            state.free_rows_of(index);
            slot
        };
        if let Prefix::Path(prefix) = &slot.prefix {
            self.emit_unregistered(prefix);
        }
        Ok(())
    }

    fn resolve(&self, path: &str) -> Result<(usize, Arc<dyn VfsBackend>, usize), Errno> {
        let state = self.shared.state.lock();
        let (index, prefix_len, ops) = state.resolve(path).ok_or(Errno::NotFound)?;
        Ok((index, Arc::clone(ops), prefix_len))
    }

    fn lookup(&self, fd: RawFd) -> Result<(FdRow, Arc<dyn VfsBackend>), Errno> {
        self.shared.state.lock().lookup(fd)
    }

    fn backend_at(&self, index: usize) -> Result<Arc<dyn VfsBackend>, Errno> {
        self.shared
            .state
            .lock()
            .slot(index)
            .map(|slot| Arc::clone(&slot.ops))
            .ok_or(Errno::BadFileDescriptor)
    }

    /// Opens `path` and returns a global descriptor.
    pub fn open(&self, path: &str, flags: OpenFlags, mode: u32) -> Result<RawFd, Errno> {
        let (index, ops, prefix_len) = self.resolve(path)?;
        let local = ops.open(registry::translate(path, prefix_len), flags, mode)?;

        let claimed = self.shared.state.lock().claim_row(index, local);
        match claimed {
            Some(fd) => Ok(fd),
            None => {
                // The table is full; give the local descriptor back.
                // Nothing useful can be done if that fails as well.
                let _ = ops.close(local);
                Err(Errno::TooManyOpenFilesSystem)
            }
        }
    }

    /// Closes `fd`.
    ///
    /// The row is freed only after the backend's close succeeds, and
    /// never for permanent rows.
    pub fn close(&self, fd: RawFd) -> Result<(), Errno> {
        let (row, ops) = self.lookup(fd)?;
        ops.close(row.local)?;
        if !row.permanent {
            self.shared.state.lock().free_row(fd);
        }
        Ok(())
    }

    pub fn read(&self, fd: RawFd, buf: &mut [u8]) -> Result<usize, Errno> {
        let (row, ops) = self.lookup(fd)?;
        ops.read(row.local, buf)
    }

    pub fn write(&self, fd: RawFd, buf: &[u8]) -> Result<usize, Errno> {
        let (row, ops) = self.lookup(fd)?;
        ops.write(row.local, buf)
    }

    pub fn pread(&self, fd: RawFd, buf: &mut [u8], offset: u64) -> Result<usize, Errno> {
        let (row, ops) = self.lookup(fd)?;
        ops.pread(row.local, buf, offset)
    }

    pub fn pwrite(&self, fd: RawFd, buf: &[u8], offset: u64) -> Result<usize, Errno> {
        let (row, ops) = self.lookup(fd)?;
        ops.pwrite(row.local, buf, offset)
    }

    pub fn lseek(&self, fd: RawFd, pos: SeekFrom) -> Result<u64, Errno> {
        let (row, ops) = self.lookup(fd)?;
        ops.lseek(row.local, pos)
    }

    pub fn fcntl(&self, fd: RawFd, cmd: i32, arg: usize) -> Result<i32, Errno> {
        let (row, ops) = self.lookup(fd)?;
        ops.fcntl(row.local, cmd, arg)
    }

    pub fn fstat(&self, fd: RawFd) -> Result<Metadata, Errno> {
        let (row, ops) = self.lookup(fd)?;
        ops.fstat(row.local)
    }

    /// Stats `path` without opening it.
    pub fn stat(&self, path: &str) -> Result<Metadata, Errno> {
        let (_, ops, prefix_len) = self.resolve(path)?;
        ops.stat(registry::translate(path, prefix_len))
    }

    pub fn fsync(&self, fd: RawFd) -> Result<(), Errno> {
        let (row, ops) = self.lookup(fd)?;
        ops.fsync(row.local)
    }

    pub fn ioctl(&self, fd: RawFd, cmd: u32, arg: usize) -> Result<i32, Errno> {
        let (row, ops) = self.lookup(fd)?;
        ops.ioctl(row.local, cmd, arg)
    }

    /// Opens a directory stream on `path`.
    pub fn opendir(&self, path: &str) -> Result<Dir, Errno> {
        let (index, ops, prefix_len) = self.resolve(path)?;
        let handle = ops.opendir(registry::translate(path, prefix_len))?;
        Ok(Dir {
            backend: index,
            handle,
        })
    }

    pub fn closedir(&self, dir: Dir) -> Result<(), Errno> {
        let ops = self.backend_at(dir.backend)?;
        ops.closedir(dir.handle)
    }

    /// Reads the next directory entry, or `None` at the end.
    pub fn readdir(&self, dir: &mut Dir) -> Result<Option<DirEntry>, Errno> {
        let ops = self.backend_at(dir.backend)?;
        ops.readdir(dir.handle.as_mut())
    }

    /// Reentrant variant of [`readdir`](Vfs::readdir): fills `entry` and
    /// reports whether one was read.
    pub fn readdir_r(&self, dir: &mut Dir, entry: &mut DirEntry) -> Result<bool, Errno> {
        match self.readdir(dir)? {
            Some(read) => {
                *entry = read;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub fn telldir(&self, dir: &mut Dir) -> Result<u64, Errno> {
        let ops = self.backend_at(dir.backend)?;
        ops.telldir(dir.handle.as_mut())
    }

    /// Moves the stream to `loc`, a position previously returned by
    /// [`telldir`](Vfs::telldir). Errors are swallowed per the boundary
    /// contract.
    pub fn seekdir(&self, dir: &mut Dir, loc: u64) {
        if let Ok(ops) = self.backend_at(dir.backend) {
            let _ = ops.seekdir(dir.handle.as_mut(), loc);
        }
    }
}
