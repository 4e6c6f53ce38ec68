use alloc::{boxed::Box, sync::Weak};
use core::any::Any;

use arrayvec::ArrayString;
use mutex_api::RawMutex;
use ovio_types::{Errno, FileType};

use crate::{
    Shared,
    backend::{DirEntry, VfsBackend},
    params::VFS_MAX_COUNT,
    registry::Prefix,
};

/// The internal backend bound to `"/"`.
///
/// Its directory listing is the registry itself: one entry per registered
/// path prefix. It provides nothing but directory operations.
pub(crate) struct RootDir<R>
where
    R: RawMutex,
{
    shared: Weak<Shared<R>>,
}

/// Cursor over registry slots.
struct RootHandle {
    off: usize,
}

impl<R> RootDir<R>
where
    R: RawMutex,
{
    pub(crate) fn new(shared: Weak<Shared<R>>) -> Self {
        Self { shared }
    }
}

impl<R> VfsBackend for RootDir<R>
where
    R: RawMutex + 'static,
{
    fn opendir(&self, path: &str) -> Result<Box<dyn Any + Send>, Errno> {
        if path != "/" {
            return Err(Errno::NotFound);
        }
        Ok(Box::new(RootHandle { off: 0 }))
    }

    fn closedir(&self, dir: Box<dyn Any + Send>) -> Result<(), Errno> {
        drop(dir);
        Ok(())
    }

    fn readdir(&self, dir: &mut (dyn Any + Send)) -> Result<Option<DirEntry>, Errno> {
        let handle = dir
            .downcast_mut::<RootHandle>()
            .ok_or(Errno::BadFileDescriptor)?;
        let shared = self.shared.upgrade().ok_or(Errno::BadFileDescriptor)?;
        let state = shared.state.lock();

        while handle.off < VFS_MAX_COUNT {
            let index = handle.off;
            handle.off += 1;

            let Some(slot) = state.slot(index) else {
                continue;
            };
            let Prefix::Path(prefix) = &slot.prefix else {
                continue;
            };
            // Neither the root itself nor a default catch-all has a name
            // to report.
            if prefix.len() <= 1 {
                continue;
            }

            let mut name = ArrayString::new();
            name.push_str(&prefix[1..]);
            return Ok(Some(DirEntry {
                name,
                file_type: FileType::Directory,
            }));
        }
        Ok(None)
    }

    fn telldir(&self, dir: &mut (dyn Any + Send)) -> Result<u64, Errno> {
        let handle = dir
            .downcast_mut::<RootHandle>()
            .ok_or(Errno::BadFileDescriptor)?;
        Ok(handle.off as u64)
    }

    fn seekdir(&self, dir: &mut (dyn Any + Send), loc: u64) -> Result<(), Errno> {
        let handle = dir
            .downcast_mut::<RootHandle>()
            .ok_or(Errno::BadFileDescriptor)?;
        handle.off = usize::try_from(loc)
            .unwrap_or(VFS_MAX_COUNT)
            .min(VFS_MAX_COUNT);
        Ok(())
    }
}
