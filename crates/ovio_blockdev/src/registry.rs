use alloc::boxed::Box;

use mutex_api::RawMutex;

use crate::{dev::DevRef, mbr};

/// Observer of device registration boundaries.
///
/// Both hooks run with no internal lock held.
pub trait DevEvents<R>: Send + Sync
where
    R: RawMutex,
{
    fn registered(&self, dev: &DevRef<R>);
    fn unregistered(&self, dev: &DevRef<R>);
}

/// Entry point for publishing block devices.
///
/// The registry itself keeps no device table; it owns the optional event
/// observer and drives the partition scan when a root device is
/// registered.
pub struct DevRegistry<R>
where
    R: RawMutex,
{
    events: Option<Box<dyn DevEvents<R>>>,
}

impl<R> Default for DevRegistry<R>
where
    R: RawMutex,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<R> DevRegistry<R>
where
    R: RawMutex,
{
    #[must_use]
    pub const fn new() -> Self {
        Self { events: None }
    }

    #[must_use]
    pub fn with_events(events: Box<dyn DevEvents<R>>) -> Self {
        Self {
            events: Some(events),
        }
    }

    /// Publishes a device.
    ///
    /// A root device (one without a parent) is scanned for an MS-DOS
    /// partition table and each discovered partition is attached and
    /// registered in turn. Consuming `dev` drops the caller's initial
    /// reference: ownership passes to whatever topology or external
    /// holder still refers to the device.
    pub fn register(&self, dev: DevRef<R>)
    where
        R: 'static,
    {
        if dev.parent().is_none() {
            mbr::scan(self, &dev);
        }
        log::debug!("block device registered");
        if let Some(events) = &self.events {
            events.registered(&dev);
        }
    }

    /// Withdraws a device and, depth-first, every partition below it.
    ///
    /// Each child link is detached, the child recursively unregistered,
    /// and its parent back-reference severed. Once callers drop the
    /// references they hold, every device in the tree is destroyed
    /// exactly once.
    pub fn unregister(&self, dev: &DevRef<R>) {
        while let Some(child) = dev.take_child() {
            self.unregister(&child);
            child.sever_parent();
        }
        log::debug!("block device unregistered");
        if let Some(events) = &self.events {
            events.unregistered(dev);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        Arc, Mutex as StdMutex,
        atomic::{AtomicUsize, Ordering},
    };

    use arc8::Arc8;
    use mutex_api::RawSpinMutex;
    use ovio_types::Errno;

    use super::*;
    use crate::{
        BlockDev, BlockDriver, BlockIoctl, SECTOR_SIZE,
        mbr::tests::boot_sector,
    };

    type Dev = BlockDev<RawSpinMutex>;
    type Registry = DevRegistry<RawSpinMutex>;

    /// A disk whose sector 0 is fixed and whose other reads are recorded.
    #[derive(Clone)]
    struct MockDisk {
        sector0: Arc<[u8; SECTOR_SIZE]>,
        reads: Arc<StdMutex<Vec<(u32, u32)>>>,
        drops: Arc<AtomicUsize>,
    }

    impl MockDisk {
        fn new(sector0: [u8; SECTOR_SIZE]) -> Self {
            Self {
                sector0: Arc::new(sector0),
                reads: Arc::default(),
                drops: Arc::default(),
            }
        }
    }

    impl BlockDriver for MockDisk {
        fn read_sectors(&self, buf: &mut [u8], start: u32, count: u32) -> Result<u32, Errno> {
            self.reads.lock().unwrap().push((start, count));
            if start == 0 && count == 1 {
                buf.copy_from_slice(&self.sector0[..]);
            } else {
                buf.fill(0);
            }
            Ok(count)
        }
    }

    impl Drop for MockDisk {
        fn drop(&mut self) {
            self.drops.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[derive(Default)]
    struct EventLog {
        registered: AtomicUsize,
        unregistered: AtomicUsize,
    }

    impl DevEvents<RawSpinMutex> for Arc<EventLog> {
        fn registered(&self, _dev: &DevRef<RawSpinMutex>) {
            self.registered.fetch_add(1, Ordering::SeqCst);
        }

        fn unregistered(&self, _dev: &DevRef<RawSpinMutex>) {
            self.unregistered.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_register_scans_valid_table() {
        let driver = MockDisk::new(boot_sector(&[(0x0b, 2048, 1024), (0x00, 0, 0)]));
        let registry = Registry::new();
        let disk = Dev::new(Box::new(driver.clone()));
        let handle = disk.clone();
        registry.register(disk);

        let children = handle.children();
        assert_eq!(children.len(), 1);

        let mut count = 0;
        children[0]
            .ioctl(BlockIoctl::GetSectorCount(&mut count))
            .unwrap();
        assert_eq!(count, 1024);

        // Transfers through the child land at the partition base.
        let mut buf = [0; SECTOR_SIZE];
        children[0].read_sectors(&mut buf, 0, 1).unwrap();
        assert_eq!(driver.reads.lock().unwrap().last(), Some(&(2048, 1)));
    }

    #[test]
    fn test_register_without_signature_adds_no_children() {
        let registry = Registry::new();
        let disk = Dev::new(Box::new(MockDisk::new([0; SECTOR_SIZE])));
        let handle = disk.clone();
        registry.register(disk);
        assert!(handle.children().is_empty());
    }

    #[test]
    fn test_register_skips_empty_entries() {
        let sector = boot_sector(&[(0x00, 0, 0), (0x83, 64, 32), (0x00, 0, 0), (0x0c, 96, 8)]);
        let registry = Registry::new();
        let disk = Dev::new(Box::new(MockDisk::new(sector)));
        let handle = disk.clone();
        registry.register(disk);
        assert_eq!(handle.children().len(), 2);
    }

    #[test]
    fn test_partition_registration_fires_events() {
        let events = Arc::new(EventLog::default());
        let registry = Registry::with_events(Box::new(Arc::clone(&events)));
        let disk = Dev::new(Box::new(MockDisk::new(boot_sector(&[(
            0x83, 64, 32,
        )]))));
        let handle = disk.clone();
        registry.register(disk);

        // One event per partition plus one for the disk itself.
        assert_eq!(events.registered.load(Ordering::SeqCst), 2);

        registry.unregister(&handle);
        assert_eq!(events.unregistered.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_unregister_destroys_the_tree() {
        let driver = MockDisk::new(boot_sector(&[(0x0b, 2048, 1024), (0x83, 4096, 512)]));
        let drops = Arc::clone(&driver.drops);
        let registry = Registry::new();
        let disk = Dev::new(Box::new(driver));
        let handle = disk.clone();
        registry.register(disk);

        let children = handle.children();
        assert_eq!(children.len(), 2);

        registry.unregister(&handle);
        assert!(handle.children().is_empty());

        // The topology no longer pins the children; our snapshot does.
        for child in &children {
            assert_eq!(Arc8::strong_count(child), 1);
            assert!(child.parent().is_none());
        }
        drop(children);

        // Dropping the last external reference frees the disk driver.
        assert_eq!(drops.load(Ordering::SeqCst), 0);
        drop(handle);
        assert_eq!(drops.load(Ordering::SeqCst), 1);
    }
}
