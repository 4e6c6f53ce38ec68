use alloc::{boxed::Box, vec::Vec};

use arc8::Arc8;
use mutex_api::{Mutex, RawMutex};
use ovio_types::Errno;

use crate::{driver::BlockDriver, ioctl::BlockIoctl};

/// A shared handle to a block device.
pub type DevRef<R> = Arc8<BlockDev<R>>;

/// A block device: a driver plus its place in the partition topology.
///
/// The parent link and the child list form a reference cycle on purpose;
/// [`DevRegistry::unregister`](crate::DevRegistry::unregister) is the
/// explicit teardown that breaks it. References held outside the topology
/// (a file-system backend wrapping a device, a partition handle) keep
/// devices alive independently of it.
pub struct BlockDev<R>
where
    R: RawMutex,
{
    driver: Box<dyn BlockDriver>,
    topo: Mutex<R, Topology<R>>,
}

struct Topology<R>
where
    R: RawMutex,
{
    parent: Option<DevRef<R>>,
    children: Vec<DevRef<R>>,
}

impl<R> BlockDev<R>
where
    R: RawMutex,
{
    /// Allocates a device with an empty topology and a reference count of
    /// one (the returned handle).
    pub fn new(driver: Box<dyn BlockDriver>) -> DevRef<R> {
        Arc8::new(Self {
            driver,
            topo: Mutex::new(Topology {
                parent: None,
                children: Vec::new(),
            }),
        })
    }

    /// Reads `count` sectors starting at `start` into `buf`.
    pub fn read_sectors(&self, buf: &mut [u8], start: u32, count: u32) -> Result<u32, Errno> {
        self.driver.read_sectors(buf, start, count)
    }

    /// Writes `count` sectors starting at `start` from `buf`.
    pub fn write_sectors(&self, buf: &[u8], start: u32, count: u32) -> Result<u32, Errno> {
        self.driver.write_sectors(buf, start, count)
    }

    /// Executes a device command.
    pub fn ioctl(&self, cmd: BlockIoctl<'_>) -> Result<(), Errno> {
        self.driver.ioctl(cmd)
    }

    /// Returns the parent device, if this device is a partition of one.
    #[must_use]
    pub fn parent(&self) -> Option<DevRef<R>> {
        self.topo.lock().parent.clone()
    }

    /// Returns a snapshot of the child devices.
    #[must_use]
    pub fn children(&self) -> Vec<DevRef<R>> {
        self.topo.lock().children.clone()
    }

    /// Links `child` under `parent`.
    ///
    /// The child gains a strong reference to the parent and the parent a
    /// strong reference to the child. Fails with `EALREADY` if the child
    /// already has a parent and `ENOMEM` if the link cannot be allocated.
    pub fn add_child(parent: &DevRef<R>, child: &DevRef<R>) -> Result<(), Errno> {
        {
            let mut topo = child.topo.lock();
            if topo.parent.is_some() {
                return Err(Errno::AlreadyInProgress);
            }
            topo.parent = Some(parent.clone());
        }

        let mut topo = parent.topo.lock();
        if topo.children.try_reserve(1).is_err() {
            drop(topo);
            child.topo.lock().parent = None;
            return Err(Errno::OutOfMemory);
        }
        topo.children.push(child.clone());
        Ok(())
    }

    /// Detaches and returns one child link, if any remain.
    pub(crate) fn take_child(&self) -> Option<DevRef<R>> {
        self.topo.lock().children.pop()
    }

    /// Drops the parent back-reference.
    pub(crate) fn sever_parent(&self) {
        self.topo.lock().parent = None;
    }
}
