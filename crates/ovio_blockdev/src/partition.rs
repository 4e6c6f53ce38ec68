use mutex_api::RawMutex;
use ovio_types::Errno;

use crate::{dev::DevRef, driver::BlockDriver, ioctl::BlockIoctl};

/// Driver of a partition device.
///
/// Holds a strong reference to the parent device and forwards transfers
/// with the start sector shifted by the partition's base offset. The
/// partition answers `GetSectorCount` itself; every other command goes to
/// the parent.
pub struct PartitionDriver<R>
where
    R: RawMutex,
{
    parent: DevRef<R>,
    start: u32,
    len: u32,
}

impl<R> PartitionDriver<R>
where
    R: RawMutex,
{
    pub fn new(parent: DevRef<R>, start: u32, len: u32) -> Self {
        Self { parent, start, len }
    }

    fn translate(&self, start: u32) -> Result<u32, Errno> {
        self.start.checked_add(start).ok_or(Errno::InvalidInput)
    }
}

impl<R> BlockDriver for PartitionDriver<R>
where
    R: RawMutex,
{
    fn read_sectors(&self, buf: &mut [u8], start: u32, count: u32) -> Result<u32, Errno> {
        self.parent.read_sectors(buf, self.translate(start)?, count)
    }

    fn write_sectors(&self, buf: &[u8], start: u32, count: u32) -> Result<u32, Errno> {
        self.parent.write_sectors(buf, self.translate(start)?, count)
    }

    fn ioctl(&self, cmd: BlockIoctl<'_>) -> Result<(), Errno> {
        match cmd {
            BlockIoctl::GetSectorCount(count) => {
                *count = self.len;
                Ok(())
            }
            other => self.parent.ioctl(other),
        }
    }
}
