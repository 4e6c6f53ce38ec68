use ovio_types::Errno;

use crate::ioctl::BlockIoctl;

/// Transfer direction of a [`SectorRequest`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Read,
    Write,
}

/// A queued sector transfer.
///
/// This is the request shape of the asynchronous boundary contract; the
/// synchronous read/write path never builds one.
#[derive(Debug)]
pub struct SectorRequest<'a> {
    pub start: u32,
    pub count: u32,
    pub direction: Direction,
    pub buf: &'a mut [u8],
}

/// Driver capabilities of a block device.
///
/// Every operation defaults to [`Errno::Unsupported`]; a driver implements
/// the subset its hardware provides. Buffers are `count * SECTOR_SIZE`
/// bytes; transfers report the number of sectors moved. Driver teardown is
/// its `Drop` implementation.
pub trait BlockDriver: Send + Sync {
    /// Reads `count` sectors starting at `start` into `buf`.
    fn read_sectors(&self, buf: &mut [u8], start: u32, count: u32) -> Result<u32, Errno> {
        let _ = (buf, start, count);
        Err(Errno::Unsupported)
    }

    /// Writes `count` sectors starting at `start` from `buf`.
    fn write_sectors(&self, buf: &[u8], start: u32, count: u32) -> Result<u32, Errno> {
        let _ = (buf, start, count);
        Err(Errno::Unsupported)
    }

    /// Executes a device command.
    fn ioctl(&self, cmd: BlockIoctl<'_>) -> Result<(), Errno> {
        let _ = cmd;
        Err(Errno::Unsupported)
    }

    /// Submits an asynchronous transfer.
    ///
    /// The default implementation completes synchronously through
    /// [`read_sectors`]/[`write_sectors`] before returning.
    ///
    /// [`read_sectors`]: BlockDriver::read_sectors
    /// [`write_sectors`]: BlockDriver::write_sectors
    fn submit(
        &self,
        req: SectorRequest<'_>,
        complete: &mut dyn FnMut(Result<u32, Errno>),
    ) -> Result<(), Errno> {
        let result = match req.direction {
            Direction::Read => self.read_sectors(req.buf, req.start, req.count),
            Direction::Write => self.write_sectors(req.buf, req.start, req.count),
        };
        complete(result);
        Ok(())
    }
}
