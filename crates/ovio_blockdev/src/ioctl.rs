/// Disk geometry, as reported by the `HDIO_GETGEO` command.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Geometry {
    pub heads: u8,
    pub sectors: u8,
    pub cylinders: u16,
    pub start: u32,
}

/// The typed block device command set.
///
/// Commands a driver does not recognize yield [`Errno::Unsupported`];
/// partition devices forward unrecognized commands to their parent.
///
/// [`Errno::Unsupported`]: ovio_types::Errno::Unsupported
#[derive(Debug)]
pub enum BlockIoctl<'a> {
    /// Total number of sectors (`BLKGETSIZE`).
    GetSectorCount(&'a mut u32),
    /// Sector size in bytes (`BLKSSZGET`).
    GetSectorSize(&'a mut u32),
    /// Read-only flag (`BLKROGET`).
    GetReadOnly(&'a mut bool),
    /// Flush device buffers (`BLKFLSBUF`).
    Flush,
    /// Disk geometry (`HDIO_GETGEO`).
    GetGeometry(&'a mut Geometry),
}
