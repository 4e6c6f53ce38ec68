//! MS-DOS (MBR) partition table scan.

use alloc::boxed::Box;

use dataview::{Pod, PodMethods as _};
use mutex_api::RawMutex;

use crate::{
    SECTOR_SIZE,
    dev::{BlockDev, DevRef},
    partition::PartitionDriver,
    registry::DevRegistry,
};

/// Boot signature at bytes 510..512 of sector 0.
const SIGNATURE: [u8; 2] = [0x55, 0xaa];

/// Byte offset of the four-entry partition table.
const TABLE_OFFSET: usize = 0x1be;

const NUM_ENTRIES: usize = 4;

/// One 16-byte partition table entry.
///
/// Multi-byte fields are little-endian on disk.
#[repr(C)]
#[derive(Clone, Copy, Pod)]
struct TableEntry {
    boot: u8,
    chs_start: [u8; 3],
    system: u8,
    chs_end: [u8; 3],
    start_sect: u32,
    nr_sects: u32,
}

const _: () = const { assert!(size_of::<TableEntry>() == 16) };

impl TableEntry {
    fn is_used(&self) -> bool {
        self.system != 0
    }

    fn start_sect(&self) -> u32 {
        u32::from_le(self.start_sect)
    }

    fn nr_sects(&self) -> u32 {
        u32::from_le(self.nr_sects)
    }
}

/// Scans sector 0 of `dev` and registers a child device for every used
/// partition entry.
///
/// A device without a valid signature simply gains no children. Failure to
/// attach one partition is logged and does not stop the scan; the
/// remaining entries are still processed. Extended partitions are not
/// recursed into.
pub(crate) fn scan<R>(registry: &DevRegistry<R>, dev: &DevRef<R>)
where
    R: RawMutex + 'static,
{
    let mut sector = [0; SECTOR_SIZE];
    match dev.read_sectors(&mut sector, 0, 1) {
        Ok(1) => {}
        Ok(_) => return,
        Err(err) => {
            log::debug!("partition scan skipped: {err}");
            return;
        }
    }
    if sector[SECTOR_SIZE - 2..] != SIGNATURE {
        return;
    }

    for slot in 0..NUM_ENTRIES {
        let offset = TABLE_OFFSET + slot * size_of::<TableEntry>();
        let mut entry = TableEntry::zeroed();
        entry
            .as_bytes_mut()
            .copy_from_slice(&sector[offset..offset + size_of::<TableEntry>()]);
        if !entry.is_used() {
            continue;
        }

        let part = BlockDev::new(Box::new(PartitionDriver::new(
            dev.clone(),
            entry.start_sect(),
            entry.nr_sects(),
        )));
        if let Err(err) = BlockDev::add_child(dev, &part) {
            log::warn!("partition {slot} not attached: {err}");
            continue;
        }
        registry.register(part);
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use dataview::PodMethods as _;

    use super::*;

    /// Builds a boot sector with the given `(type, start, count)` entries.
    pub(crate) fn boot_sector(entries: &[(u8, u32, u32)]) -> [u8; SECTOR_SIZE] {
        assert!(entries.len() <= NUM_ENTRIES);
        let mut sector = [0; SECTOR_SIZE];
        sector[SECTOR_SIZE - 2..].copy_from_slice(&SIGNATURE);
        for (slot, &(system, start, count)) in entries.iter().enumerate() {
            let entry = TableEntry {
                boot: 0,
                chs_start: [0; 3],
                system,
                chs_end: [0; 3],
                start_sect: start.to_le(),
                nr_sects: count.to_le(),
            };
            let offset = TABLE_OFFSET + slot * size_of::<TableEntry>();
            sector[offset..offset + size_of::<TableEntry>()].copy_from_slice(entry.as_bytes());
        }
        sector
    }

    #[test]
    fn test_entry_layout() {
        let sector = boot_sector(&[(0x0b, 2048, 1024)]);
        assert_eq!(sector[TABLE_OFFSET + 4], 0x0b);
        assert_eq!(
            sector[TABLE_OFFSET + 8..TABLE_OFFSET + 12],
            2048_u32.to_le_bytes()
        );
        assert_eq!(
            sector[TABLE_OFFSET + 12..TABLE_OFFSET + 16],
            1024_u32.to_le_bytes()
        );
        assert_eq!(sector[510], 0x55);
        assert_eq!(sector[511], 0xaa);
    }
}
