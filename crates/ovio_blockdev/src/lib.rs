//! Block device layer.
//!
//! A [`BlockDev`] pairs a driver (the [`BlockDriver`] capability trait)
//! with a parent/child topology, so partitions of a disk appear as
//! independent devices that forward I/O to their parent. Devices are
//! shared through [`DevRef`] (an 8-bit-counted [`arc8::Arc8`]);
//! [`DevRegistry::register`] scans root devices for an MS-DOS partition
//! table and publishes the children it finds.

#![cfg_attr(not(test), no_std)]

extern crate alloc;

pub use self::{
    dev::{BlockDev, DevRef},
    driver::{BlockDriver, Direction, SectorRequest},
    ioctl::{BlockIoctl, Geometry},
    partition::PartitionDriver,
    registry::{DevEvents, DevRegistry},
};

mod dev;
mod driver;
mod ioctl;
mod mbr;
mod partition;
mod registry;

/// Sector size of the block layer, in bytes.
pub const SECTOR_SIZE: usize = 512;
