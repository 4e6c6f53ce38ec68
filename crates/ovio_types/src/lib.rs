//! Common types for the ovio I/O substrate.

#![cfg_attr(not(test), no_std)]

pub use self::{
    errno::Errno,
    fs::{FileType, LocalFd, Metadata, OpenFlags, RawFd, SeekFrom},
};

mod errno;
mod fs;
