use strum::FromRepr;

/// An errno-valued error.
///
/// Backends report failures with these values and the dispatch layer
/// surfaces them to callers verbatim. The discriminants are the hosted
/// errno numbers, so a value crosses the C boundary unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromRepr, thiserror::Error)]
#[repr(i32)]
pub enum Errno {
    // EPERM
    #[error("operation not permitted")]
    NotPermitted = 1,
    // ENOENT
    #[error("no such file or directory")]
    NotFound = 2,
    // EIO
    #[error("input/output error")]
    Io = 5,
    // ENXIO
    #[error("no such device or address")]
    DeviceNotFound = 6,
    // EBADF
    #[error("bad file descriptor")]
    BadFileDescriptor = 9,
    // EAGAIN
    #[error("resource temporarily unavailable")]
    WouldBlock = 11,
    // ENOMEM
    #[error("cannot allocate memory")]
    OutOfMemory = 12,
    // EACCES
    #[error("permission denied")]
    PermissionDenied = 13,
    // EBUSY
    #[error("device or resource busy")]
    ResourceBusy = 16,
    // EEXIST
    #[error("file exists")]
    AlreadyExists = 17,
    // ENODEV
    #[error("no such device")]
    NoSuchDevice = 19,
    // ENOTDIR
    #[error("not a directory")]
    NotADirectory = 20,
    // EISDIR
    #[error("is a directory")]
    IsADirectory = 21,
    // EINVAL
    #[error("invalid argument")]
    InvalidInput = 22,
    // ENFILE
    #[error("too many open files in system")]
    TooManyOpenFilesSystem = 23,
    // EMFILE
    #[error("too many open files")]
    TooManyOpenFiles = 24,
    // EFBIG
    #[error("file too large")]
    FileTooLarge = 27,
    // ENOSPC
    #[error("no space left on device")]
    StorageFull = 28,
    // EROFS
    #[error("read-only file system")]
    ReadOnlyFilesystem = 30,
    // ENAMETOOLONG
    #[error("file name too long")]
    NameTooLong = 36,
    // ENOSYS
    #[error("function not implemented")]
    Unsupported = 38,
    // ENOTEMPTY
    #[error("directory not empty")]
    DirectoryNotEmpty = 39,
    // EALREADY
    #[error("operation already in progress")]
    AlreadyInProgress = 114,
}

impl Errno {
    /// Returns the positive errno value.
    #[must_use]
    pub const fn as_raw(self) -> i32 {
        self as i32
    }

    /// Converts a positive errno value back into an [`Errno`].
    #[must_use]
    pub fn from_raw(raw: i32) -> Option<Self> {
        Self::from_repr(raw)
    }

    /// Returns the negated errno value used by the C return convention.
    #[must_use]
    pub const fn as_neg(self) -> i32 {
        -(self as i32)
    }

    /// Converts a negative C-convention return value into an [`Errno`].
    #[must_use]
    pub fn from_neg(raw: i32) -> Option<Self> {
        Self::from_repr(-raw)
    }
}
