/// Number of rows in the global descriptor table.
pub const MAX_FDS: usize = 16;

/// Number of backend slots in the registry.
pub const VFS_MAX_COUNT: usize = 4;

/// Maximum length of a backend path prefix, in bytes.
pub const PATH_MAX_PREFIX: usize = 32;
