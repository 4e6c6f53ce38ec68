use alloc::sync::Arc;

use arrayvec::ArrayString;
use ovio_types::{Errno, LocalFd, RawFd};

use crate::{
    backend::VfsBackend,
    params::{MAX_FDS, PATH_MAX_PREFIX, VFS_MAX_COUNT},
};

/// How a backend is reached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Prefix {
    /// Reachable by path; `""` is the default catch-all.
    Path(ArrayString<PATH_MAX_PREFIX>),
    /// Reachable only through reserved descriptor rows.
    Ignored,
}

/// An occupied registry slot.
pub(crate) struct BackendSlot {
    pub(crate) prefix: Prefix,
    pub(crate) ops: Arc<dyn VfsBackend>,
}

/// One descriptor table row.
#[derive(Debug, Clone, Copy)]
pub(crate) struct FdRow {
    pub(crate) backend: usize,
    pub(crate) local: LocalFd,
    pub(crate) permanent: bool,
}

/// Registry slots and descriptor rows, guarded together by one mutex.
pub(crate) struct State {
    slots: [Option<BackendSlot>; VFS_MAX_COUNT],
    rows: [Option<FdRow>; MAX_FDS],
}

/// Checks a path prefix against the registration grammar: empty, or
/// `2..=PATH_MAX_PREFIX` bytes starting with `/` and not ending with `/`.
pub(crate) fn validate_prefix(prefix: &str) -> Result<ArrayString<PATH_MAX_PREFIX>, Errno> {
    let valid = match prefix.len() {
        0 => true,
        1 => false,
        n => n <= PATH_MAX_PREFIX && prefix.starts_with('/') && !prefix.ends_with('/'),
    };
    if !valid {
        return Err(Errno::InvalidInput);
    }
    Ok(ArrayString::from(prefix).expect("length checked above"))
}

/// Returns `true` if `prefix` names `path` or an ancestor of it.
///
/// A non-empty prefix strictly shorter than the path must be followed by
/// `/` in the path, so `/dev` covers `/dev/x` but not `/devices`.
fn prefix_matches(prefix: &str, path: &str) -> bool {
    if prefix.is_empty() {
        return true;
    }
    path.strip_prefix(prefix)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
}

/// Strips a matched prefix from `path`; an exact match becomes `"/"`.
pub(crate) fn translate(path: &str, prefix_len: usize) -> &str {
    let rest = &path[prefix_len..];
    if rest.is_empty() { "/" } else { rest }
}

impl State {
    pub(crate) fn new() -> Self {
        Self {
            slots: [const { None }; VFS_MAX_COUNT],
            rows: [const { None }; MAX_FDS],
        }
    }

    /// Places `slot` in the first free registry slot.
    pub(crate) fn insert(&mut self, slot: BackendSlot) -> Result<usize, Errno> {
        let (index, free) = self
            .slots
            .iter_mut()
            .enumerate()
            .find(|(_, slot)| slot.is_none())
            .ok_or(Errno::OutOfMemory)?;
        *free = Some(slot);
        Ok(index)
    }

    /// Detaches and returns the slot at `index`.
    pub(crate) fn take_slot(&mut self, index: usize) -> Option<BackendSlot> {
        self.slots.get_mut(index)?.take()
    }

    pub(crate) fn slot(&self, index: usize) -> Option<&BackendSlot> {
        self.slots.get(index).and_then(Option::as_ref)
    }

    /// Longest-prefix resolution.
    ///
    /// Returns `(slot index, prefix length, backend)` of the occupied slot
    /// with the longest matching prefix; the first such slot wins when two
    /// registrations share a prefix. `Ignored` entries never match.
    pub(crate) fn resolve(&self, path: &str) -> Option<(usize, usize, &Arc<dyn VfsBackend>)> {
        let mut best: Option<(usize, usize, &Arc<dyn VfsBackend>)> = None;
        for (index, slot) in self.slots.iter().enumerate() {
            let Some(slot) = slot else { continue };
            let Prefix::Path(prefix) = &slot.prefix else {
                continue;
            };
            if !prefix_matches(prefix, path) {
                continue;
            }
            if best.is_none_or(|(_, len, _)| prefix.len() > len) {
                best = Some((index, prefix.len(), &slot.ops));
            }
        }
        best
    }

    /// Claims the lowest free descriptor row.
    pub(crate) fn claim_row(&mut self, backend: usize, local: LocalFd) -> Option<RawFd> {
        let (fd, row) = self
            .rows
            .iter_mut()
            .enumerate()
            .find(|(_, row)| row.is_none())?;
        *row = Some(FdRow {
            backend,
            local,
            permanent: false,
        });
        Some(RawFd::new(fd))
    }

    /// Looks a descriptor up, requiring its backend to still be registered.
    pub(crate) fn lookup(&self, fd: RawFd) -> Result<(FdRow, Arc<dyn VfsBackend>), Errno> {
        let row = self
            .rows
            .get(fd.get())
            .copied()
            .flatten()
            .ok_or(Errno::BadFileDescriptor)?;
        let slot = self.slot(row.backend).ok_or(Errno::BadFileDescriptor)?;
        Ok((row, Arc::clone(&slot.ops)))
    }

    pub(crate) fn free_row(&mut self, fd: RawFd) {
        if let Some(row) = self.rows.get_mut(fd.get()) {
            *row = None;
        }
    }

    /// Frees every row owned by `backend`, permanent rows included.
    pub(crate) fn free_rows_of(&mut self, backend: usize) {
        for row in &mut self.rows {
            if row.is_some_and(|row| row.backend == backend) {
                *row = None;
            }
        }
    }

    pub(crate) fn rows_free(&self, min: usize, max: usize) -> bool {
        self.rows[min..=max].iter().all(Option::is_none)
    }

    /// Marks rows `min..=max` permanent for `backend`, with the row index
    /// as the backend-local descriptor.
    ///
    /// Callers validate the range and its vacancy first.
    pub(crate) fn set_permanent_rows(&mut self, backend: usize, min: usize, max: usize) {
        for fd in min..=max {
            debug_assert!(self.rows[fd].is_none());
            self.rows[fd] = Some(FdRow {
                backend,
                local: LocalFd::new(fd as i32),
                permanent: true,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NullBackend;

    impl VfsBackend for NullBackend {}

    fn slot_at(prefix: &str) -> BackendSlot {
        BackendSlot {
            prefix: Prefix::Path(ArrayString::from(prefix).unwrap()),
            ops: Arc::new(NullBackend),
        }
    }

    #[test]
    fn test_validate_prefix() {
        assert!(validate_prefix("").is_ok());
        assert!(validate_prefix("/dev").is_ok());
        assert!(validate_prefix("/a").is_ok());

        assert_eq!(validate_prefix("/"), Err(Errno::InvalidInput));
        assert_eq!(validate_prefix("x"), Err(Errno::InvalidInput));
        assert_eq!(validate_prefix("dev"), Err(Errno::InvalidInput));
        assert_eq!(validate_prefix("/dev/"), Err(Errno::InvalidInput));
        let long = format!("/{}", "a".repeat(PATH_MAX_PREFIX));
        assert_eq!(validate_prefix(&long), Err(Errno::InvalidInput));
    }

    #[test]
    fn test_resolve_longest_prefix() {
        let mut state = State::new();
        let a = state.insert(slot_at("/a")).unwrap();
        let ab = state.insert(slot_at("/a/b")).unwrap();

        assert_eq!(state.resolve("/a/b/x").map(|(i, ..)| i), Some(ab));
        assert_eq!(state.resolve("/a/x").map(|(i, ..)| i), Some(a));
        assert_eq!(state.resolve("/a").map(|(i, ..)| i), Some(a));
        assert_eq!(state.resolve("/b").map(|(i, ..)| i), None);
    }

    #[test]
    fn test_resolve_requires_component_boundary() {
        let mut state = State::new();
        let dev = state.insert(slot_at("/dev")).unwrap();

        assert_eq!(state.resolve("/dev").map(|(i, ..)| i), Some(dev));
        assert_eq!(state.resolve("/dev/x").map(|(i, ..)| i), Some(dev));
        assert_eq!(state.resolve("/devices").map(|(i, ..)| i), None);
    }

    #[test]
    fn test_resolve_empty_prefix_is_fallback() {
        let mut state = State::new();
        let default = state.insert(slot_at("")).unwrap();
        let dev = state.insert(slot_at("/dev")).unwrap();

        assert_eq!(state.resolve("/dev/x").map(|(i, ..)| i), Some(dev));
        assert_eq!(state.resolve("/etc/conf").map(|(i, ..)| i), Some(default));
    }

    #[test]
    fn test_resolve_ignored_never_matches() {
        let mut state = State::new();
        state
            .insert(BackendSlot {
                prefix: Prefix::Ignored,
                ops: Arc::new(NullBackend),
            })
            .unwrap();
        assert!(state.resolve("/anything").is_none());
    }

    #[test]
    fn test_translate() {
        assert_eq!(translate("/a/hi", 2), "/hi");
        assert_eq!(translate("/a", 2), "/");
        assert_eq!(translate("/whole/path", 0), "/whole/path");
    }

    #[test]
    fn test_insert_reuses_freed_slot() {
        let mut state = State::new();
        let a = state.insert(slot_at("/a")).unwrap();
        let b = state.insert(slot_at("/b")).unwrap();
        assert_ne!(a, b);

        assert!(state.take_slot(a).is_some());
        assert_eq!(state.insert(slot_at("/c")).unwrap(), a);
    }

    #[test]
    fn test_insert_fails_when_full() {
        let mut state = State::new();
        for _ in 0..VFS_MAX_COUNT {
            state.insert(slot_at("/x")).unwrap();
        }
        assert!(matches!(
            state.insert(slot_at("/y")),
            Err(Errno::OutOfMemory)
        ));
    }

    #[test]
    fn test_claim_row_takes_lowest_free() {
        let mut state = State::new();
        let backend = state.insert(slot_at("/a")).unwrap();

        let fd0 = state.claim_row(backend, LocalFd::new(7)).unwrap();
        let fd1 = state.claim_row(backend, LocalFd::new(8)).unwrap();
        assert_eq!(fd0, RawFd::new(0));
        assert_eq!(fd1, RawFd::new(1));

        state.free_row(fd0);
        assert_eq!(
            state.claim_row(backend, LocalFd::new(9)),
            Some(RawFd::new(0))
        );
    }

    #[test]
    fn test_lookup_dead_backend_is_bad_fd() {
        let mut state = State::new();
        let backend = state.insert(slot_at("/a")).unwrap();
        let fd = state.claim_row(backend, LocalFd::new(1)).unwrap();

        assert!(state.lookup(fd).is_ok());
        state.take_slot(backend);
        assert_eq!(
            state.lookup(fd).map(|(row, _)| row.local),
            Err(Errno::BadFileDescriptor)
        );
    }

    #[test]
    fn test_permanent_rows_use_row_index_as_local_fd() {
        let mut state = State::new();
        let backend = state.insert(slot_at("")).unwrap();
        assert!(state.rows_free(0, 1));
        state.set_permanent_rows(backend, 0, 1);
        assert!(!state.rows_free(1, 2));

        let (row, _) = state.lookup(RawFd::new(1)).unwrap();
        assert_eq!(row.local, LocalFd::new(1));
        assert!(row.permanent);
    }
}
