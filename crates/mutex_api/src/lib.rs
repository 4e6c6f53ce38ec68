//! A simple mutex API.
//!
//! The host platform supplies the blocking lock primitive as a [`RawMutex`]
//! implementation; [`Mutex`] pairs one with the data it protects and hands
//! out RAII guards. [`RawSpinMutex`] is a portable spinning implementation
//! usable on any target (and in host tests).

#![cfg_attr(not(test), no_std)]

use core::{
    cell::UnsafeCell,
    fmt,
    hint,
    ops::{Deref, DerefMut},
    sync::atomic::{AtomicBool, Ordering},
};

/// A raw blocking lock.
///
/// `acquire` blocks until the lock is held; `release` must only be called
/// by the holder. Implementations are not required to be reentrant.
pub trait RawMutex: Default + Send + Sync {
    /// Acquires the lock, blocking until it is held.
    fn acquire(&self);

    /// Releases the lock.
    fn release(&self);
}

/// Data guarded by a [`RawMutex`].
#[derive(Default)]
pub struct Mutex<R, T> {
    raw: R,
    value: UnsafeCell<T>,
}

unsafe impl<R, T> Send for Mutex<R, T>
where
    R: Send,
    T: Send,
{
}
unsafe impl<R, T> Sync for Mutex<R, T>
where
    R: Sync,
    T: Send,
{
}

impl<R, T> Mutex<R, T>
where
    R: RawMutex,
{
    pub fn new(value: T) -> Self {
        Self {
            raw: R::default(),
            value: UnsafeCell::new(value),
        }
    }

    /// Acquires the lock, blocking the calling thread until it is held.
    pub fn lock(&self) -> MutexGuard<'_, R, T> {
        self.raw.acquire();
        MutexGuard { mutex: self }
    }

    /// Returns a mutable reference to the data without locking.
    pub fn get_mut(&mut self) -> &mut T {
        self.value.get_mut()
    }

    pub fn into_inner(self) -> T {
        self.value.into_inner()
    }
}

impl<R, T> fmt::Debug for Mutex<R, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mutex").finish_non_exhaustive()
    }
}

/// An RAII guard returned by [`Mutex::lock`]. The lock is released on drop.
pub struct MutexGuard<'a, R, T>
where
    R: RawMutex,
{
    mutex: &'a Mutex<R, T>,
}

unsafe impl<R, T> Send for MutexGuard<'_, R, T>
where
    R: RawMutex + Sync,
    T: Send,
{
}
unsafe impl<R, T> Sync for MutexGuard<'_, R, T>
where
    R: RawMutex + Sync,
    T: Sync,
{
}

impl<R, T> Drop for MutexGuard<'_, R, T>
where
    R: RawMutex,
{
    fn drop(&mut self) {
        self.mutex.raw.release();
    }
}

impl<R, T> Deref for MutexGuard<'_, R, T>
where
    R: RawMutex,
{
    type Target = T;

    fn deref(&self) -> &Self::Target {
        unsafe { &*self.mutex.value.get() }
    }
}

impl<R, T> DerefMut for MutexGuard<'_, R, T>
where
    R: RawMutex,
{
    fn deref_mut(&mut self) -> &mut Self::Target {
        unsafe { &mut *self.mutex.value.get() }
    }
}

/// A portable spinning [`RawMutex`].
#[derive(Default)]
pub struct RawSpinMutex {
    locked: AtomicBool,
}

impl RawSpinMutex {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            locked: AtomicBool::new(false),
        }
    }
}

impl RawMutex for RawSpinMutex {
    fn acquire(&self) {
        // `Ordering::Acquire` tells the compiler and the processor to not move loads or
        // stores past this point, to ensure that the critical section's memory
        // references happen strictly after the lock is acquired.
        while self
            .locked
            .compare_exchange_weak(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            hint::spin_loop();
        }
    }

    fn release(&self) {
        // `Ordering::Release` ensures that all the stores in the critical
        // section are visible to other threads before the lock is released.
        self.locked.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, thread};

    use super::*;

    type SpinMutex<T> = Mutex<RawSpinMutex, T>;

    #[test]
    fn test_lock_unlock() {
        let mutex = SpinMutex::new(1);
        {
            let mut guard = mutex.lock();
            *guard += 1;
        }
        assert_eq!(*mutex.lock(), 2);
    }

    #[test]
    fn test_get_mut() {
        let mut mutex = SpinMutex::new(5);
        *mutex.get_mut() = 7;
        assert_eq!(mutex.into_inner(), 7);
    }

    #[test]
    fn test_contended_counter() {
        let mutex = Arc::new(SpinMutex::new(0_usize));
        let threads: Vec<_> = (0..4)
            .map(|_| {
                let mutex = Arc::clone(&mutex);
                thread::spawn(move || {
                    for _ in 0..1000 {
                        *mutex.lock() += 1;
                    }
                })
            })
            .collect();
        for t in threads {
            t.join().unwrap();
        }
        assert_eq!(*mutex.lock(), 4000);
    }
}
