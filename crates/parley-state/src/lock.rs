//! Lock selection for the state store.
//!
//! A store shared between worker threads uses [`ThreadSafe`], backed by a
//! `parking_lot` mutex. Deployments that guarantee one thread per store can
//! use [`SingleThreaded`], backed by a `RefCell`: no atomic work, and the
//! store becomes `!Sync` so it cannot be shared by mistake.

use std::cell::{RefCell, RefMut};
use std::ops::DerefMut;

use parking_lot::{Mutex, MutexGuard};

/// A family of locks usable by [`StateStore`](crate::StateStore).
pub trait StoreLock {
    /// Whether this lock synchronises between threads.
    const THREAD_SAFE: bool;

    /// The lock wrapping a value of type `T`.
    type Lock<T>;

    /// Exclusive access to the locked value.
    type Guard<'a, T: 'a>: DerefMut<Target = T>;

    fn new<T>(value: T) -> Self::Lock<T>;

    /// Acquire exclusive access.
    fn lock<'a, T: 'a>(lock: &'a Self::Lock<T>) -> Self::Guard<'a, T>;

    /// Access through a unique reference, without locking.
    fn get_mut<T>(lock: &mut Self::Lock<T>) -> &mut T;
}

/// Lock for stores shared between worker threads.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadSafe;

impl StoreLock for ThreadSafe {
    const THREAD_SAFE: bool = true;

    type Lock<T> = Mutex<T>;
    type Guard<'a, T: 'a> = MutexGuard<'a, T>;

    fn new<T>(value: T) -> Mutex<T> {
        Mutex::new(value)
    }

    fn lock<'a, T: 'a>(lock: &'a Mutex<T>) -> MutexGuard<'a, T> {
        lock.lock()
    }

    fn get_mut<T>(lock: &mut Mutex<T>) -> &mut T {
        lock.get_mut()
    }
}

/// Lock for stores confined to a single thread.
///
/// Re-entering the store while it is locked panics instead of deadlocking.
#[derive(Debug, Clone, Copy, Default)]
pub struct SingleThreaded;

impl StoreLock for SingleThreaded {
    const THREAD_SAFE: bool = false;

    type Lock<T> = RefCell<T>;
    type Guard<'a, T: 'a> = RefMut<'a, T>;

    fn new<T>(value: T) -> RefCell<T> {
        RefCell::new(value)
    }

    fn lock<'a, T: 'a>(lock: &'a RefCell<T>) -> RefMut<'a, T> {
        lock.borrow_mut()
    }

    fn get_mut<T>(lock: &mut RefCell<T>) -> &mut T {
        lock.get_mut()
    }
}
