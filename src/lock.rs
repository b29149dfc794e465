//! Rebindable scoped lock.
//!
//! [`ScopedLock`] wraps an optional [`MutexGuard`]. It can be pointed at a
//! different mutex (or at nothing) after construction, which lets a caller
//! drop a registry lock before a network round trip and take it again
//! afterwards without juggling guard lifetimes by hand.

use std::ops::{Deref, DerefMut};
use std::sync::{Mutex, MutexGuard};

/// Scoped guard that holds zero or one mutex.
///
/// ```rust
/// use std::sync::Mutex;
/// use jobagent_db::lock::ScopedLock;
///
/// let registry = Mutex::new(Vec::<u32>::new());
/// let mut lock = ScopedLock::acquire(&registry);
/// lock.push(1);
/// lock.release();
/// assert!(registry.try_lock().is_ok());
/// ```
pub struct ScopedLock<'a, T> {
    guard: Option<MutexGuard<'a, T>>,
}

impl<'a, T> ScopedLock<'a, T> {
    /// Create a guard, locking `lock` immediately when one is given.
    #[must_use]
    pub fn new(lock: Option<&'a Mutex<T>>) -> Self {
        Self {
            guard: lock.map(lock_recovering),
        }
    }

    /// Create a guard that holds `lock`.
    #[must_use]
    pub fn acquire(lock: &'a Mutex<T>) -> Self {
        Self::new(Some(lock))
    }

    /// Release whatever is currently held, then lock `lock` if one is given.
    ///
    /// Rebinding to the mutex already held releases and re-acquires it.
    pub fn rebind(&mut self, lock: Option<&'a Mutex<T>>) {
        self.guard = None;
        self.guard = lock.map(lock_recovering);
    }

    /// Release the held mutex early. The guard holds nothing afterwards.
    pub fn release(&mut self) {
        self.rebind(None);
    }

    #[must_use]
    pub fn is_held(&self) -> bool {
        self.guard.is_some()
    }

    #[must_use]
    pub fn get(&self) -> Option<&T> {
        self.guard.as_deref()
    }

    pub fn get_mut(&mut self) -> Option<&mut T> {
        self.guard.as_deref_mut()
    }
}

impl<T> Deref for ScopedLock<'_, T> {
    type Target = T;

    /// # Panics
    /// Panics if the guard currently holds nothing.
    fn deref(&self) -> &T {
        self.guard
            .as_deref()
            .expect("ScopedLock dereferenced while not holding a lock")
    }
}

impl<T> DerefMut for ScopedLock<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        self.guard
            .as_deref_mut()
            .expect("ScopedLock dereferenced while not holding a lock")
    }
}

// A panic while the registry was locked leaves it structurally intact, so the
// poisoned guard is reused.
fn lock_recovering<T>(lock: &Mutex<T>) -> MutexGuard<'_, T> {
    match lock.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn acquires_on_construction_and_releases_on_drop() {
        let lock = Mutex::new(0_u32);
        {
            let mut guard = ScopedLock::acquire(&lock);
            *guard += 1;
            assert!(lock.try_lock().is_err());
        }
        assert_eq!(*lock.try_lock().unwrap(), 1);
    }

    #[test]
    fn empty_guard_holds_nothing() {
        let guard: ScopedLock<'_, u32> = ScopedLock::new(None);
        assert!(!guard.is_held());
        assert!(guard.get().is_none());
    }

    #[test]
    fn rebind_moves_between_locks() {
        let first = Mutex::new("first");
        let second = Mutex::new("second");
        let mut guard = ScopedLock::acquire(&first);
        guard.rebind(Some(&second));
        assert!(first.try_lock().is_ok());
        assert!(second.try_lock().is_err());
        assert_eq!(*guard, "second");
        guard.rebind(None);
        assert!(second.try_lock().is_ok());
        assert!(!guard.is_held());
    }

    #[test]
    fn rebind_to_same_lock_reacquires() {
        let lock = Mutex::new(5_u8);
        let mut guard = ScopedLock::acquire(&lock);
        guard.rebind(Some(&lock));
        assert_eq!(guard.get(), Some(&5));
    }

    #[test]
    fn release_lets_other_threads_in() {
        let shared = Arc::new(Mutex::new(Vec::new()));
        let mut guard = ScopedLock::acquire(shared.as_ref());
        guard.push(1);
        guard.release();

        let other = Arc::clone(&shared);
        thread::spawn(move || {
            let mut g = ScopedLock::acquire(other.as_ref());
            g.push(2);
        })
        .join()
        .unwrap();

        guard.rebind(Some(shared.as_ref()));
        assert_eq!(*guard, vec![1, 2]);
    }

    #[test]
    fn recovers_poisoned_mutex() {
        let shared = Arc::new(Mutex::new(7_i32));
        let poison = Arc::clone(&shared);
        let _ = thread::spawn(move || {
            let _g = poison.lock().unwrap();
            panic!("poison the lock");
        })
        .join();
        assert!(shared.is_poisoned());
        let guard = ScopedLock::acquire(shared.as_ref());
        assert_eq!(*guard, 7);
    }

    #[test]
    #[should_panic(expected = "not holding a lock")]
    fn deref_after_release_panics() {
        let lock = Mutex::new(1_u8);
        let mut guard = ScopedLock::acquire(&lock);
        guard.release();
        let value: u8 = *guard;
        assert_eq!(value, 1);
    }
}
