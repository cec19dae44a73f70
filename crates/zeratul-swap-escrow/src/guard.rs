//! non-reentrant entry guard
//!
//! every mutating ledger entry point holds an [`Entered`] token for its
//! whole duration, including while collaborators run. calls from different
//! threads queue on the guard and run one at a time to completion. a
//! collaborator that calls back into any mutating entry point on the same
//! thread gets [`EscrowError::Reentrancy`].
//!
//! a collaborator must not hand a ledger call to another thread and wait
//! for it; that call queues behind the one waiting on it.

use std::cell::Cell;

use parking_lot::{ReentrantMutex, ReentrantMutexGuard};

use crate::error::{EscrowError, Result};

#[derive(Debug, Default)]
pub struct ReentrancyGuard {
    /// owning thread holds the lock for the whole call, flag marks it busy
    entered: ReentrantMutex<Cell<bool>>,
}

impl ReentrancyGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// wait for other threads to finish, reject nested entry on this one
    pub fn enter(&self) -> Result<Entered<'_>> {
        let lock = self.entered.lock();
        if lock.get() {
            tracing::warn!("reentrant call rejected");
            return Err(EscrowError::Reentrancy);
        }
        lock.set(true);
        Ok(Entered { lock })
    }

    /// whether a call is in progress on any thread
    pub fn is_entered(&self) -> bool {
        self.entered.try_lock().map_or(true, |lock| lock.get())
    }
}

/// releases the guard on drop, including on early error returns
#[derive(Debug)]
pub struct Entered<'a> {
    lock: ReentrantMutexGuard<'a, Cell<bool>>,
}

impl Drop for Entered<'_> {
    fn drop(&mut self) {
        self.lock.set(false);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_nested_entry_rejected() {
        let guard = ReentrancyGuard::new();
        let outer = guard.enter().unwrap();
        assert!(guard.is_entered());
        assert_eq!(guard.enter().unwrap_err(), EscrowError::Reentrancy);
        // a rejected nested entry does not release the outer one
        assert!(guard.is_entered());
        drop(outer);
        assert!(!guard.is_entered());
        assert!(guard.enter().is_ok());
    }

    #[test]
    fn test_released_on_error_path() {
        let guard = ReentrancyGuard::new();
        let run = || -> Result<()> {
            let _entered = guard.enter()?;
            Err(EscrowError::InvalidAmount)
        };
        assert!(run().is_err());
        assert!(!guard.is_entered());
    }

    #[test]
    fn test_other_threads_wait_instead_of_failing() {
        let guard = Arc::new(ReentrancyGuard::new());
        let inside = Arc::new(AtomicUsize::new(0));
        let completed = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let guard = guard.clone();
                let inside = inside.clone();
                let completed = completed.clone();
                thread::spawn(move || {
                    for _ in 0..10 {
                        let _entered = guard.enter().unwrap();
                        assert_eq!(inside.fetch_add(1, Ordering::SeqCst), 0);
                        thread::sleep(Duration::from_micros(50));
                        inside.fetch_sub(1, Ordering::SeqCst);
                        completed.fetch_add(1, Ordering::SeqCst);
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(completed.load(Ordering::SeqCst), 40);
        assert!(!guard.is_entered());
    }
}
