//! A counting semaphore used to gate task readiness.
//!
//! The pool owns all blocking. A semaphore never parks a thread: acquisition
//! is strictly non-blocking, and a pipeline that cannot acquire its
//! preconditions simply is not runnable yet. A release that brings the count
//! back from zero pokes the pool's wake channels so that any job the release
//! may have made runnable gets another look from the dispatch loop.

use std::sync::atomic::AtomicI32;
use std::sync::atomic::Ordering;

use crossbeam_utils::CachePadded;

use crate::thread_pool::ThreadPool;

// -----------------------------------------------------------------------------
// Semaphore

/// A counting semaphore shared between the iterations of a producer task and
/// the preconditions of a consumer task.
///
/// Semaphores are usually allocated by the compiled pipeline alongside the
/// pool itself:
///
/// ```rust,no_run
/// use tutti::Semaphore;
/// use tutti::ThreadPool;
///
/// static POOL: ThreadPool = ThreadPool::new();
/// static SLOTS: Semaphore = Semaphore::new(&POOL, 0);
/// ```
pub struct Semaphore {
    /// Permits currently available. A successful acquire never drives this
    /// negative; a failed acquire restores what it subtracted.
    value: CachePadded<AtomicI32>,
    /// The pool whose wake channels a release must signal.
    pool: &'static ThreadPool,
}

impl Semaphore {
    /// Creates a semaphore with `initial` permits, tied to the pool whose
    /// jobs it will gate.
    pub const fn new(pool: &'static ThreadPool, initial: i32) -> Semaphore {
        Semaphore {
            value: CachePadded::new(AtomicI32::new(initial)),
            pool,
        }
    }

    /// Adds `n` permits and returns the new count.
    ///
    /// A release that transitions the count from zero may have made a stalled
    /// job runnable, so it wakes the pool's A-team and owner channels. The
    /// broadcast happens under the queue mutex: that orders it after any
    /// in-progress readiness check, so the wakeup cannot fall between a failed
    /// check and the wait that follows it.
    pub fn release(&self, n: i32) -> i32 {
        let new_value = self.value.fetch_add(n, Ordering::SeqCst) + n;
        if new_value == n {
            self.pool.semaphore_released();
        }
        new_value
    }

    /// Takes `n` permits if they are all available right now. Never blocks.
    pub fn try_acquire(&self, n: i32) -> bool {
        let new_value = self.value.fetch_sub(n, Ordering::SeqCst) - n;
        if new_value < 0 {
            // Overshot; put the permits back and report failure.
            self.value.fetch_add(n, Ordering::SeqCst);
            return false;
        }
        true
    }

    /// A snapshot of the current permit count, for diagnostics. Only
    /// meaningful at quiescent points.
    pub fn value(&self) -> i32 {
        self.value.load(Ordering::SeqCst)
    }
}

// -----------------------------------------------------------------------------
// Preconditions

/// One precondition of a task: `count` permits of `semaphore` must be
/// acquired before each iteration of the task may run.
#[derive(Clone, Copy)]
pub struct SemaphoreAcquire<'a> {
    pub semaphore: &'a Semaphore,
    pub count: i32,
}

impl<'a> SemaphoreAcquire<'a> {
    pub const fn new(semaphore: &'a Semaphore, count: i32) -> SemaphoreAcquire<'a> {
        SemaphoreAcquire { semaphore, count }
    }
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use super::*;

    static POOL: ThreadPool = ThreadPool::new();

    #[test]
    fn release_is_monotone() {
        static SEM: Semaphore = Semaphore::new(&POOL, 0);

        assert_eq!(SEM.release(1), 1);
        assert_eq!(SEM.release(3), 4);
        assert_eq!(SEM.value(), 4);
    }

    #[test]
    fn try_acquire_restores_on_underflow() {
        static SEM: Semaphore = Semaphore::new(&POOL, 2);

        assert!(!SEM.try_acquire(3));
        assert_eq!(SEM.value(), 2);

        assert!(SEM.try_acquire(2));
        assert_eq!(SEM.value(), 0);

        assert!(!SEM.try_acquire(1));
        assert_eq!(SEM.value(), 0);
    }

    #[test]
    fn quiescent_bookkeeping() {
        static SEM: Semaphore = Semaphore::new(&POOL, 5);

        // value == init - acquired + released at every quiescent point.
        assert!(SEM.try_acquire(4));
        SEM.release(2);
        assert!(SEM.try_acquire(3));
        assert_eq!(SEM.value(), 5 - 4 + 2 - 3);
    }
}
