//! The internal record for one in-flight parallel task.
//!
//! A job is created in the frame of the call that submits it (`par_for`
//! builds one on its own stack, `parallel_tasks` builds a scratch vector),
//! linked onto the pool's work stack, and drained by workers and the owner
//! until nothing of it remains. The queue only ever holds borrowed views; a
//! job never outlives the call that submitted it.

use std::ptr::NonNull;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

use crate::semaphore::SemaphoreAcquire;
use crate::task::Dispatch;
use crate::task::LoopTaskFn;
use crate::task::ParallelTask;
use crate::task::TaskFn;

// -----------------------------------------------------------------------------
// Group tokens

/// Identifies the sibling set a job was submitted with. A waiting owner may
/// assist any job carrying its own token, regardless of whether that job
/// blocks.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub(crate) struct GroupId(u64);

impl GroupId {
    /// Jobs start ungrouped; enqueueing stamps the submission's token.
    pub const UNGROUPED: GroupId = GroupId(0);

    /// Returns a token never handed out before.
    pub fn next() -> GroupId {
        static NEXT_GROUP_ID: AtomicU64 = AtomicU64::new(1);
        GroupId(NEXT_GROUP_ID.fetch_add(1, Ordering::Relaxed))
    }
}

// -----------------------------------------------------------------------------
// Job

/// The entrypoint a job runs its iterations through. Flat bodies come from
/// `par_for`; loop bodies from `parallel_tasks`.
#[derive(Clone, Copy)]
pub(crate) enum JobFn {
    Flat(TaskFn),
    Loop(LoopTaskFn),
}

/// One in-flight parallel task: the descriptor copy the pool chews through,
/// plus progress bookkeeping. Every field is guarded by the queue mutex while
/// the job is linked.
pub(crate) struct Job<'a> {
    pub fun: JobFn,
    /// Remaining iteration range `[min, min + extent)`. Claiming an iteration
    /// advances `min` and shrinks `extent`.
    pub min: i32,
    pub extent: i32,
    pub closure: *mut u8,
    pub ctx: *mut (),
    pub semaphores: &'a [SemaphoreAcquire<'a>],
    pub min_threads: i32,
    pub serial: bool,
    pub may_block: bool,
    pub name: Option<&'a str>,
    /// Entrypoint table captured when the job was enqueued.
    pub dispatch: Dispatch,
    /// Sibling-set token for the submission this job arrived in.
    pub group: GroupId,
    /// Workers currently inside an iteration of this job.
    pub active_workers: i32,
    /// Last non-zero status reported by any iteration.
    pub exit_status: i32,
    /// Index of the next unacquired semaphore precondition for the pending
    /// iteration.
    pub next_semaphore: usize,
    /// True while the submitting owner is parked waiting for this job.
    pub owner_is_sleeping: bool,
}

impl<'a> Job<'a> {
    /// The flat-loop job built by `par_for`.
    pub fn flat(f: TaskFn, min: i32, extent: i32, closure: *mut u8, ctx: *mut ()) -> Job<'static> {
        Job {
            fun: JobFn::Flat(f),
            min,
            extent,
            closure,
            ctx,
            semaphores: &[],
            min_threads: 1,
            serial: false,
            may_block: false,
            name: None,
            dispatch: Dispatch::DEFAULT,
            group: GroupId::UNGROUPED,
            active_workers: 0,
            exit_status: 0,
            next_semaphore: 0,
            owner_is_sleeping: false,
        }
    }

    /// A job copied out of one descriptor of a `parallel_tasks` batch.
    pub fn from_task(task: &ParallelTask<'a>, ctx: *mut ()) -> Job<'a> {
        Job {
            fun: JobFn::Loop(task.body),
            min: task.min,
            extent: task.extent,
            closure: task.closure,
            ctx,
            semaphores: task.semaphores,
            min_threads: task.min_threads,
            serial: task.serial,
            may_block: task.may_block,
            name: task.name,
            dispatch: Dispatch::DEFAULT,
            group: GroupId::UNGROUPED,
            active_workers: 0,
            exit_status: 0,
            next_semaphore: 0,
            owner_is_sleeping: false,
        }
    }

    /// Tries to acquire every remaining semaphore precondition for the
    /// pending iteration. On success the cursor resets so the next iteration
    /// acquires afresh. On failure the acquisitions already made are kept: a
    /// job has at most one consumer at a time, so holding a partial set beats
    /// releasing it and re-racing for it later.
    pub fn make_runnable(&mut self) -> bool {
        acquire_preconditions(self.semaphores, &mut self.next_semaphore)
    }

    /// A job is still running while iterations remain or a worker is inside
    /// one.
    pub fn running(&self) -> bool {
        self.extent != 0 || self.active_workers != 0
    }
}

/// Walks `next` through the precondition list, acquiring as it goes. Shared
/// between queued jobs and the off-queue serial claim state.
pub(crate) fn acquire_preconditions(semaphores: &[SemaphoreAcquire<'_>], next: &mut usize) -> bool {
    while *next < semaphores.len() {
        let acquire = &semaphores[*next];
        if !acquire.semaphore.try_acquire(acquire.count) {
            return false;
        }
        *next += 1;
    }
    *next = 0;
    true
}

// -----------------------------------------------------------------------------
// Queue handles

/// A lifetime-erased pointer to a job linked on the work stack.
///
/// The queue outlives any one submission, so the pointers it holds erase the
/// submission lifetime. Soundness rests on the submission protocol: a job is
/// linked only by `par_for`/`parallel_tasks`, and neither returns until every
/// job it linked has finished and been unlinked, so a pointer reachable from
/// the queue never dangles.
#[derive(Clone, Copy)]
pub(crate) struct JobPtr(NonNull<Job<'static>>);

impl JobPtr {
    pub fn new(job: &mut Job<'_>) -> JobPtr {
        JobPtr(NonNull::from(job).cast())
    }

    /// # Safety
    ///
    /// The caller must hold the queue mutex.
    #[inline(always)]
    pub unsafe fn as_ref<'x>(self) -> &'x Job<'static> {
        // SAFETY: The submission protocol keeps the job alive while it is
        // reachable, and the mutex serializes access to its fields.
        unsafe { self.0.as_ref() }
    }

    /// # Safety
    ///
    /// The caller must hold the queue mutex, and must not let the returned
    /// borrow overlap another reference to the same job.
    #[inline(always)]
    pub unsafe fn as_mut<'x>(self) -> &'x mut Job<'static> {
        // SAFETY: As for `as_ref`, plus the caller's exclusivity promise.
        unsafe { &mut *self.0.as_ptr() }
    }
}

// SAFETY: `!Send` on raw pointers is a lint, not a safety property, for this
// type: a job moves between threads only through the queue, and every access
// is serialized by the queue mutex (or by the exclusive claim a serial run
// holds).
unsafe impl Send for JobPtr {}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use super::*;
    use crate::semaphore::Semaphore;
    use crate::thread_pool::ThreadPool;

    static POOL: ThreadPool = ThreadPool::new();

    fn nop_body(_ctx: *mut (), _min: i32, _extent: i32, _closure: *mut u8) -> i32 {
        0
    }

    #[test]
    fn group_ids_are_fresh() {
        let a = GroupId::next();
        let b = GroupId::next();
        assert_ne!(a, b);
        assert_ne!(a, GroupId::UNGROUPED);
    }

    #[test]
    fn running_tracks_extent_and_workers() {
        let task = ParallelTask::new(nop_body, 0, 1, std::ptr::null_mut());
        let mut job = Job::from_task(&task, std::ptr::null_mut());

        assert!(job.running());
        job.extent = 0;
        assert!(!job.running());
        job.active_workers = 1;
        assert!(job.running());
    }

    #[test]
    fn make_runnable_holds_partial_acquisitions() {
        static FIRST: Semaphore = Semaphore::new(&POOL, 1);
        static SECOND: Semaphore = Semaphore::new(&POOL, 0);

        let semaphores = [
            SemaphoreAcquire::new(&FIRST, 1),
            SemaphoreAcquire::new(&SECOND, 1),
        ];
        let task = ParallelTask::new(nop_body, 0, 2, std::ptr::null_mut()).with_semaphores(&semaphores);
        let mut job = Job::from_task(&task, std::ptr::null_mut());

        // The first precondition is taken and kept; the second is missing.
        assert!(!job.make_runnable());
        assert_eq!(FIRST.value(), 0);
        assert_eq!(job.next_semaphore, 1);

        // Supplying the second lets the claim complete, and the cursor
        // resets for the following iteration.
        SECOND.release(1);
        assert!(job.make_runnable());
        assert_eq!(job.next_semaphore, 0);
        assert_eq!(SECOND.value(), 0);
    }
}
