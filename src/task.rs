//! The task descriptor and dispatch boundary shared with compiled pipelines.
//!
//! A compiled pipeline knows nothing about this crate's types. It hands the
//! pool plain function pointers plus an opaque closure pointer, and receives
//! `i32` status codes back: zero for success, anything else to abort the
//! pipeline with that code. [`ParallelTask`] is the descriptor a pipeline
//! fills in for each task of a task group, and [`Dispatch`] is the small table
//! of entrypoints through which claimed iterations are actually invoked, so
//! that an embedding program can interpose on them.

use crate::semaphore::SemaphoreAcquire;

// -----------------------------------------------------------------------------
// Entrypoint signatures

/// A flat loop body: runs the single iteration `index`.
pub type TaskFn = fn(ctx: *mut (), index: i32, closure: *mut u8) -> i32;

/// A loop-task body: runs the iterations `[min, min + extent)` in one call.
pub type LoopTaskFn = fn(ctx: *mut (), min: i32, extent: i32, closure: *mut u8) -> i32;

/// Dispatches one iteration of a flat loop body.
pub type DoTaskFn = fn(ctx: *mut (), f: TaskFn, index: i32, closure: *mut u8) -> i32;

/// Dispatches a batch of iterations of a loop-task body.
pub type DoLoopTaskFn = fn(ctx: *mut (), f: LoopTaskFn, min: i32, extent: i32, closure: *mut u8) -> i32;

/// A whole-entry replacement for [`ThreadPool::par_for`].
///
/// [`ThreadPool::par_for`]: crate::ThreadPool::par_for
pub type DoParForFn = fn(ctx: *mut (), f: TaskFn, min: i32, size: i32, closure: *mut u8) -> i32;

/// A whole-entry replacement for [`ThreadPool::parallel_tasks`].
///
/// [`ThreadPool::parallel_tasks`]: crate::ThreadPool::parallel_tasks
pub type DoParallelTasksFn = for<'a> fn(ctx: *mut (), tasks: &'a [ParallelTask<'a>]) -> i32;

/// Exit status recorded for an iteration whose body panicked instead of
/// returning.
pub const PANIC_STATUS: i32 = i32::MIN;

/// The default single-iteration entrypoint: invoke the body directly.
#[inline(always)]
pub fn do_task(ctx: *mut (), f: TaskFn, index: i32, closure: *mut u8) -> i32 {
    f(ctx, index, closure)
}

/// The default loop entrypoint: invoke the body directly.
#[inline(always)]
pub fn do_loop_task(ctx: *mut (), f: LoopTaskFn, min: i32, extent: i32, closure: *mut u8) -> i32 {
    f(ctx, min, extent, closure)
}

// -----------------------------------------------------------------------------
// Dispatch table

/// The entrypoints the dispatch loop calls to run claimed iterations.
///
/// The table is stamped onto each job when it is enqueued, so replacing it
/// (via [`ThreadPool::set_dispatch`]) affects subsequent submissions only.
///
/// [`ThreadPool::set_dispatch`]: crate::ThreadPool::set_dispatch
#[derive(Clone, Copy)]
pub struct Dispatch {
    pub do_task: DoTaskFn,
    pub do_loop_task: DoLoopTaskFn,
}

impl Dispatch {
    /// The default table: both entrypoints invoke the body directly.
    pub const DEFAULT: Dispatch = Dispatch {
        do_task,
        do_loop_task,
    };
}

impl Default for Dispatch {
    fn default() -> Dispatch {
        Dispatch::DEFAULT
    }
}

// -----------------------------------------------------------------------------
// Task descriptor

/// Describes one parallel task of a task-group submission.
///
/// The descriptor is copied into the pool's internal job record at enqueue
/// time; the pool mutates its copy as iterations are claimed and never touches
/// the original again.
#[derive(Clone, Copy)]
pub struct ParallelTask<'a> {
    /// The loop body, called with sub-ranges of `[min, min + extent)`.
    pub body: LoopTaskFn,
    /// Opaque pointer passed through to the body.
    pub closure: *mut u8,
    /// First iteration index.
    pub min: i32,
    /// Number of iterations.
    pub extent: i32,
    /// Preconditions acquired, in order, before each iteration may run.
    pub semaphores: &'a [SemaphoreAcquire<'a>],
    /// Minimum number of concurrent workers the task needs to make forward
    /// progress. Only consulted for blocking tasks.
    pub min_threads: i32,
    /// Iterations must run one at a time, in increasing order.
    pub serial: bool,
    /// The task may suspend on a semaphore it does not itself signal.
    pub may_block: bool,
    /// Diagnostic label.
    pub name: Option<&'a str>,
}

impl<'a> ParallelTask<'a> {
    /// A plain data-parallel task over `[min, min + extent)` with no
    /// preconditions.
    pub fn new(body: LoopTaskFn, min: i32, extent: i32, closure: *mut u8) -> ParallelTask<'a> {
        ParallelTask {
            body,
            closure,
            min,
            extent,
            semaphores: &[],
            min_threads: 1,
            serial: false,
            may_block: false,
            name: None,
        }
    }

    /// Marks the task serial: one iteration at a time, in order.
    pub fn run_serially(mut self) -> ParallelTask<'a> {
        self.serial = true;
        self
    }

    /// Marks the task as one that may block inside its body, and therefore
    /// must not be picked up by threads that cannot afford to be trapped
    /// behind it.
    pub fn blocking(mut self) -> ParallelTask<'a> {
        self.may_block = true;
        self
    }

    /// Declares the concurrency the task needs to make forward progress.
    pub fn with_min_threads(mut self, min_threads: i32) -> ParallelTask<'a> {
        self.min_threads = min_threads;
        self
    }

    /// Attaches semaphore preconditions, acquired in order per iteration.
    pub fn with_semaphores(mut self, semaphores: &'a [SemaphoreAcquire<'a>]) -> ParallelTask<'a> {
        self.semaphores = semaphores;
        self
    }

    /// Attaches a diagnostic label, carried into trace logging.
    pub fn named(mut self, name: &'a str) -> ParallelTask<'a> {
        self.name = Some(name);
        self
    }
}

// -----------------------------------------------------------------------------
// Closure adapter

/// The flat-loop body behind [`ThreadPool::for_each`]: recovers the typed
/// closure from the erased pointer and runs it for one index.
///
/// [`ThreadPool::for_each`]: crate::ThreadPool::for_each
pub(crate) fn closure_trampoline<F>(_ctx: *mut (), index: i32, closure: *mut u8) -> i32
where
    F: Fn(i32) -> i32 + Sync,
{
    // SAFETY: `closure` was produced from an `&F` by `ThreadPool::for_each`,
    // which does not return until the loop has finished, so the borrow is
    // alive for every invocation. `F: Sync` makes the shared reference sound
    // across worker threads.
    let f = unsafe { &*(closure as *const F) };
    f(index)
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use super::*;

    fn nop_body(_ctx: *mut (), _min: i32, _extent: i32, _closure: *mut u8) -> i32 {
        0
    }

    #[test]
    fn descriptor_defaults() {
        let task = ParallelTask::new(nop_body, 3, 7, std::ptr::null_mut());

        assert_eq!(task.min, 3);
        assert_eq!(task.extent, 7);
        assert_eq!(task.min_threads, 1);
        assert!(task.semaphores.is_empty());
        assert!(!task.serial);
        assert!(!task.may_block);
        assert!(task.name.is_none());
    }

    #[test]
    fn builder_setters() {
        let task = ParallelTask::new(nop_body, 0, 4, std::ptr::null_mut())
            .run_serially()
            .blocking()
            .with_min_threads(3)
            .named("producer");

        assert!(task.serial);
        assert!(task.may_block);
        assert_eq!(task.min_threads, 3);
        assert_eq!(task.name, Some("producer"));
    }

    #[test]
    fn default_dispatch_invokes_directly() {
        fn flat(_ctx: *mut (), index: i32, _closure: *mut u8) -> i32 {
            index * 2
        }

        assert_eq!(do_task(std::ptr::null_mut(), flat, 21, std::ptr::null_mut()), 42);
        assert_eq!(do_loop_task(std::ptr::null_mut(), nop_body, 0, 10, std::ptr::null_mut()), 0);
    }
}
