//! A cooperative thread pool for compiled image-processing pipelines.
//!
//! Pipelines are compiled ahead of time to native code; at runtime they
//! discover CPU parallelism by handing this pool either a flat parallel loop
//! ([`ThreadPool::par_for`]) or a group of tasks that may recursively spawn
//! further parallel work and synchronize through counting semaphores
//! ([`ThreadPool::parallel_tasks`]). The pool side of that boundary is
//! deliberately dumb about pipelines: it sees plain function pointers, opaque
//! closure pointers, and `i32` status codes.
//!
//! What makes the scheduler interesting:
//!
//! - **Owners assist.** A thread that submits work does not park and wait; it
//!   runs the same dispatch loop as the workers, executing its own sibling
//!   tasks and any non-blocking work in the pool until its submission
//!   completes. Deeply nested submissions therefore cannot deadlock a pool of
//!   any size.
//! - **Readiness gating.** A task can declare semaphore preconditions and a
//!   minimum thread count. The dispatch loop never starts an iteration whose
//!   semaphores cannot all be taken right now, and never starts a blocking
//!   task unless enough threads could actually rally to it; that gate is
//!   what guarantees forward progress.
//! - **Throttled wakeups.** Workers sleep on one of two condition variables
//!   (the A and B teams) and owners on a third, so a small submission wakes a
//!   few threads rather than the whole pool, and a finishing job wakes only
//!   the threads that care.
//!
//! ```rust,no_run
//! use tutti::ThreadPool;
//!
//! static POOL: ThreadPool = ThreadPool::new();
//!
//! fn main() {
//!     // Shade 1080 rows, from wherever this thread happens to be.
//!     let status = POOL.for_each(0, 1080, |_row| 0);
//!     assert_eq!(status, 0);
//!     POOL.shutdown();
//! }
//! ```
//!
//! There is no async integration, no fairness across unrelated submissions,
//! no priorities, and no cancellation: completion is the only exit.

// -----------------------------------------------------------------------------
// Modules

mod job;
mod semaphore;
mod task;
mod thread_pool;
mod unwind;

// -----------------------------------------------------------------------------
// Top-level exports

pub use semaphore::Semaphore;
pub use semaphore::SemaphoreAcquire;
pub use task::Dispatch;
pub use task::DoLoopTaskFn;
pub use task::DoParForFn;
pub use task::DoParallelTasksFn;
pub use task::DoTaskFn;
pub use task::LoopTaskFn;
pub use task::PANIC_STATUS;
pub use task::ParallelTask;
pub use task::TaskFn;
pub use task::do_loop_task;
pub use task::do_task;
pub use thread_pool::MAX_THREADS;
pub use thread_pool::ThreadPool;
