//! This module contains the pool, its work queue, and the dispatch loop
//! shared by worker threads and owners.
//!
//! The whole scheduler hangs off one mutex. Every field of the queue and of
//! every linked job is guarded by it; task bodies run with it released, and
//! threads park on one of three condition variables paired with it. Workers
//! sleep on the A-team or B-team channel (the split exists so a small
//! submission does not wake the whole pool), and owners (threads that
//! submitted work and are waiting for it) sleep on a channel of their own so
//! a finishing job can wake exactly the threads that care.

use std::env;
use std::mem;
use std::ptr;
use std::sync::Condvar;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::thread;

use tracing::debug;
use tracing::error;
use tracing::trace;

use crate::job::GroupId;
use crate::job::Job;
use crate::job::JobFn;
use crate::job::JobPtr;
use crate::job::acquire_preconditions;
use crate::semaphore::SemaphoreAcquire;
use crate::task::Dispatch;
use crate::task::DoParForFn;
use crate::task::DoParallelTasksFn;
use crate::task::PANIC_STATUS;
use crate::task::ParallelTask;
use crate::task::TaskFn;
use crate::task::closure_trampoline;
use crate::unwind;

// -----------------------------------------------------------------------------
// Limits and defaults

/// Hard cap on pool-spawned worker threads.
pub const MAX_THREADS: usize = 256;

fn clamp_num_threads(threads: i32) -> i32 {
    threads.clamp(1, MAX_THREADS as i32)
}

/// The desired worker count when the embedding program has not chosen one:
/// `HL_NUM_THREADS` (or its legacy spelling `HL_NUMTHREADS`), falling back to
/// the host CPU count. Unparseable values count as absent.
fn default_desired_threads() -> i32 {
    let configured = env::var("HL_NUM_THREADS")
        .or_else(|_| env::var("HL_NUMTHREADS"))
        .ok()
        .and_then(|raw| raw.trim().parse::<i32>().ok());
    match configured {
        Some(threads) => threads,
        None => thread::available_parallelism()
            .map(|count| count.get() as i32)
            .unwrap_or(1),
    }
}

// -----------------------------------------------------------------------------
// Work queue state

struct WorkQueue {
    /// LIFO stack of linked jobs; the most recently enqueued is at the end.
    jobs: Vec<JobPtr>,
    /// Handles for every worker spawned so far, joined at shutdown.
    threads: Vec<thread::JoinHandle<()>>,
    /// The number of threads we want doing work.
    desired_threads_working: i32,
    /// Current and target size of the A team. Workers in excess of the target
    /// demote themselves to the B channel when they go to sleep.
    a_team_size: i32,
    target_a_team_size: i32,
    /// Sleeping-thread counts. Over-estimates: a waking thread decrements
    /// only once it has reacquired the mutex. Every consumer of these counts
    /// re-checks runnability, so the slack is harmless.
    workers_sleeping: i32,
    owners_sleeping: i32,
    /// Entrypoint table stamped onto each job at enqueue.
    dispatch: Dispatch,
    /// Whole-entry replacements installed by the embedding program.
    par_for_override: Option<DoParForFn>,
    parallel_tasks_override: Option<DoParallelTasksFn>,
    shutdown: bool,
    initialized: bool,
}

impl WorkQueue {
    /// First-enqueue initialization. Runs again after a shutdown; must leave
    /// the queue as if freshly constructed (apart from a desired thread count
    /// chosen before the pool ever span up, which is preserved).
    fn initialize(&mut self) {
        self.shutdown = false;
        self.jobs.clear();
        if self.desired_threads_working == 0 {
            self.desired_threads_working = default_desired_threads();
        }
        self.desired_threads_working = clamp_num_threads(self.desired_threads_working);
        self.a_team_size = 0;
        self.target_a_team_size = 0;
        self.workers_sleeping = 0;
        self.owners_sleeping = 0;
        self.initialized = true;
        debug!(desired = self.desired_threads_working, "initialized work queue");
    }
}

// -----------------------------------------------------------------------------
// Thread pool

/// A cooperative thread pool executing parallel loops and task graphs on
/// behalf of compiled pipelines.
///
/// Pools are const-constructed and spawn no threads until work first arrives:
///
/// ```rust,no_run
/// use tutti::ThreadPool;
///
/// static POOL: ThreadPool = ThreadPool::new();
///
/// fn main() {
///     let status = POOL.for_each(0, 1024, |_row| 0);
///     assert_eq!(status, 0);
///     POOL.shutdown();
/// }
/// ```
///
/// The submitting thread never idles: it enters the same dispatch loop the
/// workers run and assists with any runnable work it is allowed to touch
/// until its own submission completes. That is what makes deeply nested
/// submissions safe on a pool of any size.
pub struct ThreadPool {
    state: Mutex<WorkQueue>,
    /// Wake channels. Any code that may invalidate a reason a thread went to
    /// sleep must broadcast the matching channel.
    wake_a_team: Condvar,
    wake_b_team: Condvar,
    wake_owners: Condvar,
}

#[allow(clippy::new_without_default)]
impl ThreadPool {
    /// Creates a new thread pool. No threads run until work is submitted.
    pub const fn new() -> ThreadPool {
        ThreadPool {
            state: Mutex::new(WorkQueue {
                jobs: Vec::new(),
                threads: Vec::new(),
                desired_threads_working: 0,
                a_team_size: 0,
                target_a_team_size: 0,
                workers_sleeping: 0,
                owners_sleeping: 0,
                dispatch: Dispatch::DEFAULT,
                par_for_override: None,
                parallel_tasks_override: None,
                shutdown: false,
                initialized: false,
            }),
            wake_a_team: Condvar::new(),
            wake_b_team: Condvar::new(),
            wake_owners: Condvar::new(),
        }
    }

    /// Runs `f` for every index in `[min, min + size)`, potentially in
    /// parallel, blocking until the loop completes. Returns the last non-zero
    /// status any iteration reported, or zero.
    ///
    /// The calling thread participates in the work. Nested calls from inside
    /// an iteration are fine.
    pub fn par_for(
        &'static self,
        ctx: *mut (),
        f: TaskFn,
        min: i32,
        size: i32,
        closure: *mut u8,
    ) -> i32 {
        if size <= 0 {
            return 0;
        }

        let mut state = self.state.lock().unwrap();
        if let Some(custom) = state.par_for_override {
            drop(state);
            return custom(ctx, f, min, size, closure);
        }

        let mut job = Job::flat(f, min, size, closure, ctx);
        let job_ptr = JobPtr::new(&mut job);
        self.enqueue_locked(&mut state, &[job_ptr]);
        let state = self.dispatch_loop(state, Some(job_ptr));
        // SAFETY: The queue mutex is held and the job has stopped running, so
        // no worker will touch it again.
        let exit_status = unsafe { job_ptr.as_ref() }.exit_status;
        drop(state);
        exit_status
    }

    /// Submits a group of tasks and blocks until every one of them completes.
    /// Tasks with a non-positive extent are skipped. Returns the last
    /// non-zero status observed across the group, or zero.
    ///
    /// The calling thread participates: while any task of the group still
    /// runs, it executes sibling iterations and any non-blocking work in the
    /// pool.
    pub fn parallel_tasks(&'static self, ctx: *mut (), tasks: &[ParallelTask<'_>]) -> i32 {
        let state = self.state.lock().unwrap();
        if let Some(custom) = state.parallel_tasks_override {
            drop(state);
            return custom(ctx, tasks);
        }
        drop(state);

        // Scratch jobs live for exactly this call; the queue only ever holds
        // borrowed views of them.
        let mut jobs: Vec<Job<'_>> = tasks
            .iter()
            .filter(|task| task.extent > 0)
            .map(|task| Job::from_task(task, ctx))
            .collect();
        if jobs.is_empty() {
            return 0;
        }
        let job_ptrs: Vec<JobPtr> = jobs.iter_mut().map(JobPtr::new).collect();

        let mut state = self.state.lock().unwrap();
        self.enqueue_locked(&mut state, &job_ptrs);
        let mut exit_status = 0;
        for &job_ptr in &job_ptrs {
            // Join order does not matter: whichever job we wait on, the
            // dispatch loop happily assists its siblings too.
            state = self.dispatch_loop(state, Some(job_ptr));
            // SAFETY: The queue mutex is held and this job has finished.
            let status = unsafe { job_ptr.as_ref() }.exit_status;
            if status != 0 {
                exit_status = status;
            }
        }
        drop(state);
        exit_status
    }

    /// Runs `body` for every index in `[min, min + extent)`, potentially in
    /// parallel. A convenience front end over [`ThreadPool::par_for`] for
    /// Rust callers; a body that panics is reported as [`PANIC_STATUS`].
    pub fn for_each<F>(&'static self, min: i32, extent: i32, body: F) -> i32
    where
        F: Fn(i32) -> i32 + Sync,
    {
        let closure = &body as *const F as *mut u8;
        self.par_for(ptr::null_mut(), closure_trampoline::<F>, min, extent, closure)
    }

    /// Sets the number of threads the pool aims to keep working, clamped into
    /// `[1, MAX_THREADS]`. Zero selects the environment-derived default.
    /// Returns the previous value.
    ///
    /// # Panics
    ///
    /// Panics if `n` is negative.
    pub fn set_num_threads(&self, n: i32) -> i32 {
        assert!(n >= 0, "set_num_threads: thread count must be non-negative");
        let mut state = self.state.lock().unwrap();
        let n = if n == 0 { default_desired_threads() } else { n };
        let previous = state.desired_threads_working;
        state.desired_threads_working = clamp_num_threads(n);
        previous
    }

    /// Replaces the entrypoint table stamped onto subsequently enqueued jobs
    /// and returns the previous table. Jobs already in flight keep the table
    /// they were enqueued with.
    pub fn set_dispatch(&self, dispatch: Dispatch) -> Dispatch {
        let mut state = self.state.lock().unwrap();
        mem::replace(&mut state.dispatch, dispatch)
    }

    /// Installs (or clears) a whole-entry replacement for
    /// [`ThreadPool::par_for`]. While set, `par_for` hands its arguments to
    /// the replacement without touching the queue.
    pub fn set_par_for_override(&self, f: Option<DoParForFn>) {
        self.state.lock().unwrap().par_for_override = f;
    }

    /// Installs (or clears) a whole-entry replacement for
    /// [`ThreadPool::parallel_tasks`].
    pub fn set_parallel_tasks_override(&self, f: Option<DoParallelTasksFn>) {
        self.state.lock().unwrap().parallel_tasks_override = f;
    }

    /// Tells every worker the party is over, joins them, and returns the pool
    /// to its uninitialized state. A later submission starts it back up. Must
    /// not be called while any submission is still in flight. Idempotent when
    /// the pool is not running.
    pub fn shutdown(&self) {
        let mut state = self.state.lock().unwrap();
        if !state.initialized {
            return;
        }
        debug!("shutting down thread pool");
        state.shutdown = true;
        self.wake_a_team.notify_all();
        self.wake_b_team.notify_all();
        self.wake_owners.notify_all();
        let threads = mem::take(&mut state.threads);
        drop(state);

        for handle in threads {
            let _ = handle.join();
        }

        self.state.lock().unwrap().initialized = false;
    }

    /// Called by a semaphore release that brought the count back from zero: a
    /// formerly un-runnable job may be runnable now. Taking the lock orders
    /// the broadcast after any in-flight readiness check, so a waiter cannot
    /// miss it between checking and parking.
    pub(crate) fn semaphore_released(&self) {
        let _state = self.state.lock().unwrap();
        self.wake_a_team.notify_all();
        self.wake_owners.notify_all();
    }
}

// -----------------------------------------------------------------------------
// Enqueue protocol

impl ThreadPool {
    /// Links a batch of jobs onto the stack, spawning and waking workers as
    /// the batch requires. Called with the queue mutex held.
    fn enqueue_locked(&'static self, state: &mut WorkQueue, jobs: &[JobPtr]) {
        if !state.initialized {
            state.initialize();
        }

        // Size up the batch. Blocking tasks are assumed to need their
        // declared concurrency simultaneously; non-blocking tasks can be
        // picked at by anyone, including stalled owners of unrelated
        // submissions.
        let group = GroupId::next();
        let mut min_threads: i32 = 0;
        // The submitting thread contributes, so start one short.
        let mut workers_to_wake: i32 = -1;
        let mut stealable_jobs = false;
        for &job_ptr in jobs {
            // SAFETY: The queue mutex is held, and the batch is not linked
            // yet, so no other thread can reach these jobs.
            let job = unsafe { job_ptr.as_mut() };
            job.group = group;
            job.dispatch = state.dispatch;
            if job.min_threads > MAX_THREADS as i32 {
                // An unsatisfiable requirement must still make progress once
                // the full complement of workers is asleep.
                job.min_threads = MAX_THREADS as i32;
            }
            if job.may_block {
                min_threads = min_threads.saturating_add(job.min_threads);
            } else {
                stealable_jobs = true;
            }
            workers_to_wake =
                workers_to_wake.saturating_add(if job.serial { 1 } else { job.extent });
        }

        // Spawn workers if the desired count grew, or if this batch needs
        // more threads than exist in order to complete at all.
        while ((state.threads.len() as i32) < state.desired_threads_working - 1
            || (state.threads.len() as i32) < min_threads - 1)
            && state.threads.len() < MAX_THREADS
        {
            let index = state.threads.len();
            debug!(worker = index, "spawning worker thread");
            state.a_team_size += 1;
            let pool: &'static ThreadPool = self;
            let handle = thread::Builder::new()
                .name(format!("tutti worker {index}"))
                .spawn(move || pool.worker_main())
                .unwrap();
            state.threads.push(handle);
        }

        // Link the batch in reverse submission order, leaving the first task
        // on top of the stack.
        for &job_ptr in jobs.iter().rev() {
            state.jobs.push(job_ptr);
        }

        // Decide how many workers to wake. With nested parallelism in flight
        // there is no cheap way to tell who can help whom, so wake everyone.
        let threads_created = state.threads.len() as i32;
        let nested_parallelism =
            state.owners_sleeping > 0 || state.workers_sleeping < threads_created;
        if nested_parallelism || workers_to_wake > state.workers_sleeping {
            state.target_a_team_size = threads_created;
        } else {
            state.target_a_team_size = workers_to_wake;
        }
        trace!(
            jobs = jobs.len(),
            workers_to_wake,
            min_threads,
            target_a_team_size = state.target_a_team_size,
            "enqueued batch"
        );
        self.wake_a_team.notify_all();
        if state.target_a_team_size > state.a_team_size {
            self.wake_b_team.notify_all();
            if stealable_jobs {
                // Sleeping owners may steal the non-blocking part of the
                // batch.
                self.wake_owners.notify_all();
            }
        }
    }
}

// -----------------------------------------------------------------------------
// Dispatch loop

impl ThreadPool {
    /// The body of a pool-spawned worker: run the dispatch loop until told to
    /// shut down.
    fn worker_main(&'static self) {
        trace!("worker started");
        let state = self.state.lock().unwrap();
        let state = self.dispatch_loop(state, None);
        drop(state);
        trace!("worker exiting");
    }

    /// The dispatch loop shared by workers and owners. An owner passes the
    /// job it is waiting on and loops until that job completes; a worker
    /// passes `None` and loops until shutdown. Entered and exited with the
    /// queue mutex held.
    fn dispatch_loop(
        &'static self,
        mut state: MutexGuard<'static, WorkQueue>,
        owned_job: Option<JobPtr>,
    ) -> MutexGuard<'static, WorkQueue> {
        // The group our owned job belongs to, read once up front. An owner
        // may only assist its own sibling group or steal non-blocking work;
        // anything else could trap it behind an unrelated blocking job.
        let owned_group = owned_job.map(|job_ptr| {
            // SAFETY: The queue mutex is held.
            unsafe { job_ptr.as_ref() }.group
        });

        loop {
            let keep_going = match owned_job {
                // SAFETY: The queue mutex is held, and the owner's job lives
                // until this call returns.
                Some(job_ptr) => unsafe { job_ptr.as_ref() }.running(),
                None => !state.shutdown,
            };
            if !keep_going {
                break;
            }

            // Find something to run, preferring the top of the stack. A job
            // is only eligible when enough threads could currently rally to
            // it: a blocking job that declares it needs k threads is never
            // started unless k threads could actually assist, so a worker
            // never commits to work that would then wait for help that
            // cannot arrive.
            let mut found = None;
            for index in (0..state.jobs.len()).rev() {
                let job_ptr = state.jobs[index];
                // SAFETY: The queue mutex is held and no other borrow of
                // this job is live.
                let job = unsafe { job_ptr.as_mut() };

                let mut threads_that_could_assist = 1 + state.workers_sleeping;
                if !job.may_block {
                    // Sleeping owners can steal non-blocking work.
                    threads_that_could_assist += state.owners_sleeping;
                } else if job.owner_is_sleeping {
                    // This job's own owner will help once woken.
                    threads_that_could_assist += 1;
                }
                if job.min_threads > threads_that_could_assist {
                    continue;
                }
                if let Some(owned_group) = owned_group {
                    if job.may_block && job.group != owned_group {
                        continue;
                    }
                }
                // At most one worker inside a serial job.
                if job.serial && job.active_workers != 0 {
                    continue;
                }
                if !job.make_runnable() {
                    continue;
                }
                found = Some(index);
                break;
            }

            let Some(index) = found else {
                // Nothing runnable; park on the appropriate channel and
                // re-scan on wakeup.
                match owned_job {
                    Some(job_ptr) => {
                        state.owners_sleeping += 1;
                        // SAFETY: The queue mutex is held.
                        unsafe { job_ptr.as_mut() }.owner_is_sleeping = true;
                        trace!("owner sleeping");
                        state = self.wake_owners.wait(state).unwrap();
                        // SAFETY: The queue mutex is held (reacquired by the
                        // wait).
                        unsafe { job_ptr.as_mut() }.owner_is_sleeping = false;
                        state.owners_sleeping -= 1;
                    }
                    None => {
                        state.workers_sleeping += 1;
                        if state.a_team_size > state.target_a_team_size {
                            // Excess A-team worker; demote to the B team.
                            state.a_team_size -= 1;
                            trace!("B-team worker sleeping");
                            state = self.wake_b_team.wait(state).unwrap();
                            state.a_team_size += 1;
                        } else {
                            trace!("A-team worker sleeping");
                            state = self.wake_a_team.wait(state).unwrap();
                        }
                        state.workers_sleeping -= 1;
                    }
                }
                continue;
            };

            let job_ptr = state.jobs[index];
            // The owner must see the job as in progress even while no
            // iterations of it remain linked.
            // SAFETY: The queue mutex is held.
            unsafe { job_ptr.as_mut() }.active_workers += 1;

            let serial = unsafe { job_ptr.as_ref() }.serial;
            let result;
            if serial {
                // Serial jobs run whole batches off-queue. Copy the claim
                // state out, work on the copy with the lock released, and
                // write progress back once relocked; the linked job is never
                // touched from outside the mutex.
                state.jobs.remove(index);
                let mut run = {
                    // SAFETY: The queue mutex is held.
                    let job = unsafe { job_ptr.as_ref() };
                    SerialClaim {
                        fun: job.fun,
                        ctx: job.ctx,
                        closure: job.closure,
                        dispatch: job.dispatch,
                        min: job.min,
                        extent: job.extent,
                        next_semaphore: job.next_semaphore,
                        semaphores: job.semaphores,
                        name: job.name,
                    }
                };
                drop(state);
                result = run.execute();
                state = self.state.lock().unwrap();
                // SAFETY: The queue mutex is held.
                let job = unsafe { job_ptr.as_mut() };
                job.min = run.min;
                job.extent = run.extent;
                job.next_semaphore = run.next_semaphore;
                if job.extent > 0 {
                    // A precondition ran dry or a batch failed; put the
                    // remainder back on top of the stack.
                    state.jobs.push(job_ptr);
                }
            } else {
                // Claim one iteration, copying out what running it needs.
                let claim = {
                    // SAFETY: The queue mutex is held.
                    let job = unsafe { job_ptr.as_mut() };
                    let claim = IterationClaim {
                        fun: job.fun,
                        ctx: job.ctx,
                        closure: job.closure,
                        dispatch: job.dispatch,
                        index: job.min,
                        name: job.name,
                    };
                    job.min += 1;
                    job.extent -= 1;
                    if job.extent == 0 {
                        state.jobs.remove(index);
                    }
                    claim
                };
                drop(state);
                result = claim.execute();
                state = self.state.lock().unwrap();
            }

            // SAFETY: The queue mutex is held.
            let job = unsafe { job_ptr.as_mut() };
            if result != 0 {
                job.exit_status = result;
            }
            job.active_workers -= 1;
            if !job.running() && job.owner_is_sleeping {
                // The job just finished; its owner is the only thread that
                // cares.
                self.wake_owners.notify_all();
            }
        }

        state
    }
}

// -----------------------------------------------------------------------------
// Claimed work

/// One claimed iteration of a data-parallel job, copied out of the queue so
/// it can run with the mutex released.
struct IterationClaim {
    fun: JobFn,
    ctx: *mut (),
    closure: *mut u8,
    dispatch: Dispatch,
    index: i32,
    name: Option<&'static str>,
}

impl IterationClaim {
    fn execute(&self) -> i32 {
        let outcome = unwind::halt_unwinding(|| match self.fun {
            JobFn::Flat(f) => (self.dispatch.do_task)(self.ctx, f, self.index, self.closure),
            JobFn::Loop(f) => (self.dispatch.do_loop_task)(self.ctx, f, self.index, 1, self.closure),
        });
        match outcome {
            Ok(status) => status,
            Err(_) => {
                error!(name = ?self.name, index = self.index, "task body panicked");
                PANIC_STATUS
            }
        }
    }
}

/// The off-queue claim state of a serial job. The claiming thread owns the
/// job outright until it writes its progress back, so batches can be claimed
/// and run without the mutex.
struct SerialClaim {
    fun: JobFn,
    ctx: *mut (),
    closure: *mut u8,
    dispatch: Dispatch,
    min: i32,
    extent: i32,
    next_semaphore: usize,
    semaphores: &'static [SemaphoreAcquire<'static>],
    name: Option<&'static str>,
}

impl SerialClaim {
    /// Runs batches until a batch fails, the iterations are exhausted, or the
    /// preconditions run dry: claim as many contiguous iterations as the
    /// semaphores allow, run them in one call, repeat.
    fn execute(&mut self) -> i32 {
        let mut result = 0;
        // The iteration claimed while the job was selected is already paid
        // for.
        let mut iters: i32 = 1;
        while result == 0 {
            while self.extent > iters
                && acquire_preconditions(self.semaphores, &mut self.next_semaphore)
            {
                iters += 1;
            }
            if iters == 0 {
                break;
            }
            let fun = self.fun;
            let ctx = self.ctx;
            let closure = self.closure;
            let dispatch = self.dispatch;
            let min = self.min;
            let outcome = unwind::halt_unwinding(|| match fun {
                JobFn::Loop(f) => (dispatch.do_loop_task)(ctx, f, min, iters, closure),
                // Flat bodies only ever arrive via `par_for`, which never
                // submits serial work; run them an index at a time anyway.
                JobFn::Flat(f) => {
                    let mut status = 0;
                    for index in min..min + iters {
                        status = (dispatch.do_task)(ctx, f, index, closure);
                        if status != 0 {
                            break;
                        }
                    }
                    status
                }
            });
            result = match outcome {
                Ok(status) => status,
                Err(_) => {
                    error!(name = ?self.name, "serial task body panicked");
                    PANIC_STATUS
                }
            };
            self.min += iters;
            self.extent -= iters;
            iters = 0;
        }
        result
    }
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use std::ptr::null_mut;
    use std::sync::atomic::AtomicI64;
    use std::sync::atomic::Ordering;

    use super::*;

    #[test]
    fn set_num_threads_returns_previous() {
        static POOL: ThreadPool = ThreadPool::new();

        assert_eq!(POOL.set_num_threads(3), 0);
        assert_eq!(POOL.set_num_threads(5), 3);
        // Zero restores the environment-derived default.
        assert_eq!(POOL.set_num_threads(0), 5);
        let expected = clamp_num_threads(default_desired_threads());
        assert_eq!(POOL.set_num_threads(1), expected);
    }

    #[test]
    fn set_num_threads_clamps() {
        static POOL: ThreadPool = ThreadPool::new();

        POOL.set_num_threads(10_000);
        assert_eq!(POOL.set_num_threads(1), MAX_THREADS as i32);
    }

    #[test]
    fn par_for_empty_range_short_circuits() {
        static POOL: ThreadPool = ThreadPool::new();

        fn body(_ctx: *mut (), _index: i32, _closure: *mut u8) -> i32 {
            panic!("must not run");
        }

        assert_eq!(POOL.par_for(null_mut(), body, 0, 0, null_mut()), 0);
        assert_eq!(POOL.par_for(null_mut(), body, 5, -3, null_mut()), 0);
        // The queue was never touched, so there is nothing to shut down.
        POOL.shutdown();
    }

    #[test]
    fn shutdown_is_idempotent() {
        static POOL: ThreadPool = ThreadPool::new();

        POOL.shutdown();
        POOL.shutdown();

        // The pool spins back up after a real teardown cycle.
        assert_eq!(POOL.for_each(0, 8, |_| 0), 0);
        POOL.shutdown();
        POOL.shutdown();
        assert_eq!(POOL.for_each(0, 8, |_| 0), 0);
        POOL.shutdown();
    }

    #[test]
    fn for_each_covers_the_range() {
        static POOL: ThreadPool = ThreadPool::new();

        let sum = AtomicI64::new(0);
        let status = POOL.for_each(10, 100, |index| {
            sum.fetch_add(index as i64, Ordering::Relaxed);
            0
        });

        assert_eq!(status, 0);
        assert_eq!(sum.load(Ordering::Relaxed), (10..110).sum::<i64>());
        POOL.shutdown();
    }
}
