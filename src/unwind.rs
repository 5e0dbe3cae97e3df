//! Unwinding recovery utilities taken from rayon.

use std::panic::AssertUnwindSafe;
use std::panic::catch_unwind;
use std::thread::Result;

/// Executes `f` and captures any panic, translating that panic into an `Err`
/// result. The pool runs task bodies it does not control; a body that unwinds
/// is demoted to a failure status rather than being allowed to tear through
/// the dispatch loop (and poison the queue mutex on its way out).
#[inline(always)]
pub fn halt_unwinding<F, R>(func: F) -> Result<R>
where
    F: FnOnce() -> R,
{
    catch_unwind(AssertUnwindSafe(func))
}
