//! Two-party rendezvous execution.
//!
//! The kernel schedules steps strictly sequentially; the one exception is
//! [`concurrent_pair`], which runs two callables on separate threads held
//! at a shared barrier so both begin real work at approximately the same
//! instant. It is meant to be invoked from inside a single ordinary leaf
//! operation and has no other interaction with the executor.

use crate::error::OpsError;
use std::sync::Barrier;

/// Run `a` and `b` on separate threads, synchronized to start together, and
/// return both results. A thread that dies without producing a result fails
/// the pair loudly; an error from either callable propagates (A's first).
pub fn concurrent_pair<RA, RB>(
    a: impl FnOnce() -> Result<RA, OpsError> + Send,
    b: impl FnOnce() -> Result<RB, OpsError> + Send,
) -> Result<(RA, RB), OpsError>
where
    RA: Send,
    RB: Send,
{
    let barrier = Barrier::new(2);
    let barrier = &barrier;
    let (result_a, result_b) = std::thread::scope(|scope| {
        let thread_a = scope.spawn(move || {
            barrier.wait();
            a()
        });
        let thread_b = scope.spawn(move || {
            barrier.wait();
            b()
        });
        (thread_a.join(), thread_b.join())
    });

    let result_a =
        result_a.map_err(|_| OpsError::internal("no result received from thread A"))?;
    let result_b =
        result_b.map_err(|_| OpsError::internal("no result received from thread B"))?;
    Ok((result_a?, result_b?))
}
