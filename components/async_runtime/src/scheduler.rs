//! The deferral primitive promises depend on.
//!
//! A [`Scheduler`] accepts zero-argument jobs and runs them after the
//! current synchronous stack has unwound, in FIFO order. The event loop
//! provides one through [`EventLoopHandle`](crate::EventLoopHandle); hosts
//! with their own loop can implement the trait directly.

/// A deferred unit of work.
pub type Job = Box<dyn FnOnce()>;

/// Host-provided deferral primitive.
///
/// Implementations must never run `job` synchronously inside `defer`, and
/// must run jobs in the order they were deferred.
pub trait Scheduler {
    /// Queues `job` to run on a later turn.
    fn defer(&self, job: Job);
}
