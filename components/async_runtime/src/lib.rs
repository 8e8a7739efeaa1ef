//! Async runtime for deferred computations.
//!
//! This crate provides:
//! - Event loop with task, microtask and timer queues over a virtual clock
//! - A promise engine whose continuations run through a pluggable scheduler
//!
//! # Overview
//!
//! - [`EventLoop`] - Main event loop coordinating task execution
//! - [`Promise`] - Deferred computation with `then`/`catch`/`finally`
//! - [`Scheduler`] - The deferral primitive promises depend on
//! - [`RuntimeConfig`] - Dispatch mode and turn limit
//!
//! # Examples
//!
//! ## Event Loop Usage
//!
//! ```
//! use async_runtime::{EventLoop, Task};
//! use core_types::Value;
//!
//! let mut event_loop = EventLoop::new();
//! event_loop.enqueue_task(Task::new(|| Ok(Value::Undefined)));
//! event_loop.run_until_done().unwrap();
//! ```
//!
//! ## Promise Usage
//!
//! ```
//! use async_runtime::{EventLoop, Promise, PromiseState, Task};
//! use core_types::Value;
//!
//! let mut event_loop = EventLoop::new();
//! let scheduler = event_loop.scheduler();
//! let handle = event_loop.handle();
//!
//! let promise = Promise::new(&scheduler, move |resolve, _reject| {
//!     handle.set_timeout(100, Task::new(move || {
//!         resolve.call(Value::Smi(1));
//!         Ok(Value::Undefined)
//!     }));
//!     Ok(())
//! });
//!
//! event_loop.advance_by(99).unwrap();
//! assert_eq!(promise.state(), PromiseState::Pending);
//!
//! event_loop.advance_by(1).unwrap();
//! assert_eq!(promise.value(), Some(Value::Smi(1)));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod event_loop;
pub mod promise;
pub mod scheduler;
pub mod task_queue;

// Re-export main types at crate root
pub use config::{DispatchMode, RuntimeConfig};
pub use error::{RuntimeError, RuntimeResult};
pub use event_loop::{EventLoop, EventLoopHandle};
pub use promise::{
    Finalizer, Handler, Promise, PromiseState, RejectFn, Resolution, ResolveFn, Thenable,
};
pub use scheduler::{Job, Scheduler};
pub use task_queue::{MicroTask, MicrotaskQueue, Task, TaskQueue, TimerId, TimerQueue};
