//! Event loop implementation.
//!
//! This module provides the event loop that coordinates task, microtask and
//! timer execution, and the [`EventLoopHandle`] through which running code
//! (executors, handlers, timer callbacks) reaches the queues.

use crate::config::{DispatchMode, RuntimeConfig};
use crate::error::{RuntimeError, RuntimeResult};
use crate::scheduler::{Job, Scheduler};
use crate::task_queue::{MicroTask, MicrotaskQueue, Task, TaskQueue, TimerId, TimerQueue};
use core_types::{JsError, Value};
use std::cell::RefCell;
use std::rc::Rc;
use tracing::{debug, trace, warn};

#[derive(Debug, Default)]
struct LoopState {
    task_queue: TaskQueue,
    microtask_queue: MicrotaskQueue,
    timers: TimerQueue,
    /// Virtual clock in milliseconds
    now: u64,
    /// Set once the owning `EventLoop` is dropped; later work is discarded.
    closed: bool,
}

/// Counts jobs run by one drive call against the configured limit.
struct TurnBudget {
    limit: Option<usize>,
    used: usize,
}

impl TurnBudget {
    fn new(limit: Option<usize>) -> Self {
        Self { limit, used: 0 }
    }

    fn spend(&mut self) -> RuntimeResult<()> {
        if let Some(limit) = self.limit {
            if self.used >= limit {
                warn!(limit, "event loop turn limit reached");
                return Err(RuntimeError::TurnLimitExceeded { limit });
            }
        }
        self.used += 1;
        Ok(())
    }
}

fn finish(result: Result<Value, JsError>) -> RuntimeResult<()> {
    match result {
        Ok(_) => Ok(()),
        Err(error) => {
            warn!(%error, "task failed");
            Err(RuntimeError::TaskFailed(error))
        }
    }
}

/// Shared access to an event loop's queues.
///
/// Handles are cheap to clone and can be captured by executors and
/// callbacks. The handle is also the [`Scheduler`] given to promises.
#[derive(Debug, Clone)]
pub struct EventLoopHandle {
    state: Rc<RefCell<LoopState>>,
    dispatch: DispatchMode,
}

impl EventLoopHandle {
    /// Adds a task to the task queue.
    pub fn enqueue_task(&self, task: Task) {
        let mut state = self.state.borrow_mut();
        if state.closed {
            debug!("event loop dropped, task discarded");
            return;
        }
        state.task_queue.enqueue(task);
    }

    /// Adds a microtask to the microtask queue.
    pub fn enqueue_microtask(&self, microtask: MicroTask) {
        let mut state = self.state.borrow_mut();
        if state.closed {
            debug!("event loop dropped, microtask discarded");
            return;
        }
        state.microtask_queue.enqueue(microtask);
    }

    /// Schedules `task` to run once `delay` milliseconds of virtual time
    /// have passed.
    pub fn set_timeout(&self, delay: u64, task: Task) -> TimerId {
        let mut state = self.state.borrow_mut();
        let due = state.now.saturating_add(delay);
        let id = state.timers.schedule(due, task);
        if state.closed {
            state.timers.cancel(id);
            debug!(?id, "event loop dropped, timer discarded");
        } else {
            trace!(?id, due, "timer scheduled");
        }
        id
    }

    /// Cancels a timer. Returns false if it already fired or was cancelled.
    pub fn clear_timeout(&self, id: TimerId) -> bool {
        self.state.borrow_mut().timers.cancel(id)
    }

    /// Current virtual time in milliseconds.
    pub fn now(&self) -> u64 {
        self.state.borrow().now
    }
}

impl Scheduler for EventLoopHandle {
    fn defer(&self, job: Job) {
        let run = move || {
            job();
            Ok(Value::Undefined)
        };
        match self.dispatch {
            DispatchMode::Microtask => self.enqueue_microtask(MicroTask::new(run)),
            DispatchMode::Macrotask => self.enqueue_task(Task::new(run)),
        }
    }
}

/// The event loop.
///
/// Each iteration (turn) of the loop:
/// 1. Takes the oldest task from the task queue, or failing that the
///    earliest timer (advancing the virtual clock to its due time), and
///    executes it
/// 2. Drains all microtasks in the microtask queue
/// 3. Repeats
///
/// # Examples
///
/// ```
/// use async_runtime::{EventLoop, Task};
/// use core_types::Value;
///
/// let mut event_loop = EventLoop::new();
///
/// event_loop.enqueue_task(Task::new(|| Ok(Value::Undefined)));
/// event_loop.run_until_done().unwrap();
/// ```
#[derive(Debug)]
pub struct EventLoop {
    state: Rc<RefCell<LoopState>>,
    config: RuntimeConfig,
}

impl EventLoop {
    /// Creates a new EventLoop with empty queues and the default config.
    pub fn new() -> Self {
        Self::with_config(RuntimeConfig::default())
    }

    /// Creates a new EventLoop with the given configuration.
    pub fn with_config(config: RuntimeConfig) -> Self {
        debug!(dispatch = ?config.dispatch, max_turns = ?config.max_turns, "event loop created");
        Self {
            state: Rc::new(RefCell::new(LoopState::default())),
            config,
        }
    }

    /// Returns the loop's configuration.
    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Returns a handle to this loop's queues.
    pub fn handle(&self) -> EventLoopHandle {
        EventLoopHandle {
            state: Rc::clone(&self.state),
            dispatch: self.config.dispatch,
        }
    }

    /// Returns this loop as a promise scheduler.
    pub fn scheduler(&self) -> Rc<dyn Scheduler> {
        Rc::new(self.handle())
    }

    /// Runs the event loop until all tasks, microtasks and timers are
    /// processed.
    ///
    /// # Returns
    ///
    /// `Ok(())` if everything completed, or the first task failure.
    pub fn run_until_done(&mut self) -> RuntimeResult<()> {
        let mut budget = TurnBudget::new(self.config.max_turns);
        loop {
            if let Some(task) = self.next_task() {
                budget.spend()?;
                finish(task.run())?;
            } else if let Some(task) = self.next_timer(u64::MAX) {
                budget.spend()?;
                finish(task.run())?;
            } else if self.is_microtask_queue_empty() {
                break;
            }

            self.drain_microtasks(&mut budget)?;
        }
        Ok(())
    }

    /// Advances virtual time by `ms`, running ready tasks and every timer
    /// that falls due within the window, in due order.
    ///
    /// The clock ends at exactly `now + ms` even if no timer fired.
    pub fn advance_by(&mut self, ms: u64) -> RuntimeResult<()> {
        let target = self.now().saturating_add(ms);
        let mut budget = TurnBudget::new(self.config.max_turns);
        loop {
            if let Some(task) = self.next_task() {
                budget.spend()?;
                finish(task.run())?;
            } else if let Some(task) = self.next_timer(target) {
                budget.spend()?;
                finish(task.run())?;
            } else if self.is_microtask_queue_empty() {
                break;
            }

            self.drain_microtasks(&mut budget)?;
        }
        self.set_now(target);
        Ok(())
    }

    /// Adds a task to the task queue.
    ///
    /// The task will be executed in the next available iteration of the event loop.
    pub fn enqueue_task(&mut self, task: Task) {
        self.handle().enqueue_task(task);
    }

    /// Adds a microtask to the microtask queue.
    ///
    /// The microtask will be executed after the current task completes.
    pub fn enqueue_microtask(&mut self, microtask: MicroTask) {
        self.handle().enqueue_microtask(microtask);
    }

    /// Schedules a timer relative to the current virtual time.
    pub fn set_timeout(&mut self, delay: u64, task: Task) -> TimerId {
        self.handle().set_timeout(delay, task)
    }

    /// Cancels a timer.
    pub fn clear_timeout(&mut self, id: TimerId) -> bool {
        self.handle().clear_timeout(id)
    }

    /// Current virtual time in milliseconds.
    pub fn now(&self) -> u64 {
        self.state.borrow().now
    }

    /// Returns true if the task queue is empty.
    pub fn is_task_queue_empty(&self) -> bool {
        self.state.borrow().task_queue.is_empty()
    }

    /// Returns true if the microtask queue is empty.
    pub fn is_microtask_queue_empty(&self) -> bool {
        self.state.borrow().microtask_queue.is_empty()
    }

    /// Returns the number of live timers.
    pub fn pending_timers(&self) -> usize {
        self.state.borrow().timers.len()
    }

    /// Runs all microtasks in the queue until empty.
    ///
    /// This drains the microtask queue completely. New microtasks added during
    /// execution will also be processed before this method returns.
    pub fn run_all_microtasks(&mut self) -> RuntimeResult<()> {
        let mut budget = TurnBudget::new(self.config.max_turns);
        self.drain_microtasks(&mut budget)
    }

    /// Runs all tasks in the queue (without processing microtasks between them).
    ///
    /// This is primarily for testing purposes.
    pub fn run_all_tasks(&mut self) -> RuntimeResult<()> {
        let mut budget = TurnBudget::new(self.config.max_turns);
        while let Some(task) = self.next_task() {
            budget.spend()?;
            finish(task.run())?;
        }
        Ok(())
    }

    /// Processes one complete cycle: one task followed by all microtasks.
    ///
    /// This represents one iteration of the event loop. Timers are not
    /// consulted.
    pub fn process_one_cycle(&mut self) -> RuntimeResult<()> {
        let mut budget = TurnBudget::new(self.config.max_turns);
        if let Some(task) = self.next_task() {
            budget.spend()?;
            finish(task.run())?;
        }

        self.drain_microtasks(&mut budget)
    }

    fn drain_microtasks(&self, budget: &mut TurnBudget) -> RuntimeResult<()> {
        // The borrow must end before the microtask runs; it may enqueue more.
        loop {
            let next = self.state.borrow_mut().microtask_queue.dequeue();
            let Some(microtask) = next else {
                return Ok(());
            };
            budget.spend()?;
            finish(microtask.run())?;
        }
    }

    fn next_task(&self) -> Option<Task> {
        self.state.borrow_mut().task_queue.dequeue()
    }

    fn next_timer(&self, deadline: u64) -> Option<Task> {
        let mut state = self.state.borrow_mut();
        let (due, task) = state.timers.pop_due(deadline)?;
        state.now = state.now.max(due);
        trace!(due, "timer fired");
        Some(task)
    }

    fn set_now(&self, now: u64) {
        let mut state = self.state.borrow_mut();
        state.now = state.now.max(now);
    }
}

impl Default for EventLoop {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for EventLoop {
    fn drop(&mut self) {
        // Queued work holds handles back to this state.
        let pending = {
            let mut state = self.state.borrow_mut();
            state.closed = true;
            (
                std::mem::take(&mut state.task_queue),
                std::mem::take(&mut state.microtask_queue),
                std::mem::take(&mut state.timers),
            )
        };
        drop(pending);
    }
}
