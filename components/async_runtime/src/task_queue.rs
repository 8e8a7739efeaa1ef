//! Task, microtask and timer queue management.
//!
//! This module provides the queues used by the event loop. Tasks are
//! executed one at a time, with all microtasks draining after each task.
//! Timers hold tasks until the virtual clock reaches their due time.

use core_types::{JsError, Value};
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, VecDeque};

/// A unit of work run by the event loop.
///
/// The same type backs tasks, microtasks and timer callbacks; which queue
/// holds it decides when it runs.
pub struct Task {
    callback: Box<dyn FnOnce() -> Result<Value, JsError>>,
}

/// A task placed on the microtask queue, drained after every task. Promise
/// reactions are microtasks in the default dispatch mode.
pub type MicroTask = Task;

impl Task {
    /// Creates a new Task from a closure.
    pub fn new<F>(f: F) -> Self
    where
        F: FnOnce() -> Result<Value, JsError> + 'static,
    {
        Self {
            callback: Box::new(f),
        }
    }

    /// Executes the task.
    pub fn run(self) -> Result<Value, JsError> {
        (self.callback)()
    }
}

impl std::fmt::Debug for Task {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Task {{ ... }}")
    }
}

/// FIFO queue of tasks.
#[derive(Debug, Default)]
pub struct TaskQueue {
    queue: VecDeque<Task>,
}

/// The microtask queue; drained completely after each task.
pub type MicrotaskQueue = TaskQueue;

impl TaskQueue {
    /// Creates a new empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a task to the end of the queue.
    pub fn enqueue(&mut self, task: Task) {
        self.queue.push_back(task);
    }

    /// Removes and returns the oldest task.
    pub fn dequeue(&mut self) -> Option<Task> {
        self.queue.pop_front()
    }

    /// Returns true if the queue is empty.
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

/// Identifier returned when a timer is scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

/// Timers ordered by due time, then by scheduling order.
///
/// Cancelled timers leave a stale heap entry behind that is skipped when it
/// reaches the top.
#[derive(Debug, Default)]
pub struct TimerQueue {
    heap: BinaryHeap<Reverse<(u64, TimerId)>>,
    tasks: HashMap<TimerId, Task>,
    next_id: u64,
}

impl TimerQueue {
    /// Creates a new empty TimerQueue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedules `task` to become runnable at virtual time `due`.
    pub fn schedule(&mut self, due: u64, task: Task) -> TimerId {
        self.next_id += 1;
        let id = TimerId(self.next_id);
        self.heap.push(Reverse((due, id)));
        self.tasks.insert(id, task);
        id
    }

    /// Cancels a timer. Returns false if it already ran or was cancelled.
    pub fn cancel(&mut self, id: TimerId) -> bool {
        self.tasks.remove(&id).is_some()
    }

    /// Returns the due time of the earliest live timer.
    pub fn next_due(&mut self) -> Option<u64> {
        while let Some(&Reverse((due, id))) = self.heap.peek() {
            if self.tasks.contains_key(&id) {
                return Some(due);
            }
            self.heap.pop();
        }
        None
    }

    /// Removes the earliest timer if it is due at or before `deadline`.
    pub fn pop_due(&mut self, deadline: u64) -> Option<(u64, Task)> {
        let due = self.next_due()?;
        if due > deadline {
            return None;
        }
        let Reverse((due, id)) = self.heap.pop()?;
        let task = self.tasks.remove(&id)?;
        Some((due, task))
    }

    /// Returns true if no live timers remain.
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Returns the number of live timers.
    pub fn len(&self) -> usize {
        self.tasks.len()
    }
}
