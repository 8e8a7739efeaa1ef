//! Promise implementation.
//!
//! A [`Promise`] is a value that becomes available (or fails) later.
//! Continuations registered with [`then`](Promise::then),
//! [`catch`](Promise::catch) and [`finally`](Promise::finally) run
//! asynchronously through a [`Scheduler`], exactly once, in registration
//! order.
//!
//! Failures are values: executors and handlers return `Err(reason)` to
//! "throw", and the reason becomes the rejection of the nearest downstream
//! promise.

use crate::scheduler::{Job, Scheduler};
use core_types::{JsError, Value};
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, trace, warn};

static NEXT_PROMISE_ID: AtomicU64 = AtomicU64::new(1);

/// The state of a Promise.
///
/// Once settled (Fulfilled or Rejected), a Promise cannot change state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromiseState {
    /// The initial state; the promise is neither fulfilled nor rejected.
    Pending,
    /// The promise has been resolved with a value.
    Fulfilled,
    /// The promise has been rejected with a reason.
    Rejected,
}

/// A fulfilment or rejection handler passed to [`Promise::then`].
///
/// Returning `Ok` resolves the downstream promise (adopting it if the
/// resolution is thenable); returning `Err` rejects it.
pub struct Handler {
    callback: Box<dyn FnOnce(Value) -> Result<Resolution, Value>>,
}

impl Handler {
    /// Creates a new Handler from a closure.
    pub fn new<F>(f: F) -> Self
    where
        F: FnOnce(Value) -> Result<Resolution, Value> + 'static,
    {
        Self {
            callback: Box::new(f),
        }
    }

    /// Calls the handler with the settled value or reason.
    pub fn call(self, arg: Value) -> Result<Resolution, Value> {
        (self.callback)(arg)
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Handler {{ ... }}")
    }
}

/// A callback passed to [`Promise::finally`]. It observes neither the value
/// nor the reason.
pub struct Finalizer {
    callback: Box<dyn FnOnce() -> Result<Resolution, Value>>,
}

impl Finalizer {
    /// Creates a new Finalizer from a closure.
    pub fn new<F>(f: F) -> Self
    where
        F: FnOnce() -> Result<Resolution, Value> + 'static,
    {
        Self {
            callback: Box::new(f),
        }
    }

    /// Calls the finalizer.
    pub fn call(self) -> Result<Resolution, Value> {
        (self.callback)()
    }
}

impl fmt::Debug for Finalizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Finalizer {{ ... }}")
    }
}

/// Anything exposing a then-shaped registration operation.
///
/// Implemented by [`Promise`]; foreign deferred-value implementations
/// implement it to be adopted by promises of this engine.
pub trait Thenable {
    /// Registers continuations that settle an adopting promise.
    ///
    /// Returning `Err` rejects the adopting promise, unless one of the
    /// capabilities was already called.
    fn register(&self, on_fulfilled: ResolveFn, on_rejected: RejectFn) -> Result<(), Value>;
}

/// What a promise is resolved with.
///
/// Thenables are tagged explicitly where they enter the engine, so the
/// unwrap rule never has to probe a plain [`Value`].
pub enum Resolution {
    /// A plain value; fulfils immediately
    Value(Value),
    /// A promise of this engine; adopted
    Promise(Promise),
    /// A foreign thenable; adopted
    Thenable(Rc<dyn Thenable>),
}

impl fmt::Debug for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resolution::Value(v) => f.debug_tuple("Value").field(v).finish(),
            Resolution::Promise(p) => f.debug_tuple("Promise").field(p).finish(),
            Resolution::Thenable(_) => write!(f, "Thenable(...)"),
        }
    }
}

impl From<Value> for Resolution {
    fn from(value: Value) -> Self {
        Resolution::Value(value)
    }
}

impl From<Promise> for Resolution {
    fn from(promise: Promise) -> Self {
        Resolution::Promise(promise)
    }
}

impl From<Rc<dyn Thenable>> for Resolution {
    fn from(thenable: Rc<dyn Thenable>) -> Self {
        Resolution::Thenable(thenable)
    }
}

/// The resolve capability handed to executors and thenables.
///
/// Shares an "already resolved" flag with its [`RejectFn`]: after either is
/// called, every further call of the pair is ignored, even while an
/// adopted thenable is still pending.
#[derive(Debug, Clone)]
pub struct ResolveFn {
    promise: Promise,
    already_resolved: Rc<Cell<bool>>,
}

impl ResolveFn {
    /// Resolves the promise, unwrapping thenables.
    pub fn call(&self, value: impl Into<Resolution>) {
        if self.already_resolved.replace(true) {
            debug!(promise = self.promise.id(), "ignoring resolve of already resolved promise");
            return;
        }
        self.promise.resolve_with(value.into());
    }
}

/// The reject capability handed to executors and thenables.
#[derive(Debug, Clone)]
pub struct RejectFn {
    promise: Promise,
    already_resolved: Rc<Cell<bool>>,
}

impl RejectFn {
    /// Rejects the promise. Reasons are stored as-is.
    pub fn call(&self, reason: impl Into<Value>) {
        if self.already_resolved.replace(true) {
            debug!(promise = self.promise.id(), "ignoring reject of already resolved promise");
            return;
        }
        self.promise.reject_now(reason.into());
    }
}

type Reaction = Box<dyn FnOnce(Value)>;

thread_local! {
    /// Reactions released by settlements, run in FIFO order by the outermost
    /// settlement on the stack.
    static SETTLED_REACTIONS: RefCell<VecDeque<(Reaction, Value)>> =
        RefCell::new(VecDeque::new());
    static DRAINING: Cell<bool> = const { Cell::new(false) };
}

/// Resets the drain flag even if a reaction unwinds.
struct DrainGuard;

impl Drop for DrainGuard {
    fn drop(&mut self) {
        DRAINING.with(|draining| draining.set(false));
        if std::thread::panicking() {
            SETTLED_REACTIONS.with(|queue| queue.borrow_mut().clear());
        }
    }
}

/// Queues `reactions` with `arg` and, unless a settlement further up the
/// stack is already draining, runs the queue until it is empty.
fn run_reactions(reactions: Vec<Reaction>, arg: Value) {
    SETTLED_REACTIONS.with(|queue| {
        queue
            .borrow_mut()
            .extend(reactions.into_iter().map(|reaction| (reaction, arg.clone())));
    });
    if DRAINING.with(|draining| draining.replace(true)) {
        return;
    }
    let _guard = DrainGuard;
    loop {
        let next = SETTLED_REACTIONS.with(|queue| queue.borrow_mut().pop_front());
        let Some((reaction, arg)) = next else {
            break;
        };
        reaction(arg);
    }
}

enum Slot {
    Pending {
        fulfill_reactions: Vec<Reaction>,
        reject_reactions: Vec<Reaction>,
    },
    Fulfilled(Value),
    Rejected(Value),
}

struct PromiseCell {
    id: u64,
    slot: RefCell<Slot>,
}

/// A deferred computation.
///
/// Cloning a `Promise` clones the handle; both clones observe the same
/// settlement.
///
/// # Examples
///
/// ```
/// use async_runtime::{EventLoop, Handler, Promise, PromiseState};
/// use core_types::Value;
///
/// let mut event_loop = EventLoop::new();
/// let scheduler = event_loop.scheduler();
///
/// let promise = Promise::resolve(&scheduler, Value::Smi(3)).then(
///     Some(Handler::new(|v| Ok(Value::Smi(v.as_smi().unwrap_or(0) * 4).into()))),
///     None,
/// );
/// assert_eq!(promise.state(), PromiseState::Pending);
///
/// event_loop.run_until_done().unwrap();
/// assert_eq!(promise.value(), Some(Value::Smi(12)));
/// ```
#[derive(Clone)]
pub struct Promise {
    cell: Rc<PromiseCell>,
    scheduler: Rc<dyn Scheduler>,
}

impl Promise {
    /// Creates a promise and runs `executor` synchronously.
    ///
    /// If the executor returns `Err(reason)` the promise is rejected with
    /// `reason`, unless the executor already resolved it.
    pub fn new<F>(scheduler: &Rc<dyn Scheduler>, executor: F) -> Promise
    where
        F: FnOnce(ResolveFn, RejectFn) -> Result<(), Value>,
    {
        let promise = Promise::pending(Rc::clone(scheduler));
        let (resolve, reject) = promise.resolving_functions();
        if let Err(reason) = executor(resolve, reject.clone()) {
            debug!(promise = promise.id(), %reason, "executor failed");
            reject.call(reason);
        }
        promise
    }

    /// Returns `value` unchanged if it is already a promise, otherwise a new
    /// promise resolved with it.
    pub fn resolve(scheduler: &Rc<dyn Scheduler>, value: impl Into<Resolution>) -> Promise {
        match value.into() {
            Resolution::Promise(promise) => promise,
            resolution => Promise::new(scheduler, move |resolve, _| {
                resolve.call(resolution);
                Ok(())
            }),
        }
    }

    /// Returns a new promise rejected with `reason`.
    pub fn reject(scheduler: &Rc<dyn Scheduler>, reason: impl Into<Value>) -> Promise {
        let reason = reason.into();
        Promise::new(scheduler, move |_, reject| {
            reject.call(reason);
            Ok(())
        })
    }

    /// Adds handlers for fulfillment and/or rejection.
    ///
    /// Returns a new Promise settled from whichever handler runs. A missing
    /// handler passes the value or reason through. On an already settled
    /// promise the handler is deferred through the scheduler, never run
    /// synchronously.
    pub fn then(&self, on_fulfilled: Option<Handler>, on_rejected: Option<Handler>) -> Promise {
        let derived = Promise::pending(Rc::clone(&self.scheduler));
        let (resolve, reject) = derived.resolving_functions();

        let handle_fulfilled: Reaction = {
            let resolve = resolve.clone();
            let reject = reject.clone();
            Box::new(move |value: Value| match on_fulfilled {
                Some(handler) => settle_from(handler.call(value), &resolve, &reject),
                None => resolve.call(value),
            })
        };
        let handle_rejected: Reaction = Box::new(move |reason: Value| match on_rejected {
            Some(handler) => settle_from(handler.call(reason), &resolve, &reject),
            None => reject.call(reason),
        });

        self.add_reactions(handle_fulfilled, handle_rejected);
        derived
    }

    /// Equivalent to `then(None, on_rejected)`.
    pub fn catch(&self, on_rejected: Option<Handler>) -> Promise {
        self.then(None, on_rejected)
    }

    /// Runs `on_finally` on either path and passes the original outcome
    /// through once it completes.
    ///
    /// If `on_finally` returns a thenable, the outcome waits for it. If it
    /// fails, or its thenable rejects, that failure replaces the outcome.
    pub fn finally(&self, on_finally: Option<Finalizer>) -> Promise {
        let finalizer = Rc::new(RefCell::new(on_finally));

        let on_fulfilled = {
            let finalizer = Rc::clone(&finalizer);
            let scheduler = Rc::clone(&self.scheduler);
            Handler::new(move |value| {
                let completion = run_finalizer(&finalizer)?;
                let pass_through = Handler::new(move |_| Ok(value.into()));
                Ok(Promise::resolve(&scheduler, completion)
                    .then(Some(pass_through), None)
                    .into())
            })
        };
        let scheduler = Rc::clone(&self.scheduler);
        let on_rejected = Handler::new(move |reason| {
            let completion = run_finalizer(&finalizer)?;
            let rethrow = Handler::new(move |_| Err(reason));
            Ok(Promise::resolve(&scheduler, completion)
                .then(Some(rethrow), None)
                .into())
        });

        self.then(Some(on_fulfilled), Some(on_rejected))
    }

    /// Returns the current state.
    pub fn state(&self) -> PromiseState {
        match &*self.cell.slot.borrow() {
            Slot::Pending { .. } => PromiseState::Pending,
            Slot::Fulfilled(_) => PromiseState::Fulfilled,
            Slot::Rejected(_) => PromiseState::Rejected,
        }
    }

    /// Returns the value if fulfilled.
    pub fn value(&self) -> Option<Value> {
        match &*self.cell.slot.borrow() {
            Slot::Fulfilled(value) => Some(value.clone()),
            _ => None,
        }
    }

    /// Returns the reason if rejected.
    pub fn reason(&self) -> Option<Value> {
        match &*self.cell.slot.borrow() {
            Slot::Rejected(reason) => Some(reason.clone()),
            _ => None,
        }
    }

    /// Checks if reactions are queued waiting for settlement.
    pub fn has_pending_reactions(&self) -> bool {
        match &*self.cell.slot.borrow() {
            Slot::Pending {
                fulfill_reactions, ..
            } => !fulfill_reactions.is_empty(),
            _ => false,
        }
    }

    /// Process-unique id, used in log output.
    pub fn id(&self) -> u64 {
        self.cell.id
    }

    /// Returns true if both handles refer to the same promise.
    pub fn ptr_eq(&self, other: &Promise) -> bool {
        Rc::ptr_eq(&self.cell, &other.cell)
    }

    /// The scheduler this promise defers reactions to.
    pub fn scheduler(&self) -> &Rc<dyn Scheduler> {
        &self.scheduler
    }

    fn pending(scheduler: Rc<dyn Scheduler>) -> Promise {
        let id = NEXT_PROMISE_ID.fetch_add(1, Ordering::Relaxed);
        trace!(promise = id, "promise created");
        Promise {
            cell: Rc::new(PromiseCell {
                id,
                slot: RefCell::new(Slot::Pending {
                    fulfill_reactions: Vec::new(),
                    reject_reactions: Vec::new(),
                }),
            }),
            scheduler,
        }
    }

    fn resolving_functions(&self) -> (ResolveFn, RejectFn) {
        let already_resolved = Rc::new(Cell::new(false));
        (
            ResolveFn {
                promise: self.clone(),
                already_resolved: Rc::clone(&already_resolved),
            },
            RejectFn {
                promise: self.clone(),
                already_resolved,
            },
        )
    }

    fn resolve_with(&self, resolution: Resolution) {
        if self.state() != PromiseState::Pending {
            return;
        }
        match resolution {
            Resolution::Value(value) => self.fulfill(value),
            Resolution::Promise(inner) if inner.ptr_eq(self) => {
                warn!(promise = self.id(), "promise resolved with itself");
                let error = JsError::type_error(format!(
                    "Chaining cycle detected for promise #{}",
                    self.id()
                ));
                self.reject_now(error.into());
            }
            Resolution::Promise(inner) => {
                debug!(promise = self.id(), adopted = inner.id(), "adopting promise");
                self.adopt(&inner);
            }
            Resolution::Thenable(thenable) => {
                debug!(promise = self.id(), "adopting foreign thenable");
                self.adopt(thenable.as_ref());
            }
        }
    }

    fn adopt(&self, thenable: &dyn Thenable) {
        let (resolve, reject) = self.resolving_functions();
        if let Err(reason) = thenable.register(resolve, reject.clone()) {
            debug!(promise = self.id(), %reason, "thenable registration failed");
            reject.call(reason);
        }
    }

    /// Moves the slot out of `Pending` and returns the reactions to run.
    /// Both reaction lists are dropped.
    fn transition(&self, settled: Slot) -> Option<Vec<Reaction>> {
        let mut slot = self.cell.slot.borrow_mut();
        if !matches!(*slot, Slot::Pending { .. }) {
            return None;
        }
        let fulfilled = matches!(settled, Slot::Fulfilled(_));
        match std::mem::replace(&mut *slot, settled) {
            Slot::Pending {
                fulfill_reactions,
                reject_reactions,
            } => Some(if fulfilled {
                fulfill_reactions
            } else {
                reject_reactions
            }),
            _ => None,
        }
    }

    fn fulfill(&self, value: Value) {
        let Some(reactions) = self.transition(Slot::Fulfilled(value.clone())) else {
            return;
        };
        debug!(promise = self.id(), reactions = reactions.len(), %value, "promise fulfilled");
        run_reactions(reactions, value);
    }

    fn reject_now(&self, reason: Value) {
        let Some(reactions) = self.transition(Slot::Rejected(reason.clone())) else {
            return;
        };
        debug!(promise = self.id(), reactions = reactions.len(), %reason, "promise rejected");
        run_reactions(reactions, reason);
    }

    fn add_reactions(&self, on_fulfilled: Reaction, on_rejected: Reaction) {
        let mut slot = self.cell.slot.borrow_mut();
        let job: Job = match &mut *slot {
            Slot::Pending {
                fulfill_reactions,
                reject_reactions,
            } => {
                fulfill_reactions.push(on_fulfilled);
                reject_reactions.push(on_rejected);
                trace!(promise = self.id(), "reactions queued on pending promise");
                return;
            }
            Slot::Fulfilled(value) => {
                let value = value.clone();
                Box::new(move || on_fulfilled(value))
            }
            Slot::Rejected(reason) => {
                let reason = reason.clone();
                Box::new(move || on_rejected(reason))
            }
        };
        drop(slot);
        trace!(promise = self.id(), "reaction deferred on settled promise");
        self.scheduler.defer(job);
    }
}

impl fmt::Debug for Promise {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Promise")
            .field("id", &self.id())
            .field("state", &self.state())
            .finish()
    }
}

impl Thenable for Promise {
    fn register(&self, on_fulfilled: ResolveFn, on_rejected: RejectFn) -> Result<(), Value> {
        self.then(
            Some(Handler::new(move |value| {
                on_fulfilled.call(value);
                Ok(Value::Undefined.into())
            })),
            Some(Handler::new(move |reason| {
                on_rejected.call(reason);
                Ok(Value::Undefined.into())
            })),
        );
        Ok(())
    }
}

fn settle_from(result: Result<Resolution, Value>, resolve: &ResolveFn, reject: &RejectFn) {
    match result {
        Ok(resolution) => resolve.call(resolution),
        Err(reason) => reject.call(reason),
    }
}

fn run_finalizer(slot: &RefCell<Option<Finalizer>>) -> Result<Resolution, Value> {
    let finalizer = slot.borrow_mut().take();
    match finalizer {
        Some(finalizer) => finalizer.call(),
        None => Ok(Value::Undefined.into()),
    }
}
