//! Contract tests for async_runtime component
//!
//! These tests pin the public signatures other components build on.

use async_runtime::{
    EventLoop, EventLoopHandle, Finalizer, Handler, Job, MicroTask, Promise, PromiseState,
    Resolution, RuntimeConfig, RuntimeResult, Scheduler, Task, TimerId,
};
use core_types::{JsError, Value};
use std::rc::Rc;

mod event_loop_contract {
    use super::*;

    #[test]
    fn event_loop_new_returns_self() {
        let event_loop = EventLoop::new();
        let _ = event_loop;
    }

    #[test]
    fn event_loop_enqueue_task_accepts_task() {
        let mut event_loop = EventLoop::new();
        event_loop.enqueue_task(Task::new(|| Ok(Value::Undefined)));
    }

    #[test]
    fn event_loop_enqueue_microtask_accepts_microtask() {
        let mut event_loop = EventLoop::new();
        event_loop.enqueue_microtask(MicroTask::new(|| Ok(Value::Undefined)));
    }

    #[test]
    fn event_loop_set_timeout_returns_timer_id() {
        let mut event_loop = EventLoop::new();
        let _id: TimerId = event_loop.set_timeout(0, Task::new(|| Ok(Value::Undefined)));
    }

    #[test]
    fn event_loop_drivers_return_runtime_result() {
        let mut event_loop = EventLoop::new();
        let _: RuntimeResult<()> = event_loop.run_until_done();
        let _: RuntimeResult<()> = event_loop.advance_by(1);
        let _: RuntimeResult<()> = event_loop.process_one_cycle();
    }

    #[test]
    fn event_loop_with_config_keeps_config() {
        let config = RuntimeConfig::default().with_max_turns(10);
        let event_loop = EventLoop::with_config(config.clone());
        assert_eq!(event_loop.config(), &config);
    }

    #[test]
    fn handle_is_a_scheduler() {
        fn assert_scheduler<S: Scheduler + Clone>(_: &S) {}
        let handle: EventLoopHandle = EventLoop::new().handle();
        assert_scheduler(&handle);
    }
}

mod promise_contract {
    use super::*;

    #[test]
    fn promise_new_takes_scheduler_and_executor() {
        let scheduler: Rc<dyn Scheduler> = EventLoop::new().scheduler();
        let promise: Promise = Promise::new(&scheduler, |_resolve, _reject| Ok(()));
        let _state: PromiseState = promise.state();
    }

    #[test]
    fn promise_then_returns_promise() {
        let scheduler = EventLoop::new().scheduler();
        let promise = Promise::resolve(&scheduler, Value::Smi(42));
        let chained: Promise = promise.then(None, None);
        let _: Promise = chained.catch(None);
    }

    #[test]
    fn promise_finally_returns_promise() {
        let scheduler = EventLoop::new().scheduler();
        let promise = Promise::reject(&scheduler, JsError::error("test error"));
        let _: Promise = promise.finally(Some(Finalizer::new(|| Ok(Value::Undefined.into()))));
    }

    #[test]
    fn handler_call_returns_resolution_result() {
        let handler = Handler::new(|v| Ok(v.into()));
        let result: Result<Resolution, Value> = handler.call(Value::Null);
        assert!(matches!(result, Ok(Resolution::Value(Value::Null))));
    }

    #[test]
    fn custom_scheduler_can_drive_promises() {
        struct Immediate;
        impl Scheduler for Immediate {
            fn defer(&self, job: Job) {
                // Runs inline.
                job();
            }
        }

        let scheduler: Rc<dyn Scheduler> = Rc::new(Immediate);
        let chained = Promise::resolve(&scheduler, Value::Smi(1)).then(None, None);
        assert_eq!(chained.value(), Some(Value::Smi(1)));
    }
}

mod promise_state_contract {
    use super::*;

    #[test]
    fn promise_state_has_all_variants() {
        let states = [
            PromiseState::Pending,
            PromiseState::Fulfilled,
            PromiseState::Rejected,
        ];
        assert_eq!(states.len(), 3);
    }
}
