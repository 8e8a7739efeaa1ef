//! Scenario tests for promise settlement, chaining and adoption
//!
//! Each test drives promises through a real event loop.

use async_runtime::{Finalizer, Handler, Promise, PromiseState};
use core_types::{JsError, Value};
use integration_tests::{Harness, Spy};
use std::cell::Cell;
use std::rc::Rc;

#[test]
fn resolved_value_reaches_then_exactly_once() {
    let mut h = Harness::default();
    let spy = Spy::new();

    for value in [Value::Undefined, Value::Null, Value::from(true), Value::from(2.5)] {
        Promise::resolve(&h.scheduler, value).then(Some(spy.handler("then")), None);
    }
    assert_eq!(spy.call_count(), 0);

    h.event_loop.run_until_done().unwrap();
    assert_eq!(
        spy.calls(),
        vec![
            ("then", Value::Undefined),
            ("then", Value::Null),
            ("then", Value::from(true)),
            ("then", Value::from(2.5)),
        ]
    );
}

#[test]
fn rejected_reason_reaches_catch_exactly_once() {
    let mut h = Harness::default();
    let spy = Spy::new();

    Promise::reject(&h.scheduler, "default").catch(Some(spy.handler("catch")));
    h.event_loop.run_until_done().unwrap();

    assert_eq!(spy.calls(), vec![("catch", Value::from("default"))]);
}

#[test]
fn timer_backed_promise_stays_pending_until_due() {
    let mut h = Harness::default();
    let spy = Spy::new();

    let promise = h.delayed(100, Value::Smi(1));
    promise.then(Some(spy.handler("then")), None);

    h.event_loop.advance_by(99).unwrap();
    assert_eq!(promise.state(), PromiseState::Pending);
    assert_eq!(spy.call_count(), 0);

    h.event_loop.advance_by(1).unwrap();
    assert_eq!(promise.state(), PromiseState::Fulfilled);
    assert_eq!(spy.calls(), vec![("then", Value::Smi(1))]);
}

#[test]
fn outer_promise_adopts_inner_outcome() {
    let mut h = Harness::default();

    let inner_ok = h.delayed(10, Value::from("inner"));
    let inner_err = h.delayed_rejection(20, Value::from("inner failed"));
    let outer_ok = Promise::new(&h.scheduler, |resolve, _| {
        resolve.call(inner_ok.clone());
        Ok(())
    });
    let outer_err = Promise::new(&h.scheduler, |resolve, _| {
        resolve.call(inner_err.clone());
        Ok(())
    });

    h.event_loop.run_until_done().unwrap();
    assert_eq!(outer_ok.value(), Some(Value::from("inner")));
    assert_eq!(outer_err.reason(), Some(Value::from("inner failed")));
}

#[test]
fn handler_error_is_observable_through_catch() {
    let mut h = Harness::default();
    let spy = Spy::new();
    let error = Rc::new(JsError::error("x"));
    let thrown = Rc::clone(&error);

    Promise::resolve(&h.scheduler, Value::Smi(1))
        .then(Some(Handler::new(move |_| Err(thrown.into()))), None)
        .catch(Some(spy.handler("catch")));
    h.event_loop.run_until_done().unwrap();

    let calls = spy.calls();
    assert_eq!(calls.len(), 1);
    let caught = calls[0].1.as_error().unwrap();
    assert!(Rc::ptr_eq(caught, &error));
}

#[test]
fn finally_sees_no_arguments_and_keeps_outcome_across_chain() {
    let mut h = Harness::default();
    let runs = Rc::new(Cell::new(0));

    let finalizer = |runs: &Rc<Cell<i32>>| {
        let runs = Rc::clone(runs);
        Some(Finalizer::new(move || {
            runs.set(runs.get() + 1);
            Ok(Value::Undefined.into())
        }))
    };

    let ok = Promise::resolve(&h.scheduler, Value::from("default"))
        .then(Some(Handler::new(|v| Ok(v.into()))), None)
        .finally(finalizer(&runs));
    let failed = Promise::reject(&h.scheduler, Value::from("default"))
        .then(Some(Handler::new(|v| Ok(v.into()))), None)
        .finally(finalizer(&runs));
    h.event_loop.run_until_done().unwrap();

    assert_eq!(runs.get(), 2);
    assert_eq!(ok.value(), Some(Value::from("default")));
    assert_eq!(failed.reason(), Some(Value::from("default")));
}

#[test]
fn settlement_from_later_task_is_ignored_after_first() {
    let mut h = Harness::default();
    let spy = Spy::new();
    let handle = h.handle.clone();

    let promise = Promise::new(&h.scheduler, move |resolve, reject| {
        let late_resolve = resolve.clone();
        handle.set_timeout(
            5,
            async_runtime::Task::new(move || {
                late_resolve.call(Value::Smi(2));
                reject.call(Value::Smi(3));
                Ok(Value::Undefined)
            }),
        );
        resolve.call(Value::Smi(1));
        Ok(())
    });
    promise.then(Some(spy.handler("then")), Some(spy.handler("catch")));

    h.event_loop.run_until_done().unwrap();
    assert_eq!(spy.calls(), vec![("then", Value::Smi(1))]);
}
