//! Step Machine Tests
//!
//! Declarative steps, branching from completion handlers, and the lifetime
//! of a machine whose only owner is its aggregate operation.

use crate::*;

/// Step machine for a two-phase sign-in: fetch a token, then either refresh
/// it or load the profile.
fn sign_in(tether: &Tether, token: &'static str, log: &EventLog) -> Operation {
    let machine = tether.step_machine();
    let fetch = machine.create_step();
    let refresh = machine.create_step();
    let profile = machine.create_step();

    let l = log.clone();
    fetch.on_start(move || {
        l.push("fetch");
        Operation::completed_deferred(token)
    });
    let (to_refresh, to_profile) = (refresh.clone(), profile.clone());
    fetch.on_completion(move |op| {
        if op.result() == Value::from("expired") {
            to_refresh.start();
        }
        to_profile.start();
    });

    let l = log.clone();
    refresh.on_start(move || {
        l.push("refresh");
        Operation::completed_deferred("fresh")
    });

    let l = log.clone();
    profile.on_start(move || {
        l.push("profile");
        Operation::completed_deferred("alice")
    });

    machine.start(&fetch)
}

#[test]
fn test_branch_taken() {
    let tether = fresh_runtime();
    let log = EventLog::new();

    let total = sign_in(&tether, "expired", &log);

    assert_eq!(tether.wait(&total), AsyncState::Completed);
    assert_eq!(log.events(), vec!["fetch", "refresh", "profile"]);
    assert_eq!(total.result(), Value::from("alice"));
}

#[test]
fn test_branch_skipped() {
    let tether = fresh_runtime();
    let log = EventLog::new();

    let total = sign_in(&tether, "valid", &log);

    assert_eq!(tether.wait(&total), AsyncState::Completed);
    assert_eq!(log.events(), vec!["fetch", "profile"]);
}

#[test]
fn test_machine_released_after_settle() {
    let tether = fresh_runtime();
    let (work, _) = native_work();

    let (total, step) = {
        let machine = tether.step_machine();
        let step = machine.create_step();
        let pending = work.clone();
        step.on_start(move || pending.clone());
        (machine.start(&step), step)
    };

    // The aggregate keeps the machine alive while the step is in flight
    assert_eq!(total.state(), AsyncState::Started);
    assert!(step.start());

    work.set_state(AsyncState::Completed);
    tether.flush();

    assert_eq!(total.state(), AsyncState::Completed);
    assert!(!step.start());
}

#[test]
fn test_cancel_machine_through_aggregate() {
    let tether = fresh_runtime();
    let (work, cancels) = native_work();
    let machine = tether.step_machine();
    let step = machine.create_step();
    step.on_start(move || work.clone());

    let total = machine.start(&step);
    total.cancel();

    assert_eq!(cancels.get(), 1);
    assert_eq!(tether.wait(&total), AsyncState::Canceled);
}

#[test]
fn test_fail_fast_machine() {
    let tether = Tether::builder().cancel_on_error(true).build();
    init_test_logging();
    let log = EventLog::new();
    let machine = tether.step_machine();
    let first = machine.create_step();
    let second = machine.create_step();

    first.on_start(Operation::failed_deferred);
    let next = second.clone();
    first.on_completion(move |_| {
        next.start();
    });
    let l = log.clone();
    second.on_start(move || {
        l.push("second");
        Operation::completed(())
    });

    let total = machine.start(&first);

    assert_eq!(tether.wait(&total), AsyncState::Failed);
    assert!(log.events().is_empty());
}
