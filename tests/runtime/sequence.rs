//! Sequence Tests
//!
//! Ordered execution, fail-fast, aggregate policies, pause/resume and
//! cancellation of sequences created through the runtime.

use crate::*;

// =============================================================================
// ORDERED EXECUTION
// =============================================================================

#[test]
fn test_results_by_index() {
    let tether = fresh_runtime();
    let seq = tether.sequence();
    seq.add_fn(|| Operation::completed(1));
    seq.add_fn(|| Operation::completed(2));

    let total = seq.start();

    assert_eq!(total.state(), AsyncState::Completed);
    assert_eq!(seq.result(0), Some(Value::Int(1)));
    assert_eq!(seq.result(1), Some(Value::Int(2)));
}

#[test]
fn test_steps_start_in_insertion_order() {
    let tether = fresh_runtime();
    let log = EventLog::new();
    let seq = tether.sequence();

    for name in ["login", "fetch", "render"] {
        let log = log.clone();
        seq.add_fn(move || {
            log.push(name);
            Operation::completed_deferred(name)
        });
    }

    let total = seq.start();
    assert_eq!(log.events(), vec!["login"]);

    assert_eq!(tether.wait(&total), AsyncState::Completed);
    assert_eq!(log.events(), vec!["login", "fetch", "render"]);
    assert_eq!(total.result(), Value::from("render"));
}

// =============================================================================
// FAIL-FAST
// =============================================================================

#[test]
fn test_fail_fast_skips_remaining_steps() {
    let tether = Tether::builder().cancel_on_error(true).build();
    init_test_logging();
    let log = EventLog::new();
    let seq = tether.sequence();

    let l = log.clone();
    seq.add_fn(move || {
        l.push("s0");
        Operation::completed(0)
    });
    let l = log.clone();
    seq.add_fn(move || {
        l.push("s1");
        settled(AsyncState::Failed, "disk full")
    });
    let l = log.clone();
    seq.add_fn(move || {
        l.push("s2");
        Operation::completed(2)
    });

    let total = seq.start();

    assert_eq!(log.events(), vec!["s0", "s1"]);
    assert_eq!(total.state(), AsyncState::Failed);
    assert_eq!(total.result(), Value::from("disk full"));
}

#[test]
fn test_failure_does_not_block_without_fail_fast() {
    let tether = fresh_runtime();
    let log = EventLog::new();
    let seq = tether.sequence();

    let l = log.clone();
    seq.add_fn(move || {
        l.push("s0");
        Operation::completed(0)
    });
    let l = log.clone();
    seq.add_fn(move || {
        l.push("s1");
        Operation::failed()
    });
    let l = log.clone();
    seq.add_fn(move || {
        l.push("s2");
        Operation::completed(2)
    });

    let total = seq.start();

    assert_eq!(log.events(), vec!["s0", "s1", "s2"]);
    assert_eq!(total.state(), AsyncState::Completed);
    assert_eq!(seq.operation(1).map(|op| op.state()), Some(AsyncState::Failed));
}

#[test]
fn test_fail_fast_toggled_on_running_sequence() {
    let tether = fresh_runtime();
    let seq = tether.sequence();
    let toggler = seq.clone();

    seq.add_fn(|| Operation::completed(0));
    seq.then(move |_| toggler.set_cancel_on_error(true)).unwrap();
    seq.add_fn(Operation::failed);
    seq.add_fn(|| Operation::completed(2));

    let total = seq.start();

    assert_eq!(total.state(), AsyncState::Failed);
    assert!(seq.operation(2).is_none());
}

// =============================================================================
// AGGREGATE POLICY
// =============================================================================

#[test]
fn test_always_completed_policy() {
    let tether = fresh_runtime();
    let seq = tether.sequence();
    seq.add_fn(|| Operation::completed(0));
    seq.add_fn(|| settled(AsyncState::Canceled, "aborted"));

    let total = seq.start();

    assert_eq!(total.state(), AsyncState::Completed);
    assert_eq!(total.result(), Value::from("aborted"));
}

#[test]
fn test_mirror_last_step_policy() {
    let tether = Tether::builder()
        .aggregate_policy(AggregatePolicy::MirrorLastStep)
        .build();
    let seq = tether.sequence();
    seq.add_fn(Operation::failed);
    seq.add_fn(|| settled(AsyncState::Canceled, "aborted"));

    assert_eq!(seq.start().state(), AsyncState::Canceled);

    let ok = tether.sequence();
    ok.add_fn(Operation::failed);
    ok.add_fn(|| Operation::completed(1));
    assert_eq!(ok.start().state(), AsyncState::Completed);
}

// =============================================================================
// DYNAMIC STEPS
// =============================================================================

fn fetch_page(seq: &Sequence, page: i64, last_page: i64, log: &EventLog) {
    let l = log.clone();
    seq.add_fn(move || {
        l.push(format!("page {}", page));
        Operation::completed_deferred(page)
    });
    let (next, l) = (seq.clone(), log.clone());
    seq.then(move |op| {
        if op.result() != Value::Int(last_page) {
            fetch_page(&next, page + 1, last_page, &l);
        }
    })
    .unwrap();
}

#[test]
fn test_pagination_adds_steps_from_handlers() {
    let tether = fresh_runtime();
    let log = EventLog::new();
    let seq = tether.sequence();
    fetch_page(&seq, 1, 4, &log);

    let total = seq.start();
    assert_eq!(tether.wait(&total), AsyncState::Completed);

    assert_eq!(log.events(), vec!["page 1", "page 2", "page 3", "page 4"]);
    assert_eq!(seq.len(), 4);
    assert_eq!(total.result(), Value::Int(4));
}

#[test]
fn test_call_added_after_finish_never_runs() {
    let tether = fresh_runtime();
    let seq = tether.sequence();
    seq.add_fn(|| Operation::completed(0));
    seq.start();

    let ran = Rc::new(Cell::new(false));
    let flag = ran.clone();
    seq.add_fn(move || {
        flag.set(true);
        Operation::completed(1)
    });
    seq.start();

    assert!(!ran.get());
    assert_eq!(seq.status(), tether::SequenceStatus::Finished);
}

// =============================================================================
// PAUSE / RESUME
// =============================================================================

#[test]
fn test_pause_resume_continue_next() {
    let tether = fresh_runtime();
    let log = EventLog::new();
    let seq = tether.sequence();

    for name in ["a", "b", "c"] {
        let l = log.clone();
        seq.add_fn(move || {
            l.push(name);
            Operation::completed_deferred(name)
        });
    }

    let total = seq.start();
    seq.pause().unwrap();
    tether.flush();

    assert_eq!(log.events(), vec!["a"]);
    assert_eq!(total.state(), AsyncState::Started);

    seq.resume().unwrap();
    assert_eq!(tether.wait(&total), AsyncState::Completed);
    assert_eq!(log.events(), vec!["a", "b", "c"]);
}

#[test]
fn test_pause_resume_retry_last() {
    let tether = Tether::builder().resume_mode(ResumeMode::RetryLast).build();
    init_test_logging();
    let attempts = Rc::new(Cell::new(0));
    let seq = tether.sequence();

    let count = attempts.clone();
    seq.add_fn(move || {
        count.set(count.get() + 1);
        if count.get() < 3 {
            Operation::failed_deferred()
        } else {
            Operation::completed_deferred("token")
        }
    });
    let pauser = seq.clone();
    seq.then(move |op| {
        if op.state() == AsyncState::Failed {
            pauser.pause().unwrap();
        }
    })
    .unwrap();

    let total = seq.start();
    for _ in 0..10 {
        tether.flush();
        if total.is_terminal() {
            break;
        }
        seq.resume().unwrap();
    }

    assert_eq!(attempts.get(), 3);
    assert_eq!(total.state(), AsyncState::Completed);
    assert_eq!(total.result(), Value::from("token"));
}

#[test]
fn test_resume_outside_pause_is_error() {
    let tether = fresh_runtime();
    let seq = tether.sequence();
    seq.add_fn(Operation::new);

    let err = seq.resume().unwrap_err();
    assert!(matches!(err, Error::InvalidState { .. }));

    seq.start();
    assert!(seq.resume().unwrap_err().is_usage_error());
}

// =============================================================================
// CANCELLATION
// =============================================================================

#[test]
fn test_cancel_aggregate_stops_sequence() {
    let tether = fresh_runtime();
    let (first, cancels) = native_work();
    let log = EventLog::new();
    let seq = tether.sequence();

    let work = first.clone();
    seq.add_fn(move || work.clone());
    let l = log.clone();
    seq.add_fn(move || {
        l.push("never");
        Operation::completed(1)
    });

    let total = seq.start();
    total.cancel();

    assert_eq!(cancels.get(), 1);
    assert_eq!(tether.wait(&total), AsyncState::Canceled);
    assert!(log.events().is_empty());
}

#[test]
fn test_chain_on_aggregate_observes_cancel() {
    let tether = fresh_runtime();
    let seq = tether.sequence();
    seq.add_fn(Operation::new);

    let seen = Rc::new(Cell::new(AsyncState::None));
    let sink = seen.clone();
    let tail = seq.start().then(move |op| sink.set(op.state()));

    tail.cancel();

    assert_eq!(seen.get(), AsyncState::Canceled);
    assert_eq!(tail.state(), AsyncState::Canceled);
}
