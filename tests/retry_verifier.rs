//! Bounded retry loop behavior.

use spire::error::{fail, OpsError};
use spire::retry::{self, RetryPolicy};
use std::cell::Cell;
use std::rc::Rc;
use std::time::{Duration, Instant};

#[test]
fn always_failing_verifier_reaches_the_attempt_floor_then_reraises_the_last_failure() {
    let attempts = Rc::new(Cell::new(0u32));
    let counter = Rc::clone(&attempts);
    let policy = RetryPolicy::new(Duration::from_millis(200)).with_pause(Duration::from_millis(50));

    let wrapped = retry::wrap(policy, move || {
        counter.set(counter.get() + 1);
        fail(format!("attempt {}", counter.get()))
    });

    let err = wrapped().unwrap_err();
    // ceil(200ms / 50ms) = 4 attempts minimum before the deadline passes.
    assert!(attempts.get() >= 4, "only {} attempts", attempts.get());
    // The error re-raised is the most recent failure.
    assert!(
        matches!(err, OpsError::Failed { ref message, .. }
            if *message == format!("attempt {}", attempts.get()))
    );
}

#[test]
fn success_on_the_kth_attempt_makes_exactly_k_calls() {
    let attempts = Rc::new(Cell::new(0u32));
    let counter = Rc::clone(&attempts);
    let policy = RetryPolicy::new(Duration::from_secs(30)).with_pause(Duration::from_millis(20));

    let wrapped = retry::wrap(policy, move || {
        counter.set(counter.get() + 1);
        if counter.get() < 3 {
            fail("not yet")
        } else {
            Ok(())
        }
    });

    wrapped().unwrap();
    assert_eq!(attempts.get(), 3);
}

#[test]
fn no_sleep_follows_a_successful_attempt() {
    // A pause far larger than the assertion bound would be visible if the
    // loop slept after success.
    let policy = RetryPolicy::new(Duration::from_secs(60)).with_pause(Duration::from_secs(10));
    let started = Instant::now();
    retry::wrap(policy, || Ok(()))().unwrap();
    assert!(started.elapsed() < Duration::from_secs(1));
}

#[test]
fn at_least_one_attempt_happens_even_with_a_zero_deadline() {
    let attempts = Rc::new(Cell::new(0u32));
    let counter = Rc::clone(&attempts);
    let policy = RetryPolicy::new(Duration::ZERO).with_pause(Duration::from_millis(10));

    let err = retry::wrap(policy, move || {
        counter.set(counter.get() + 1);
        fail("down")
    })()
    .unwrap_err();

    assert_eq!(attempts.get(), 1);
    assert!(matches!(err, OpsError::Failed { ref message, .. } if message == "down"));
}

#[test]
fn immediate_success_makes_one_call() {
    let attempts = Rc::new(Cell::new(0u32));
    let counter = Rc::clone(&attempts);
    let policy = RetryPolicy::new(Duration::from_secs(5));

    retry::wrap(policy, move || {
        counter.set(counter.get() + 1);
        Ok(())
    })()
    .unwrap();

    assert_eq!(attempts.get(), 1);
}
