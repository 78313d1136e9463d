//! Two-party rendezvous runner.

use spire::error::{fail, OpsError};
use spire::parallel::concurrent_pair;
use std::time::{Duration, Instant};

#[test]
fn returns_both_results() {
    let (a, b) = concurrent_pair(|| Ok(1), || Ok("two")).unwrap();
    assert_eq!(a, 1);
    assert_eq!(b, "two");
}

#[test]
fn both_sides_start_within_a_small_epsilon() {
    let origin = Instant::now();
    let (a_started, b_started) = concurrent_pair(
        move || Ok(origin.elapsed()),
        move || {
            // Extra work after the barrier does not matter; the recorded
            // instant is taken first.
            let started = origin.elapsed();
            std::thread::sleep(Duration::from_millis(30));
            Ok(started)
        },
    )
    .unwrap();

    let delta = if a_started > b_started {
        a_started - b_started
    } else {
        b_started - a_started
    };
    assert!(delta < Duration::from_millis(100), "delta was {delta:?}");
}

#[test]
fn error_from_the_first_callable_propagates() {
    let result: Result<(i32, i32), _> = concurrent_pair(|| fail("a failed"), || Ok(2));
    let err = result.unwrap_err();
    assert!(matches!(err, OpsError::Failed { ref message, .. } if message == "a failed"));
}

#[test]
fn error_from_the_second_callable_propagates() {
    let result: Result<(i32, i32), _> = concurrent_pair(|| Ok(1), || fail("b failed"));
    let err = result.unwrap_err();
    assert!(matches!(err, OpsError::Failed { ref message, .. } if message == "b failed"));
}

#[test]
fn a_panicking_thread_fails_the_pair_loudly() {
    let result: Result<(i32, i32), _> =
        concurrent_pair(|| panic!("thread died"), || Ok(2));
    let err = result.unwrap_err();
    match err {
        OpsError::Internal(message) => {
            assert!(message.contains("no result received from thread A"))
        }
        other => panic!("expected Internal, got {other:?}"),
    }
}
