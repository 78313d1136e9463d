//! Bounded retry for eventually-consistent checks.

use crate::error::OpsError;
use std::time::{Duration, Instant};

/// Default pause between attempts, matching the tool's historical behavior.
pub const DEFAULT_PAUSE: Duration = Duration::from_secs(2);

/// Deadline and pause for one retry loop. The pause is fixed, not adaptive;
/// the final sleep may overshoot the deadline by up to one pause.
#[derive(Clone, Copy, Debug)]
pub struct RetryPolicy {
    pub max_duration: Duration,
    pub pause: Duration,
}

impl RetryPolicy {
    pub fn new(max_duration: Duration) -> Self {
        Self {
            max_duration,
            pause: DEFAULT_PAUSE,
        }
    }

    pub fn with_pause(mut self, pause: Duration) -> Self {
        self.pause = pause;
        self
    }
}

/// Turn a single-shot verifier into a bounded polling loop.
///
/// At least one attempt always happens before any deadline check. Once the
/// deadline has passed, the most recent failure is re-raised unchanged;
/// earlier failures surface only as transient progress text.
pub fn wrap(
    policy: RetryPolicy,
    mut verifier: impl FnMut() -> Result<(), OpsError>,
) -> impl FnOnce() -> Result<(), OpsError> {
    move || {
        let deadline = Instant::now() + policy.max_duration;
        loop {
            match verifier() {
                Ok(()) => return Ok(()),
                Err(e) => {
                    if Instant::now() >= deadline {
                        println!("Timeout - no more retries.");
                        tracing::warn!("verification failed permanently: {}", e);
                        return Err(e);
                    }
                    println!("Verification failed: {e}");
                    println!("RETRYING...");
                }
            }
            std::thread::sleep(policy.pause);
        }
    }
}
