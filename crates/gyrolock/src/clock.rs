//! Injectable sleeping and the retry primitive used by sensor reads.
//!
//! Every suspension point of the monitor (zero-read retry, poll interval, cooldown)
//! goes through [`Sleeper`], so tests can drive the loop without real delays.

use std::thread;
use std::time::Duration;

/// Blocking sleep seam.
pub trait Sleeper {
    fn sleep(&mut self, duration: Duration);
}

/// Sleeps the calling thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&mut self, duration: Duration) {
        if !duration.is_zero() {
            thread::sleep(duration);
        }
    }
}

impl<S: Sleeper + ?Sized> Sleeper for &mut S {
    fn sleep(&mut self, duration: Duration) {
        (**self).sleep(duration)
    }
}

/// How long to wait between attempts, and how many attempts to make.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub delay: Duration,
    /// `None` retries forever.
    pub max_attempts: Option<u32>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            delay: Duration::from_millis(10),
            max_attempts: None,
        }
    }
}

/// Call `attempt` until it yields `Some`, sleeping `policy.delay` between tries.
///
/// Errors from `attempt` are returned immediately. When the attempt budget runs out,
/// `exhausted` builds the error from the number of attempts made.
pub fn poll_until<T, E, S, F, X>(
    sleeper: &mut S,
    policy: &RetryPolicy,
    mut attempt: F,
    exhausted: X,
) -> Result<T, E>
where
    S: Sleeper + ?Sized,
    F: FnMut() -> Result<Option<T>, E>,
    X: FnOnce(u32) -> E,
{
    let mut attempts: u32 = 0;
    loop {
        attempts = attempts.saturating_add(1);
        if let Some(value) = attempt()? {
            return Ok(value);
        }
        if policy.max_attempts.is_some_and(|max| attempts >= max) {
            return Err(exhausted(attempts));
        }
        sleeper.sleep(policy.delay);
    }
}
