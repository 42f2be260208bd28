//! Cancellation and bounded waiting helpers

use crate::errors::SapError;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Shared flag checked by every blocking wait in a session.
///
/// Clone it and call [`CancellationToken::cancel`] from another thread to
/// abort a pending login or navigation.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    pub fn check(&self, operation: &str) -> Result<(), SapError> {
        if self.is_cancelled() {
            Err(SapError::Cancelled(operation.to_string()))
        } else {
            Ok(())
        }
    }
}

/// Sleeps for `duration` in slices of at most `slice`, checking `token`.
pub fn sleep_cancellable(
    duration: Duration,
    slice: Duration,
    token: &CancellationToken,
    operation: &str,
) -> Result<(), SapError> {
    let deadline = Instant::now() + duration;
    loop {
        token.check(operation)?;
        let now = Instant::now();
        if now >= deadline {
            return Ok(());
        }
        thread::sleep(slice.min(deadline - now));
    }
}

/// Polls `probe` until it yields `Some`, the timeout elapses or the token is
/// cancelled. Errors from `probe` end the wait immediately.
pub fn poll_until<T>(
    timeout: Duration,
    interval: Duration,
    token: &CancellationToken,
    operation: &str,
    mut probe: impl FnMut() -> Result<Option<T>, SapError>,
) -> Result<T, SapError> {
    let deadline = Instant::now() + timeout;
    loop {
        token.check(operation)?;
        if let Some(value) = probe()? {
            return Ok(value);
        }
        let now = Instant::now();
        if now >= deadline {
            return Err(SapError::Timeout(format!(
                "{operation} did not complete within {timeout:?}"
            )));
        }
        thread::sleep(interval.min(deadline - now));
    }
}
