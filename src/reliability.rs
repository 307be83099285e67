//! Bounded retries of transient backend faults.

use crate::error::Result;

use serde::{Deserialize, Serialize};
use std::{thread, time};

/// Retry policy applied by the backends to every request they issue.
///
/// An operation failing with an error whose [`Error::is_transient`](crate::Error::is_transient)
/// holds is retried up to `max_retries` times, sleeping `backoff_base × (1 + n²)`
/// before retry `n`. Any other error, or the last transient one, is returned as is.
///
/// ```rust
/// use attribute_table::reliability::Reliability;
/// use std::time::Duration;
///
/// let reliability = Reliability::default();
/// assert_eq!(reliability.backoff(0), Duration::from_millis(100));
/// assert_eq!(reliability.backoff(3), Duration::from_millis(1000));
/// ```
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(default)]
pub struct Reliability {
    /// The maximum number of retries after the first attempt.
    pub max_retries: u32,
    /// The base delay of the quadratic backoff.
    #[serde(with = "millis")]
    pub backoff_base: time::Duration,
}

impl Default for Reliability {
    fn default() -> Self {
        Self {
            max_retries: 10,
            backoff_base: time::Duration::from_millis(100),
        }
    }
}

impl Reliability {
    /// A policy that never retries.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            backoff_base: time::Duration::ZERO,
        }
    }

    /// The delay before retry `retry`, counted from zero.
    pub fn backoff(&self, retry: u32) -> time::Duration {
        let factor = 1 + retry.saturating_mul(retry);
        self.backoff_base.saturating_mul(factor)
    }

    /// Runs `operation`, retrying transient failures.
    pub fn execute<T>(&self, mut operation: impl FnMut() -> Result<T>) -> Result<T> {
        let mut retry = 0;
        loop {
            match operation() {
                Err(error) if error.is_transient() && retry < self.max_retries => {
                    let backoff = self.backoff(retry);
                    #[cfg(feature = "tracing")]
                    tracing::warn!(
                        retry,
                        backoff_ms = backoff.as_millis() as u64,
                        %error,
                        "retrying transient fault"
                    );
                    thread::sleep(backoff);
                    retry += 1;
                }
                result => return result,
            }
        }
    }
}

mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time;

    pub(super) fn serialize<S: Serializer>(
        duration: &time::Duration,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<time::Duration, D::Error> {
        u64::deserialize(deserializer).map(time::Duration::from_millis)
    }
}
