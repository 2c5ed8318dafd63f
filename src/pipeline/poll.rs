//! Status polling with a soft deadline.
//!
//! After the upload is marked complete the service queues, analyses and
//! processes the file. The client waits by re-reading the job until the
//! status leaves that in-progress set.
//!
//! ## Backoff
//!
//! The delay before each poll comes from a [`PollBackoff`] strategy. The
//! default [`LinearBackoff`] starts at 500 ms and grows by 1 ms per poll:
//! additive, not exponential, and without a cap. Tests inject
//! [`FixedBackoff`] with a zero or tiny delay.
//!
//! ## Deadline
//!
//! The deadline is checked after each sleep and before each request. An
//! in-flight request is never interrupted, so a call can overrun the limit by
//! at most one round-trip.

use crate::api::SqlizerApi;
use crate::error::{ConversionError, SqlizerError};
use crate::job::JobState;
use crate::progress::ProgressCallback;
use std::fmt;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::debug;

/// Decides how long to wait before each status poll.
pub trait PollBackoff: fmt::Debug + Send + Sync {
    /// Delay before poll number `attempt` (0-based).
    fn delay(&self, attempt: u32) -> Duration;
}

/// `initial + step × attempt`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinearBackoff {
    pub initial: Duration,
    pub step: Duration,
}

impl Default for LinearBackoff {
    fn default() -> Self {
        Self {
            initial: Duration::from_millis(500),
            step: Duration::from_millis(1),
        }
    }
}

impl PollBackoff for LinearBackoff {
    fn delay(&self, attempt: u32) -> Duration {
        self.initial.saturating_add(self.step.saturating_mul(attempt))
    }
}

/// The same delay before every poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FixedBackoff(pub Duration);

impl PollBackoff for FixedBackoff {
    fn delay(&self, _attempt: u32) -> Duration {
        self.0
    }
}

/// Wall-clock limit measured from the start of a conversion.
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    started: Instant,
    limit: Duration,
}

impl Deadline {
    pub fn new(started: Instant, limit: Duration) -> Self {
        Self { started, limit }
    }

    /// `Err(Timeout)` once more than `limit` has elapsed.
    pub fn check(&self) -> Result<(), SqlizerError> {
        let elapsed = self.started.elapsed();
        if elapsed > self.limit {
            return Err(SqlizerError::Timeout {
                elapsed_ms: elapsed.as_millis() as u64,
                limit_ms: self.limit.as_millis() as u64,
            });
        }
        Ok(())
    }
}

/// Result of a finished polling loop.
#[derive(Debug, Clone)]
pub struct Settled {
    /// First snapshot whose status is no longer in progress.
    pub state: JobState,
    /// Status requests issued.
    pub polls: u32,
}

/// Poll the job until its status leaves Queued/Analysing/Processing.
///
/// `state` is the snapshot returned by the "uploaded" transition; if it is
/// already settled no request is made. On failure the returned error carries
/// the last snapshot observed.
pub async fn poll_until_settled(
    api: &dyn SqlizerApi,
    mut state: JobState,
    backoff: &dyn PollBackoff,
    deadline: Option<Deadline>,
    progress: Option<&ProgressCallback>,
) -> Result<Settled, ConversionError> {
    let mut polls: u32 = 0;

    while state.is_in_progress() {
        sleep(backoff.delay(polls)).await;

        if let Some(ref d) = deadline {
            d.check().map_err(|e| ConversionError::at(e, &state))?;
        }

        let job_id = match state.job_id() {
            Some(id) => id.to_string(),
            None => {
                let e = SqlizerError::MissingJobId {
                    status: state.status_label().to_string(),
                };
                return Err(ConversionError::at(e, &state));
            }
        };

        let next = api
            .get_job(&job_id)
            .await
            .map_err(|e| ConversionError::at(e, &state))?;
        polls += 1;

        debug!(
            "Job {}: poll {} → {} ({}%)",
            job_id,
            polls,
            next.status_label(),
            next.percent_complete.unwrap_or(0.0)
        );
        if let Some(cb) = progress {
            cb.on_status(&next);
        }
        state = next;
    }

    Ok(Settled { state, polls })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linear_backoff_grows_by_one_millisecond() {
        let b = LinearBackoff::default();
        assert_eq!(b.delay(0), Duration::from_millis(500));
        assert_eq!(b.delay(1), Duration::from_millis(501));
        assert_eq!(b.delay(100), Duration::from_millis(600));
    }

    #[test]
    fn linear_backoff_saturates() {
        let b = LinearBackoff {
            initial: Duration::MAX,
            step: Duration::from_secs(1),
        };
        assert_eq!(b.delay(u32::MAX), Duration::MAX);
    }

    #[test]
    fn fixed_backoff_is_constant() {
        let b = FixedBackoff(Duration::from_millis(5));
        assert_eq!(b.delay(0), b.delay(1000));
        assert_eq!(FixedBackoff::default().delay(3), Duration::ZERO);
    }

    #[tokio::test]
    async fn deadline_trips_after_limit() {
        let d = Deadline::new(Instant::now(), Duration::from_millis(10));
        assert!(d.check().is_ok());
        sleep(Duration::from_millis(25)).await;
        match d.check() {
            Err(SqlizerError::Timeout { limit_ms, elapsed_ms }) => {
                assert_eq!(limit_ms, 10);
                assert!(elapsed_ms >= 10);
            }
            other => panic!("expected timeout, got {other:?}"),
        }
    }
}
