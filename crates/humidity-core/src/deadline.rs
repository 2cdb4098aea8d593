use crate::error::{HumidityError, Result};
use crate::run::Stage;
use std::time::{Duration, Instant};

/// A single wall-clock budget shared by every step of a run.
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    /// `None` when the budget does not fit in an `Instant`; such a deadline
    /// never expires.
    at: Option<Instant>,
}

impl Deadline {
    pub fn after(budget: Duration) -> Self {
        Self {
            at: Instant::now().checked_add(budget),
        }
    }

    /// Time left before the deadline, zero once it has passed.
    pub fn remaining(&self) -> Duration {
        match self.at {
            Some(at) => at.saturating_duration_since(Instant::now()),
            None => Duration::MAX,
        }
    }

    pub fn is_expired(&self) -> bool {
        self.remaining().is_zero()
    }

    /// Fail with `DeadlineExceeded` if no time is left for `stage`.
    pub fn check(&self, stage: Stage) -> Result<()> {
        if self.is_expired() {
            return Err(HumidityError::DeadlineExceeded { stage });
        }
        Ok(())
    }

    /// Timeout for one outbound request: the configured per-request limit,
    /// capped by what is left of the run.
    pub fn request_timeout(&self, per_request: Duration, stage: Stage) -> Result<Duration> {
        self.check(stage)?;
        Ok(per_request.min(self.remaining()))
    }
}
