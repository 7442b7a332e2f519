//! Render job state machine.
//!
//! ```text
//! Polling --pending (budget left)--> Polling
//! Polling --pending (budget spent)--> TimedOut
//! Polling --done--> Completed
//! Polling --error | rejected--> Failed
//! Polling --cancel--> Cancelled
//! ```

use serde::Serialize;

use crate::gateway::RemoteStatus;

/// A remote render job being tracked across polls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderJob {
    pub job_id: String,
    /// Last status reported by the renderer.
    pub remote_status: RemoteStatus,
    /// Polls made so far.
    pub attempt: u32,
}

impl RenderJob {
    pub fn new(job_id: impl Into<String>) -> Self {
        Self {
            job_id: job_id.into(),
            remote_status: RemoteStatus::Pending,
            attempt: 0,
        }
    }

    /// Present only once the renderer reported `done`.
    pub fn result_location(&self) -> Option<&str> {
        match &self.remote_status {
            RemoteStatus::Done { result_location } => Some(result_location),
            _ => None,
        }
    }

    /// Apply one poll result.
    pub fn observe(mut self, status: RemoteStatus, max_attempts: u32) -> PollState {
        self.attempt += 1;
        self.remote_status = status;

        match &self.remote_status {
            RemoteStatus::Done { result_location } => {
                let location = result_location.clone();
                PollState::Completed {
                    job: self,
                    location,
                }
            }
            RemoteStatus::Error { reason } | RemoteStatus::Rejected { reason } => {
                let reason = reason.clone();
                PollState::Failed { job: self, reason }
            }
            RemoteStatus::Pending if self.attempt >= max_attempts => {
                PollState::TimedOut { job: self }
            }
            RemoteStatus::Pending => PollState::Polling(self),
        }
    }

    /// Abandon the job locally. The remote render is not stopped.
    pub fn cancel(self) -> PollState {
        PollState::Cancelled { job: self }
    }
}

/// Where a render job stands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollState {
    Polling(RenderJob),
    Completed { job: RenderJob, location: String },
    Failed { job: RenderJob, reason: String },
    TimedOut { job: RenderJob },
    Cancelled { job: RenderJob },
}

impl PollState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, PollState::Polling(_))
    }

    pub fn job(&self) -> &RenderJob {
        match self {
            PollState::Polling(job)
            | PollState::Completed { job, .. }
            | PollState::Failed { job, .. }
            | PollState::TimedOut { job }
            | PollState::Cancelled { job } => job,
        }
    }

    /// Metric label.
    pub fn outcome(&self) -> &'static str {
        match self {
            PollState::Polling(_) => "polling",
            PollState::Completed { .. } => "completed",
            PollState::Failed { .. } => "failed",
            PollState::TimedOut { .. } => "timeout",
            PollState::Cancelled { .. } => "cancelled",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pending_keeps_polling_until_budget() {
        let mut state = PollState::Polling(RenderJob::new("job-1"));
        for _ in 0..2 {
            let PollState::Polling(job) = state else {
                panic!("expected polling");
            };
            state = job.observe(RemoteStatus::Pending, 3);
        }
        assert!(matches!(state, PollState::Polling(ref j) if j.attempt == 2));

        let PollState::Polling(job) = state else {
            panic!("expected polling");
        };
        let state = job.observe(RemoteStatus::Pending, 3);
        assert!(matches!(state, PollState::TimedOut { ref job } if job.attempt == 3));
        assert!(state.is_terminal());
    }

    #[test]
    fn test_done_completes_with_location() {
        let state = RenderJob::new("job-1").observe(
            RemoteStatus::Done {
                result_location: "https://x/y.mp4".to_string(),
            },
            30,
        );
        match state {
            PollState::Completed { job, location } => {
                assert_eq!(location, "https://x/y.mp4");
                assert_eq!(job.result_location(), Some("https://x/y.mp4"));
                assert_eq!(job.attempt, 1);
            }
            other => panic!("unexpected state: {:?}", other),
        }
    }

    #[test]
    fn test_done_on_last_attempt_wins_over_timeout() {
        let state = RenderJob::new("job-1").observe(
            RemoteStatus::Done {
                result_location: "loc".to_string(),
            },
            1,
        );
        assert_eq!(state.outcome(), "completed");
    }

    #[test]
    fn test_error_and_rejected_fail() {
        let failed = RenderJob::new("a").observe(
            RemoteStatus::Error {
                reason: "boom".to_string(),
            },
            30,
        );
        assert!(matches!(failed, PollState::Failed { ref reason, .. } if reason == "boom"));

        let rejected = RenderJob::new("b").observe(
            RemoteStatus::Rejected {
                reason: "unsupported script length".to_string(),
            },
            30,
        );
        assert_eq!(rejected.outcome(), "failed");
        assert!(rejected.job().result_location().is_none());
    }

    #[test]
    fn test_cancel_keeps_attempts() {
        let PollState::Polling(job) = RenderJob::new("a").observe(RemoteStatus::Pending, 30)
        else {
            panic!("expected polling");
        };
        let state = job.cancel();
        assert!(matches!(state, PollState::Cancelled { ref job } if job.attempt == 1));
    }
}
