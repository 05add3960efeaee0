//! Explicit job state machine.
//!
//! The worker executor is the only writer of job state; this tracker makes
//! the legal transitions explicit instead of relying on call-order
//! discipline, so an out-of-order or duplicate terminal write surfaces as an
//! error rather than silently corrupting the record.

use thiserror::Error;

use mediagrab_queue::{JobStatus, Stage};

/// Tagged job state. Legal transitions:
/// `Queued → Running(Init, _)`, `Running → Running` with non-decreasing
/// stage and progress, `Running → Finished`, `Running → Failed`.
/// `Finished` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Queued,
    Running { stage: Stage, progress: u8 },
    Finished,
    Failed,
}

impl JobState {
    #[inline]
    pub const fn status(self) -> JobStatus {
        match self {
            Self::Queued => JobStatus::Queued,
            Self::Running { .. } => JobStatus::Running,
            Self::Finished => JobStatus::Finished,
            Self::Failed => JobStatus::Failed,
        }
    }

    #[inline]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Finished | Self::Failed)
    }
}

/// State machine violations. These indicate a bug in the executor's control
/// flow, never a property of the job itself.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StateError {
    #[error("write attempted after terminal state {0}")]
    AfterTerminal(JobStatus),

    #[error("illegal transition from {from} to {to}")]
    InvalidTransition { from: JobStatus, to: JobStatus },

    #[error("stage regression within running: {from} -> {to}")]
    StageRegression { from: Stage, to: Stage },

    #[error("progress regression within running: {from} -> {to}")]
    ProgressRegression { from: u8, to: u8 },
}

/// Transition guard owned by the executor for the lifetime of one job.
#[derive(Debug)]
pub struct StateTracker {
    current: JobState,
}

impl Default for StateTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl StateTracker {
    pub fn new() -> Self {
        Self {
            current: JobState::Queued,
        }
    }

    #[inline]
    pub fn current(&self) -> JobState {
        self.current
    }

    /// Validate and apply a transition.
    pub fn advance(&mut self, next: JobState) -> Result<(), StateError> {
        if self.current.is_terminal() {
            return Err(StateError::AfterTerminal(self.current.status()));
        }

        match (self.current, next) {
            (JobState::Queued, JobState::Running { stage, .. }) if stage == Stage::Init => {}
            (
                JobState::Running {
                    stage: from_stage,
                    progress: from_progress,
                },
                JobState::Running {
                    stage: to_stage,
                    progress: to_progress,
                },
            ) => {
                if to_stage < from_stage {
                    return Err(StateError::StageRegression {
                        from: from_stage,
                        to: to_stage,
                    });
                }
                if to_progress < from_progress {
                    return Err(StateError::ProgressRegression {
                        from: from_progress,
                        to: to_progress,
                    });
                }
            }
            (JobState::Running { .. }, JobState::Finished) => {}
            (JobState::Running { .. }, JobState::Failed) => {}
            (from, to) => {
                return Err(StateError::InvalidTransition {
                    from: from.status(),
                    to: to.status(),
                })
            }
        }

        self.current = next;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn running(stage: Stage, progress: u8) -> JobState {
        JobState::Running { stage, progress }
    }

    #[test]
    fn happy_path_transitions() {
        let mut tracker = StateTracker::new();
        tracker.advance(running(Stage::Init, 1)).unwrap();
        tracker.advance(running(Stage::Downloading, 5)).unwrap();
        tracker.advance(running(Stage::Downloading, 85)).unwrap();
        tracker.advance(running(Stage::Postprocessing, 90)).unwrap();
        tracker.advance(running(Stage::Finalizing, 95)).unwrap();
        tracker.advance(JobState::Finished).unwrap();
        assert!(tracker.current().is_terminal());
    }

    #[test]
    fn queued_must_enter_through_init() {
        let mut tracker = StateTracker::new();
        let err = tracker.advance(running(Stage::Downloading, 10)).unwrap_err();
        assert!(matches!(err, StateError::InvalidTransition { .. }));
    }

    #[test]
    fn queued_cannot_jump_to_terminal() {
        let mut tracker = StateTracker::new();
        let err = tracker.advance(JobState::Finished).unwrap_err();
        assert_eq!(
            err,
            StateError::InvalidTransition {
                from: JobStatus::Queued,
                to: JobStatus::Finished,
            }
        );
    }

    #[test]
    fn progress_may_not_regress() {
        let mut tracker = StateTracker::new();
        tracker.advance(running(Stage::Init, 1)).unwrap();
        tracker.advance(running(Stage::Downloading, 40)).unwrap();
        let err = tracker.advance(running(Stage::Downloading, 30)).unwrap_err();
        assert_eq!(err, StateError::ProgressRegression { from: 40, to: 30 });
    }

    #[test]
    fn stage_may_not_regress() {
        let mut tracker = StateTracker::new();
        tracker.advance(running(Stage::Init, 1)).unwrap();
        tracker.advance(running(Stage::Postprocessing, 86)).unwrap();
        let err = tracker.advance(running(Stage::Downloading, 87)).unwrap_err();
        assert_eq!(
            err,
            StateError::StageRegression {
                from: Stage::Postprocessing,
                to: Stage::Downloading,
            }
        );
    }

    #[test]
    fn terminal_states_reject_all_writes() {
        let mut tracker = StateTracker::new();
        tracker.advance(running(Stage::Init, 1)).unwrap();
        tracker.advance(JobState::Failed).unwrap();

        let err = tracker.advance(running(Stage::Downloading, 50)).unwrap_err();
        assert_eq!(err, StateError::AfterTerminal(JobStatus::Failed));
        let err = tracker.advance(JobState::Finished).unwrap_err();
        assert_eq!(err, StateError::AfterTerminal(JobStatus::Failed));
    }

    #[test]
    fn failure_is_allowed_from_any_running_stage() {
        let mut tracker = StateTracker::new();
        tracker.advance(running(Stage::Init, 1)).unwrap();
        tracker.advance(JobState::Failed).unwrap();
        assert_eq!(tracker.current(), JobState::Failed);
    }
}
