//! Run domain types and state machine
//!
//! A run moves strictly forward through
//! `Pending → SourceFetched → EnvironmentReady → DependenciesInstalled →
//! Packaged → Published`. Any failure moves it to `Failed(stage)`, which is
//! terminal. There is no resume or retry transition.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::domain::artifact::{BuildArtifact, PublishedArtifact};
use crate::domain::trigger::RunTrigger;

/// Pipeline stage, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Stage {
    SourceAcquisition,
    EnvironmentProvisioning,
    DependencyInstallation,
    Packaging,
    ArtifactPublication,
}

impl Stage {
    pub const ALL: [Stage; 5] = [
        Stage::SourceAcquisition,
        Stage::EnvironmentProvisioning,
        Stage::DependencyInstallation,
        Stage::Packaging,
        Stage::ArtifactPublication,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Stage::SourceAcquisition => "source-acquisition",
            Stage::EnvironmentProvisioning => "environment-provisioning",
            Stage::DependencyInstallation => "dependency-installation",
            Stage::Packaging => "packaging",
            Stage::ArtifactPublication => "artifact-publication",
        }
    }

    /// 1-based position in the pipeline
    pub fn position(&self) -> usize {
        Stage::ALL.iter().position(|s| s == self).unwrap_or(0) + 1
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Run lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "stage")]
pub enum RunState {
    Pending,
    SourceFetched,
    EnvironmentReady,
    DependenciesInstalled,
    Packaged,
    Published,
    Failed(Stage),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid run transition from {from:?} on {event}")]
pub struct TransitionError {
    pub from: RunState,
    pub event: String,
}

impl RunState {
    /// Stage that runs next from this state, if any
    pub fn next_stage(&self) -> Option<Stage> {
        match self {
            RunState::Pending => Some(Stage::SourceAcquisition),
            RunState::SourceFetched => Some(Stage::EnvironmentProvisioning),
            RunState::EnvironmentReady => Some(Stage::DependencyInstallation),
            RunState::DependenciesInstalled => Some(Stage::Packaging),
            RunState::Packaged => Some(Stage::ArtifactPublication),
            RunState::Published | RunState::Failed(_) => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, RunState::Published | RunState::Failed(_))
    }

    /// Moves forward after `stage` succeeded
    ///
    /// Only the stage returned by [`RunState::next_stage`] may complete.
    pub fn advance(self, stage: Stage) -> Result<RunState, TransitionError> {
        if self.next_stage() != Some(stage) {
            return Err(TransitionError {
                from: self,
                event: format!("complete {}", stage),
            });
        }

        Ok(match stage {
            Stage::SourceAcquisition => RunState::SourceFetched,
            Stage::EnvironmentProvisioning => RunState::EnvironmentReady,
            Stage::DependencyInstallation => RunState::DependenciesInstalled,
            Stage::Packaging => RunState::Packaged,
            Stage::ArtifactPublication => RunState::Published,
        })
    }

    /// Moves to `Failed(stage)`; only the active stage can fail
    pub fn fail(self, stage: Stage) -> Result<RunState, TransitionError> {
        if self.next_stage() != Some(stage) {
            return Err(TransitionError {
                from: self,
                event: format!("fail {}", stage),
            });
        }
        Ok(RunState::Failed(stage))
    }
}

/// Terminal outcome of a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RunOutcome {
    /// The trigger was not eligible; no stage ran
    NotScheduled,
    /// All stages succeeded
    Published { artifact: PublishedArtifact },
    /// The binary was built but its upload failed
    Unpublished {
        artifact: BuildArtifact,
        error: String,
    },
    /// A build stage failed; no artifact exists
    Failed { stage: Stage, error: String },
}

impl RunOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, RunOutcome::Published { .. })
    }

    /// Process exit code for the CLI
    pub fn exit_code(&self) -> i32 {
        match self {
            RunOutcome::NotScheduled | RunOutcome::Published { .. } => 0,
            RunOutcome::Failed { .. } => 1,
            RunOutcome::Unpublished { .. } => 2,
        }
    }
}

/// One execution of the pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Run {
    pub id: Uuid,
    pub trigger: RunTrigger,
    pub state: RunState,
    /// Commit the source snapshot resolved to
    pub commit: Option<String>,
    pub artifact: Option<BuildArtifact>,
    pub published: Option<PublishedArtifact>,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Run {
    pub fn new(trigger: RunTrigger) -> Self {
        Self {
            id: Uuid::new_v4(),
            trigger,
            state: RunState::Pending,
            commit: None,
            artifact: None,
            published: None,
            started_at: Utc::now(),
            completed_at: None,
        }
    }

    pub fn complete_stage(&mut self, stage: Stage) -> Result<(), TransitionError> {
        self.state = self.state.advance(stage)?;
        if self.state.is_terminal() {
            self.completed_at = Some(Utc::now());
        }
        Ok(())
    }

    pub fn fail_stage(&mut self, stage: Stage) -> Result<(), TransitionError> {
        self.state = self.state.fail(stage)?;
        self.completed_at = Some(Utc::now());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_transitions() {
        let mut state = RunState::Pending;
        for stage in Stage::ALL {
            assert_eq!(state.next_stage(), Some(stage));
            state = state.advance(stage).unwrap();
        }
        assert_eq!(state, RunState::Published);
        assert!(state.is_terminal());
        assert_eq!(state.next_stage(), None);
    }

    #[test]
    fn test_skip_ahead_rejected() {
        let state = RunState::Pending;
        assert!(state.advance(Stage::Packaging).is_err());

        let state = RunState::EnvironmentReady;
        assert!(state.advance(Stage::Packaging).is_err());
    }

    #[test]
    fn test_failed_is_terminal() {
        let state = RunState::EnvironmentReady
            .fail(Stage::DependencyInstallation)
            .unwrap();
        assert_eq!(state, RunState::Failed(Stage::DependencyInstallation));
        assert!(state.is_terminal());
        assert!(state.advance(Stage::Packaging).is_err());
        assert!(state.fail(Stage::Packaging).is_err());
    }

    #[test]
    fn test_only_active_stage_can_fail() {
        assert!(RunState::Pending.fail(Stage::Packaging).is_err());
        assert!(RunState::Published.fail(Stage::ArtifactPublication).is_err());
    }

    #[test]
    fn test_run_records_completion_time() {
        let mut run = Run::new(RunTrigger::ManualDispatch);
        assert!(run.completed_at.is_none());

        run.complete_stage(Stage::SourceAcquisition).unwrap();
        assert!(run.completed_at.is_none());

        run.fail_stage(Stage::EnvironmentProvisioning).unwrap();
        assert_eq!(run.state, RunState::Failed(Stage::EnvironmentProvisioning));
        assert!(run.completed_at.is_some());
    }

    #[test]
    fn test_stage_positions() {
        assert_eq!(Stage::SourceAcquisition.position(), 1);
        assert_eq!(Stage::ArtifactPublication.position(), 5);
    }

    #[test]
    fn test_outcome_exit_codes() {
        assert_eq!(RunOutcome::NotScheduled.exit_code(), 0);
        let failed = RunOutcome::Failed {
            stage: Stage::Packaging,
            error: "boom".to_string(),
        };
        assert_eq!(failed.exit_code(), 1);
        assert!(!failed.is_success());
    }

    #[test]
    fn test_state_serialization() {
        let json = serde_json::to_value(RunState::Failed(Stage::Packaging)).unwrap();
        assert_eq!(json["state"], "Failed");
        assert_eq!(json["stage"], "Packaging");
    }
}
