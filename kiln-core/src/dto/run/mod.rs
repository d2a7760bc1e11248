//! Run report DTO

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::log::LogEntry;
use crate::domain::run::{Run, RunOutcome, RunState};
use crate::domain::trigger::RunTrigger;

/// Summary of a finished (or never scheduled) run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    /// None when the trigger was not eligible
    pub run_id: Option<Uuid>,
    pub pipeline: String,
    pub trigger: RunTrigger,
    pub state: Option<RunState>,
    pub outcome: RunOutcome,
    pub commit: Option<String>,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub logs: Vec<LogEntry>,
}

impl RunReport {
    /// Report for a trigger that did not start a run
    pub fn not_scheduled(pipeline: impl Into<String>, trigger: RunTrigger) -> Self {
        let now = Utc::now();
        Self {
            run_id: None,
            pipeline: pipeline.into(),
            trigger,
            state: None,
            outcome: RunOutcome::NotScheduled,
            commit: None,
            started_at: now,
            completed_at: Some(now),
            logs: Vec::new(),
        }
    }

    /// Report for an executed run
    pub fn from_run(
        pipeline: impl Into<String>,
        run: &Run,
        outcome: RunOutcome,
        logs: Vec<LogEntry>,
    ) -> Self {
        Self {
            run_id: Some(run.id),
            pipeline: pipeline.into(),
            trigger: run.trigger.clone(),
            state: Some(run.state),
            outcome,
            commit: run.commit.clone(),
            started_at: run.started_at,
            completed_at: run.completed_at,
            logs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::run::Stage;

    #[test]
    fn test_not_scheduled_report() {
        let report = RunReport::not_scheduled("survey-processor", RunTrigger::push("feature/x"));
        assert!(report.run_id.is_none());
        assert!(report.state.is_none());
        assert_eq!(report.outcome, RunOutcome::NotScheduled);
    }

    #[test]
    fn test_report_from_failed_run() {
        let mut run = Run::new(RunTrigger::push("main"));
        run.complete_stage(Stage::SourceAcquisition).unwrap();
        run.fail_stage(Stage::EnvironmentProvisioning).unwrap();

        let outcome = RunOutcome::Failed {
            stage: Stage::EnvironmentProvisioning,
            error: "image not found".to_string(),
        };
        let report = RunReport::from_run("survey-processor", &run, outcome, vec![]);

        assert_eq!(report.run_id, Some(run.id));
        assert_eq!(
            report.state,
            Some(RunState::Failed(Stage::EnvironmentProvisioning))
        );

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["outcome"]["outcome"], "failed");
        assert_eq!(json["outcome"]["stage"], "EnvironmentProvisioning");
    }
}
