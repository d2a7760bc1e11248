//! Run trigger domain types
//!
//! A trigger is the event that asks for a run. Whether the run is actually
//! scheduled is decided by [`evaluate_trigger`], a pure predicate over the
//! trigger and the configured [`TriggerPolicy`].

use serde::{Deserialize, Serialize};

const HEADS_PREFIX: &str = "refs/heads/";

/// Event that requests a pipeline run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RunTrigger {
    /// A push to a branch, optionally pinned to the pushed commit
    Push {
        branch: String,
        #[serde(default)]
        commit: Option<String>,
    },
    /// A manual invocation; carries no parameters
    ManualDispatch,
}

impl RunTrigger {
    /// Push trigger for the head of `branch`
    pub fn push(branch: impl Into<String>) -> Self {
        Self::Push {
            branch: branch.into(),
            commit: None,
        }
    }

    /// Push trigger pinned to a specific commit
    pub fn push_at(branch: impl Into<String>, commit: impl Into<String>) -> Self {
        Self::Push {
            branch: branch.into(),
            commit: Some(commit.into()),
        }
    }

    /// Short label used in logs and reports
    pub fn label(&self) -> String {
        match self {
            RunTrigger::Push { branch, .. } => format!("push:{}", normalize_branch(branch)),
            RunTrigger::ManualDispatch => "manual-dispatch".to_string(),
        }
    }
}

/// Which triggers are allowed to start a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerPolicy {
    /// Only pushes to this branch start a run
    pub primary_branch: String,
    /// Whether manual dispatch starts a run
    pub manual_dispatch: bool,
}

impl Default for TriggerPolicy {
    fn default() -> Self {
        Self {
            primary_branch: "main".to_string(),
            manual_dispatch: true,
        }
    }
}

/// Outcome of trigger evaluation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TriggerDecision {
    Start,
    /// The run is not scheduled. This is not an error.
    NotEligible,
}

impl TriggerDecision {
    pub fn should_start(self) -> bool {
        matches!(self, TriggerDecision::Start)
    }
}

/// Decides whether a trigger starts a run
///
/// A run starts on manual dispatch (when the policy allows it) or on a push
/// whose branch equals the primary branch. Branches are compared with any
/// `refs/heads/` prefix removed.
pub fn evaluate_trigger(trigger: &RunTrigger, policy: &TriggerPolicy) -> TriggerDecision {
    let eligible = match trigger {
        RunTrigger::ManualDispatch => policy.manual_dispatch,
        RunTrigger::Push { branch, .. } => {
            normalize_branch(branch) == normalize_branch(&policy.primary_branch)
        }
    };

    if eligible {
        TriggerDecision::Start
    } else {
        TriggerDecision::NotEligible
    }
}

/// Strips the `refs/heads/` prefix from a branch reference
pub fn normalize_branch(branch: &str) -> &str {
    branch.strip_prefix(HEADS_PREFIX).unwrap_or(branch)
}
