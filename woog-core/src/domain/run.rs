//! Pipeline run domain types
//!
//! A pipeline run is created once per push and walks a single-pass state
//! machine: build, then deploy, then a terminal alert evaluation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Stages of the release pipeline, in dependency order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageName {
    BuildPushDocker,
    Deploy,
    Alert,
}

impl StageName {
    pub fn as_str(&self) -> &'static str {
        match self {
            StageName::BuildPushDocker => "build_push_docker",
            StageName::Deploy => "deploy",
            StageName::Alert => "alert",
        }
    }

    /// Stages this stage waits on before it can be evaluated
    pub fn depends_on(&self) -> &'static [StageName] {
        match self {
            StageName::BuildPushDocker => &[],
            StageName::Deploy => &[StageName::BuildPushDocker],
            StageName::Alert => &[StageName::BuildPushDocker, StageName::Deploy],
        }
    }
}

impl fmt::Display for StageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for StageName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "build_push_docker" | "build" => Ok(StageName::BuildPushDocker),
            "deploy" => Ok(StageName::Deploy),
            "alert" => Ok(StageName::Alert),
            other => Err(format!("unknown stage '{}'", other)),
        }
    }
}

/// Outcome of a single stage
///
/// Failure reasons are opaque strings: no stage inspects another's error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "reason", rename_all = "snake_case")]
pub enum StageOutcome {
    Success,
    Failure(String),
    /// The stage never ran because a dependency did not succeed
    Skipped,
}

impl StageOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, StageOutcome::Failure(_))
    }

    pub fn is_success(&self) -> bool {
        matches!(self, StageOutcome::Success)
    }
}

/// Recorded result of one stage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageResult {
    pub stage: StageName,
    pub outcome: StageOutcome,
    pub finished_at: DateTime<Utc>,
}

impl StageResult {
    pub fn new(stage: StageName, outcome: StageOutcome) -> Self {
        Self {
            stage,
            outcome,
            finished_at: Utc::now(),
        }
    }
}

/// Returns true when any stage before `alert` failed
///
/// Skipped stages do not count: a skipped deploy is the consequence of a
/// failed build, which is already a failure on its own.
pub fn alert_required(results: &[StageResult]) -> bool {
    results
        .iter()
        .filter(|r| r.stage != StageName::Alert)
        .any(|r| r.outcome.is_failure())
}

/// Run state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunState {
    Pending,
    Building,
    Built,
    BuildFailed,
    Deploying,
    Deployed,
    DeployFailed,
}

impl RunState {
    /// States after which no further stage executes
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RunState::BuildFailed | RunState::Deployed | RunState::DeployFailed
        )
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, RunState::BuildFailed | RunState::DeployFailed)
    }
}

/// Events that move a run between states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunEvent {
    StartBuild,
    BuildSucceeded,
    BuildFailed,
    StartDeploy,
    DeploySucceeded,
    DeployFailed,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid transition from {from:?} on {event:?}")]
pub struct TransitionError {
    pub from: RunState,
    pub event: RunEvent,
}

impl RunState {
    /// Computes the next state, rejecting anything outside the single-pass graph
    pub fn transition(self, event: RunEvent) -> Result<RunState, TransitionError> {
        match (self, event) {
            (RunState::Pending, RunEvent::StartBuild) => Ok(RunState::Building),
            (RunState::Building, RunEvent::BuildSucceeded) => Ok(RunState::Built),
            (RunState::Building, RunEvent::BuildFailed) => Ok(RunState::BuildFailed),
            (RunState::Built, RunEvent::StartDeploy) => Ok(RunState::Deploying),
            (RunState::Deploying, RunEvent::DeploySucceeded) => Ok(RunState::Deployed),
            (RunState::Deploying, RunEvent::DeployFailed) => Ok(RunState::DeployFailed),
            (from, event) => Err(TransitionError { from, event }),
        }
    }
}

/// Terminal alert evaluation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlertDecision {
    /// A prior stage failed and a notification must go out
    Alert,
    NoAlert,
}

/// One pipeline run, created per push event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineRun {
    pub id: Uuid,
    /// Full commit identifier the run was triggered by
    pub commit: String,
    pub state: RunState,
    pub started_at: DateTime<Utc>,
    pub results: Vec<StageResult>,
}

impl PipelineRun {
    pub fn new(commit: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            commit: commit.into(),
            state: RunState::Pending,
            started_at: Utc::now(),
            results: Vec::new(),
        }
    }

    /// Applies an event to the run's state
    pub fn apply(&mut self, event: RunEvent) -> Result<RunState, TransitionError> {
        self.state = self.state.transition(event)?;
        Ok(self.state)
    }

    /// Records a stage result
    pub fn record(&mut self, stage: StageName, outcome: StageOutcome) {
        self.results.push(StageResult::new(stage, outcome));
    }

    /// Outcome recorded for a stage, if any
    pub fn outcome(&self, stage: StageName) -> Option<&StageOutcome> {
        self.results
            .iter()
            .find(|r| r.stage == stage)
            .map(|r| &r.outcome)
    }

    /// Failed stages and their reasons, in execution order
    pub fn failures(&self) -> impl Iterator<Item = (StageName, &str)> {
        self.results.iter().filter_map(|r| match &r.outcome {
            StageOutcome::Failure(reason) => Some((r.stage, reason.as_str())),
            _ => None,
        })
    }

    /// True when every stage `stage` depends on recorded a success
    pub fn dependencies_succeeded(&self, stage: StageName) -> bool {
        stage
            .depends_on()
            .iter()
            .all(|dep| self.outcome(*dep).is_some_and(StageOutcome::is_success))
    }

    /// True when every stage `stage` depends on recorded any outcome
    pub fn dependencies_resolved(&self, stage: StageName) -> bool {
        stage
            .depends_on()
            .iter()
            .all(|dep| self.outcome(*dep).is_some())
    }

    pub fn alert_decision(&self) -> AlertDecision {
        if alert_required(&self.results) {
            AlertDecision::Alert
        } else {
            AlertDecision::NoAlert
        }
    }

    /// True when every executed stage succeeded
    pub fn succeeded(&self) -> bool {
        self.state == RunState::Deployed && !alert_required(&self.results)
    }
}
