//! The agent pipeline.
//!
//! Roster generation runs as a fixed five-stage pipeline — demand,
//! matching, scheduling, validation, resolution — driven by the
//! [`Orchestrator`]. Each stage is a tagged variant with the uniform
//! capability "consume the run context, produce a result and a workflow
//! step"; there is no inheritance hierarchy and no global state.
//!
//! The workflow log is append-only and owned by the orchestrator; readers
//! see a consistent snapshot only at response time.

pub mod demand;
pub mod matcher;
pub mod orchestrator;
pub mod resolver;
pub mod validator;

pub use orchestrator::{Orchestrator, RunInputs};

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Pipeline stage tags, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StageTag {
    Init,
    Demand,
    Match,
    Schedule,
    Validate,
    Resolve,
    Complete,
    Cancelled,
    Aborted,
}

/// One appended workflow-log entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowStep {
    /// Milliseconds since run start (monotonic).
    pub timestamp_ms: u64,
    /// Stage that produced the entry.
    pub step: StageTag,
    /// Progress message.
    pub message: String,
}

/// Lifecycle status of one agent within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AgentStatus {
    Idle,
    Running,
    Succeeded,
    Failed,
}

/// Observable state of one pipeline agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentState {
    pub name: String,
    pub status: AgentStatus,
    pub last_action: String,
    /// Small key/value summary of what the agent produced.
    pub context: BTreeMap<String, String>,
}

impl AgentState {
    /// Creates an idle agent state.
    pub fn idle(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: AgentStatus::Idle,
            last_action: String::new(),
            context: BTreeMap::new(),
        }
    }

    /// Marks the agent running an action.
    pub fn start(&mut self, action: impl Into<String>) {
        self.status = AgentStatus::Running;
        self.last_action = action.into();
    }

    /// Marks the agent finished, recording a context entry.
    pub fn succeed(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.status = AgentStatus::Succeeded;
        self.context.insert(key.into(), value.into());
    }

    /// Marks the agent failed.
    pub fn fail(&mut self, reason: impl Into<String>) {
        self.status = AgentStatus::Failed;
        self.context.insert("error".into(), reason.into());
    }
}
