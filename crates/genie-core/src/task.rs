//! Lifecycle of a remote task dispatched by this process.

use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, OutputRef, Result};

/// State of a pending remote task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum TaskState {
    /// The request was sent.
    Dispatched,
    /// The remote side acknowledged the task and is working on it.
    Running,
    /// The output exists at the given reference.
    Completed { output: OutputRef },
    /// The task failed.
    Failed { reason: String },
    /// The output was checked and does not exist yet.
    NotYetReady { output: OutputRef },
}

impl TaskState {
    /// Returns the state name used in logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Dispatched => "dispatched",
            Self::Running => "running",
            Self::Completed { .. } => "completed",
            Self::Failed { .. } => "failed",
            Self::NotYetReady { .. } => "not_yet_ready",
        }
    }
}

/// A task submitted to the remote API, owned by the caller for one batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingTask {
    id: Uuid,
    func: String,
    dispatched_at: Timestamp,
    state: TaskState,
}

impl PendingTask {
    /// Records a newly dispatched task.
    pub fn dispatched(func: impl Into<String>) -> Self {
        Self {
            id: Uuid::now_v7(),
            func: func.into(),
            dispatched_at: Timestamp::now(),
            state: TaskState::Dispatched,
        }
    }

    /// Returns the local task identifier.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Returns the remote function name.
    pub fn func(&self) -> &str {
        &self.func
    }

    /// Returns when the task was dispatched.
    pub fn dispatched_at(&self) -> Timestamp {
        self.dispatched_at
    }

    /// Returns the current state.
    pub fn state(&self) -> &TaskState {
        &self.state
    }

    /// Returns the output reference, once one is known.
    pub fn output(&self) -> Option<&OutputRef> {
        match &self.state {
            TaskState::Completed { output } | TaskState::NotYetReady { output } => Some(output),
            _ => None,
        }
    }

    /// Returns true once the task has completed or failed.
    pub fn is_settled(&self) -> bool {
        matches!(
            self.state,
            TaskState::Completed { .. } | TaskState::Failed { .. }
        )
    }

    /// Marks the task as running.
    pub fn mark_running(&mut self) -> Result<()> {
        self.transition(TaskState::Running)
    }

    /// Marks the task as completed with its output.
    pub fn complete(&mut self, output: OutputRef) -> Result<()> {
        self.transition(TaskState::Completed { output })
    }

    /// Marks the task as failed.
    pub fn fail(&mut self, reason: impl Into<String>) -> Result<()> {
        self.transition(TaskState::Failed {
            reason: reason.into(),
        })
    }

    /// Records that the expected output is not there yet.
    pub fn not_ready(&mut self, output: OutputRef) -> Result<()> {
        self.transition(TaskState::NotYetReady { output })
    }

    fn transition(&mut self, next: TaskState) -> Result<()> {
        if self.is_settled() {
            return Err(Error::invalid_input().with_message(format!(
                "task {} is already {}, cannot move to {}",
                self.id,
                self.state.as_str(),
                next.as_str()
            )));
        }

        self.state = next;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    #[test]
    fn test_happy_path() {
        let mut task = PendingTask::dispatched("segment_text");
        assert_eq!(task.state(), &TaskState::Dispatched);
        assert!(task.output().is_none());

        task.mark_running().unwrap();
        task.complete(OutputRef::new("out/segments.csv")).unwrap();

        assert!(task.is_settled());
        assert_eq!(task.output().map(OutputRef::location), Some("out/segments.csv"));
    }

    #[test]
    fn test_not_ready_then_completed() {
        let output = OutputRef::new("out/text.csv");
        let mut task = PendingTask::dispatched("extract_text");

        task.not_ready(output.clone()).unwrap();
        assert!(!task.is_settled());
        assert_eq!(task.output(), Some(&output));

        task.not_ready(output.clone()).unwrap();
        task.complete(output).unwrap();
        assert!(task.is_settled());
    }

    #[test]
    fn test_settled_tasks_reject_transitions() {
        let mut task = PendingTask::dispatched("read_file");
        task.fail("remote error").unwrap();

        let error = task.mark_running().unwrap_err();
        assert_eq!(error.kind(), ErrorKind::InvalidInput);
        assert_eq!(
            task.state(),
            &TaskState::Failed {
                reason: "remote error".into()
            }
        );
    }
}
