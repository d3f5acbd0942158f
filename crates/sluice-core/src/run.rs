//! Pipeline run records and the status state machine that drives them.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::CoreError;

/// Free-form key/value data attached to a run, e.g. per-entity counts.
pub type RunMetadata = serde_json::Map<String, serde_json::Value>;

/// Lifecycle state of a [`PipelineRun`].
///
/// ```text
/// Pending -> Running -> Success
///                   \-> Failed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineStatus {
    Pending,
    Running,
    Success,
    Failed,
}

impl PipelineStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            PipelineStatus::Pending => "pending",
            PipelineStatus::Running => "running",
            PipelineStatus::Success => "success",
            PipelineStatus::Failed => "failed",
        }
    }

    #[must_use]
    pub fn can_transition_to(self, next: PipelineStatus) -> bool {
        matches!(
            (self, next),
            (PipelineStatus::Pending, PipelineStatus::Running)
                | (
                    PipelineStatus::Running,
                    PipelineStatus::Success | PipelineStatus::Failed
                )
        )
    }
}

impl fmt::Display for PipelineStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PipelineStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(PipelineStatus::Pending),
            "running" => Ok(PipelineStatus::Running),
            "success" => Ok(PipelineStatus::Success),
            "failed" => Ok(PipelineStatus::Failed),
            other => Err(CoreError::InvalidStatus(other.to_owned())),
        }
    }
}

/// Audit record for one pipeline execution.
///
/// `id` is `None` until the record is first persisted; storage assigns it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineRun {
    pub id: Option<i64>,
    pub status: PipelineStatus,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
    pub records_processed: Option<i64>,
    pub metadata: Option<RunMetadata>,
}

impl PipelineRun {
    /// A fresh, unpersisted run in `Pending` state.
    #[must_use]
    pub fn pending(started_at: DateTime<Utc>) -> Self {
        Self {
            id: None,
            status: PipelineStatus::Pending,
            started_at,
            completed_at: None,
            error_message: None,
            records_processed: None,
            metadata: None,
        }
    }

    /// A fresh, unpersisted run already marked `Running`.
    #[must_use]
    pub fn started(started_at: DateTime<Utc>) -> Self {
        Self {
            status: PipelineStatus::Running,
            ..Self::pending(started_at)
        }
    }

    /// # Errors
    ///
    /// Returns [`CoreError::InvalidTransition`] unless the run is `Pending`.
    pub fn mark_running(&mut self) -> Result<(), CoreError> {
        self.transition(PipelineStatus::Running)
    }

    /// Records a successful completion with the total record count and
    /// per-type metadata.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidTransition`] unless the run is `Running`.
    pub fn mark_succeeded(
        &mut self,
        completed_at: DateTime<Utc>,
        records_processed: i64,
        metadata: RunMetadata,
    ) -> Result<(), CoreError> {
        self.transition(PipelineStatus::Success)?;
        self.completed_at = Some(completed_at);
        self.records_processed = Some(records_processed);
        self.metadata = Some(metadata);
        self.error_message = None;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns [`CoreError::InvalidTransition`] unless the run is `Running`.
    pub fn mark_failed(
        &mut self,
        completed_at: DateTime<Utc>,
        error_message: impl Into<String>,
    ) -> Result<(), CoreError> {
        self.transition(PipelineStatus::Failed)?;
        self.completed_at = Some(completed_at);
        self.error_message = Some(error_message.into());
        Ok(())
    }

    fn transition(&mut self, next: PipelineStatus) -> Result<(), CoreError> {
        if !self.status.can_transition_to(next) {
            return Err(CoreError::InvalidTransition {
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        Ok(())
    }
}
